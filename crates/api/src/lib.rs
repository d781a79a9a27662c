//! SiteHost API Library
//!
//! Domain-based virtual hosting for the site platform: per-site route
//! synthesis, request resolution and canonical redirects, and the mapping
//! administration API.

pub mod auth;
pub mod config;
pub mod error;
pub mod mappings;
pub mod routes;
pub mod routing;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routing::{DomainCache, DomainResolver, Resolution};
pub use state::AppState;
