//! SiteHost Shared Types and Utilities
//!
//! This crate contains the mapping record, id wrappers, errors, and database
//! helpers shared by the SiteHost crates.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
