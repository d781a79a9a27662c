//! Domain-based routing for sites
//!
//! Lets any site be addressed through its own custom domain:
//! - `https://museum.example/item/5` is served from the `demo` site's table
//! - `https://museum.example/s/demo/item/5` redirects to the form above
//! - hosts without a mapping are left to the platform's static routes

pub mod cache;
pub mod definitions;
pub mod pattern;
pub mod platform;
pub mod redirect;
pub mod registry;
pub mod resolver;
pub mod template;

pub use cache::DomainCache;
pub use definitions::{PlatformRoute, RegisteredRoute, RouteMatch, RouteSpec};
pub use platform::PlatformCatalog;
pub use redirect::{PassthroughReason, Resolution};
pub use registry::{Installation, RouteRegistry};
pub use resolver::{DomainResolver, RequestContext};
pub use template::{RouteTemplateBuilder, SynthesizedRouteTable};
