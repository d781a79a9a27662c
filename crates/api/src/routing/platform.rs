//! Host platform route catalog
//!
//! The host platform owns three kinds of routes:
//! - static top-level routes (`top`, `site`, `admin`, `api`, ...), matched
//!   for every request that is not served through a custom domain
//! - the generic child routes of its `site` route, declared relative to
//!   `/<indicator>/:site-slug`
//! - routes registered at runtime by platform modules, only visible through
//!   [`PlatformRoute`]

use std::sync::Arc;

use super::definitions::{PlatformRoute, RegisteredRoute, RouteSpec};
use super::pattern::Constraint;
use super::template::{PAGE_SLUG_PARAM, SITE_CONTEXT_PARAM, SITE_SLUG_PARAM};

/// Everything the route template builder reads from the host platform
#[derive(Debug, Clone, Default)]
pub struct PlatformCatalog {
    pub static_routes: Vec<(String, RouteSpec)>,
    pub site_children: Vec<(String, RouteSpec)>,
    pub dynamic_routes: Vec<Arc<dyn PlatformRoute>>,
}

impl PlatformCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_static_route(mut self, name: impl Into<String>, spec: RouteSpec) -> Self {
        self.static_routes.push((name.into(), spec));
        self
    }

    pub fn with_site_child(mut self, name: impl Into<String>, spec: RouteSpec) -> Self {
        self.site_children.push((name.into(), spec));
        self
    }

    pub fn with_dynamic_route(mut self, route: Arc<dyn PlatformRoute>) -> Self {
        self.dynamic_routes.push(route);
        self
    }

    /// The platform's stock route configuration under the given site indicator
    pub fn standard(site_indicator: &str) -> Self {
        let site_children = standard_site_children();

        let mut site_route = RouteSpec::segment(format!("/{}/:{}", site_indicator, SITE_SLUG_PARAM))
            .terminating()
            .with_default(SITE_CONTEXT_PARAM, "1")
            .with_default("controller", "Index")
            .with_default("action", "index")
            .with_constraint(SITE_SLUG_PARAM, Constraint::Token);
        for (name, child) in &site_children {
            site_route.set_child(name.clone(), child.clone());
        }

        Self {
            static_routes: vec![
                (
                    "top".to_string(),
                    RouteSpec::literal("/")
                        .terminating()
                        .with_default("controller", "Index")
                        .with_default("action", "index"),
                ),
                ("site".to_string(), site_route),
                (
                    "admin".to_string(),
                    RouteSpec::literal("/admin")
                        .terminating()
                        .with_default("__ADMIN__", "1")
                        .with_default("controller", "Index")
                        .with_default("action", "index")
                        .with_child(
                            "default",
                            RouteSpec::segment("/:controller[/:action]")
                                .with_constraint("controller", Constraint::Token)
                                .with_constraint("action", Constraint::Token),
                        ),
                ),
                (
                    "api".to_string(),
                    RouteSpec::segment("/api[/:resource[/:id]]")
                        .terminating()
                        .with_default("controller", "Api")
                        .with_constraint("resource", Constraint::Token),
                ),
                ("login".to_string(), simple_literal("/login", "Login", "login")),
                ("logout".to_string(), simple_literal("/logout", "Login", "logout")),
                (
                    "create-password".to_string(),
                    RouteSpec::segment("/create-password/:key")
                        .with_default("controller", "Login")
                        .with_default("action", "create-password"),
                ),
                (
                    "forgot-password".to_string(),
                    simple_literal("/forgot-password", "Login", "forgot-password"),
                ),
                ("install".to_string(), simple_literal("/install", "Install", "index")),
                ("migrate".to_string(), simple_literal("/migrate", "Migrate", "index")),
                (
                    "maintenance".to_string(),
                    simple_literal("/maintenance", "Maintenance", "index"),
                ),
            ],
            site_children,
            dynamic_routes: vec![
                Arc::new(
                    RegisteredRoute::new(
                        "timeline",
                        format!("/{}/:{}/timeline[/:id]", site_indicator, SITE_SLUG_PARAM),
                    )
                    .with_default("controller", "Timeline")
                    .with_default("action", "show")
                    .with_constraint("id", Constraint::Digits),
                ),
                Arc::new(
                    RegisteredRoute::new(
                        "transcription",
                        format!("/transcribe[/{}/:{}]/project/:project-id", site_indicator, SITE_SLUG_PARAM),
                    )
                    .with_default("controller", "Project")
                    .with_default("action", "show"),
                ),
                Arc::new(
                    RegisteredRoute::new("oai-pmh", "/oai-pmh")
                        .with_default("controller", "OaiPmh")
                        .with_default("action", "index"),
                ),
            ],
        }
    }
}

fn simple_literal(pattern: &str, controller: &str, action: &str) -> RouteSpec {
    RouteSpec::literal(pattern)
        .terminating()
        .with_default("controller", controller)
        .with_default("action", action)
}

/// Generic children of the platform `site` route
fn standard_site_children() -> Vec<(String, RouteSpec)> {
    vec![
        (
            "item-set".to_string(),
            RouteSpec::segment("/item-set[/:item-set-id]")
                .with_default("controller", "Item")
                .with_default("action", "browse")
                .with_constraint("item-set-id", Constraint::Digits),
        ),
        (
            "page-browse".to_string(),
            RouteSpec::literal("/page")
                .with_default("controller", "Page")
                .with_default("action", "browse"),
        ),
        (
            "page".to_string(),
            RouteSpec::segment(format!("/page/:{}", PAGE_SLUG_PARAM))
                .with_default("controller", "Page")
                .with_default("action", "show"),
        ),
        (
            "search".to_string(),
            RouteSpec::segment("/search[/:action]")
                .with_default("action", "index")
                .with_constraint("action", Constraint::Token),
        ),
        (
            "faceted".to_string(),
            RouteSpec::segment("/faceted/:controller")
                .with_default("action", "browse")
                .with_constraint("controller", Constraint::Token),
        ),
        // Catch-alls last: first match wins
        (
            "resource-id".to_string(),
            RouteSpec::segment("/:controller/:id[/:action]")
                .with_default("action", "show")
                .with_constraint("controller", Constraint::Token)
                .with_constraint("id", Constraint::Digits),
        ),
        (
            "resource".to_string(),
            RouteSpec::segment("/:controller[/:action]")
                .with_default("action", "browse")
                .with_constraint("controller", Constraint::Token)
                .with_constraint("action", Constraint::Token),
        ),
    ]
}
