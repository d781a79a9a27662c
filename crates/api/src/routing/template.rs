//! Route Template Builder
//!
//! Turns the host platform's slug-addressed site routes into an equivalent
//! route table served at the root of a custom domain:
//!
//! ```text
//! /s/demo/item/5        (platform, slug-addressed)
//!     ↓ strip indicator + slug, inject site-slug=demo as a default
//! /item/5               (custom domain)
//! ```
//!
//! The builder is a pure function of its inputs: the same slug, default page
//! and catalog always produce a structurally equal table.

use std::collections::HashSet;

use super::definitions::{PlatformRoute, RouteKind, RouteSpec};
use super::pattern::{has_parameter, render_pattern, Constraint, PathPart};
use super::platform::PlatformCatalog;

/// Route parameter carrying the site slug
pub const SITE_SLUG_PARAM: &str = "site-slug";
/// Route parameter carrying a page slug
pub const PAGE_SLUG_PARAM: &str = "page-slug";
/// Marker default telling the platform dispatcher it is in a site context
pub const SITE_CONTEXT_PARAM: &str = "__SITE__";

/// Prefix of every synthesized root route name
pub const SITE_ROOT_PREFIX: &str = "site::";

/// Platform routes that are never served through a custom domain
pub const EXCLUDED_ROUTES: &[&str] = &[
    "admin",
    "api",
    "api-context",
    "install",
    "migrate",
    "maintenance",
    "login",
    "logout",
    "create-password",
    "forgot-password",
    // Modules that register a route at the platform root
    "ns",
    "oai-pmh",
];

/// Any route name or path containing this marker is administrative
pub const ADMIN_MARKER: &str = "admin";

/// Platform root routes that are replaced by the synthesized table itself
const PLATFORM_ROOT_ROUTES: &[&str] = &["top", "site"];

/// Shortest accepted `controller` value
const CONTROLLER_MIN_LEN: usize = 3;

const ACTION_CONSTRAINT: Constraint = Constraint::Identifier { min_len: 1 };

/// Returns true if a route name is in the exclusion set
pub fn is_excluded_name(name: &str) -> bool {
    EXCLUDED_ROUTES.contains(&name) || name.contains(ADMIN_MARKER)
}

/// Returns true if a request path addresses an excluded platform route.
///
/// The first path segment is checked against the exclusion set; the
/// administrative marker is rejected anywhere in the path.
pub fn is_excluded_path(path: &str) -> bool {
    let first_segment = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    EXCLUDED_ROUTES.contains(&first_segment) || path.contains(ADMIN_MARKER)
}

/// Name of the synthesized root route for a site
pub fn site_root_name(slug: &str) -> String {
    format!("{}{}", SITE_ROOT_PREFIX, slug)
}

/// A site's route tree with the slug segment removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedRouteTable {
    /// Site-scoped registry key
    pub root_name: String,
    pub site_slug: String,
    pub root: RouteSpec,
    /// Canonical path of the site's landing route, without a leading slash
    pub default_target: String,
    /// Literal path of the slug-addressed landing route, without a leading slash
    pub default_page_path: String,
}

/// Builds [`SynthesizedRouteTable`]s
#[derive(Debug, Clone)]
pub struct RouteTemplateBuilder {
    site_indicator: String,
}

impl RouteTemplateBuilder {
    pub fn new(site_indicator: impl Into<String>) -> Self {
        Self {
            site_indicator: site_indicator.into(),
        }
    }

    pub fn site_indicator(&self) -> &str {
        &self.site_indicator
    }

    /// `controller` values: identifiers other than the site indicator, so a
    /// slug-addressed path never reaches a resource route
    pub fn controller_constraint(&self) -> Constraint {
        Constraint::IdentifierExcept {
            min_len: CONTROLLER_MIN_LEN,
            reserved: self.site_indicator.clone(),
        }
    }

    /// Build the domain-root route table for one site
    pub fn build(&self, slug: &str, default_page: Option<&str>, catalog: &PlatformCatalog) -> SynthesizedRouteTable {
        let default_page = default_page.filter(|page| !page.is_empty());
        let (controller, action) = match default_page {
            Some(_) => ("Page", "show"),
            None => ("Item", "browse"),
        };

        let default_target = match default_page {
            Some(page) => format!("page/{}", page),
            None => format!("{}/{}", controller.to_lowercase(), action),
        };
        let default_page_path = format!("{}/{}", self.site_indicator, slug);

        let landing_defaults = |spec: RouteSpec| {
            let spec = spec
                .with_default("controller", controller)
                .with_default("action", action)
                .with_default(SITE_SLUG_PARAM, slug);
            match default_page {
                Some(page) => spec.with_default(PAGE_SLUG_PARAM, page),
                None => spec,
            }
        };

        let mut root = landing_defaults(
            RouteSpec::literal("/")
                .terminating()
                .with_default(SITE_CONTEXT_PARAM, "1"),
        );

        // Specific routes first; the catch-alls are appended at the very end
        root.set_child("default-page", landing_defaults(RouteSpec::literal(default_page_path.clone())));
        root.set_child(
            "page-browse",
            RouteSpec::literal("page")
                .with_default("controller", "Page")
                .with_default("action", "browse")
                .with_default(SITE_SLUG_PARAM, slug),
        );
        root.set_child(
            "page",
            RouteSpec::segment(format!("page/:{}", PAGE_SLUG_PARAM))
                .with_default("controller", "Page")
                .with_default("action", "show")
                .with_default(SITE_SLUG_PARAM, slug),
        );
        root.set_child(
            "item-set",
            RouteSpec::segment("item-set[/:item-set-id]")
                .with_default("controller", "Item")
                .with_default("action", "browse")
                .with_default(SITE_SLUG_PARAM, slug)
                .with_constraint("item-set-id", Constraint::Digits),
        );
        root.set_child(
            "cross-site-search",
            RouteSpec::segment("cross-site-search[/:action]")
                .with_default("controller", "CrossSiteSearch")
                .with_default("action", "index")
                .with_default(SITE_SLUG_PARAM, slug)
                .with_constraint("action", Constraint::Token),
        );

        let catch_alls = vec![
            (
                "resource-id".to_string(),
                RouteSpec::segment(":controller/:id[/:action]")
                    .with_default("controller", "Item")
                    .with_default("action", "show")
                    .with_default(SITE_SLUG_PARAM, slug)
                    .with_constraint("controller", self.controller_constraint())
                    .with_constraint("action", ACTION_CONSTRAINT)
                    .with_constraint("id", Constraint::Digits),
            ),
            (
                "resource".to_string(),
                RouteSpec::segment(":controller[/:action]")
                    .with_default("controller", "Item")
                    .with_default("action", "browse")
                    .with_default(SITE_SLUG_PARAM, slug)
                    .with_constraint("controller", self.controller_constraint())
                    .with_constraint("action", ACTION_CONSTRAINT),
            ),
        ];

        let mut taken: HashSet<String> = root.child_names().map(str::to_string).collect();
        taken.extend(catch_alls.iter().map(|(name, _)| name.clone()));

        for (name, child) in &catalog.site_children {
            if taken.contains(name) || is_excluded_name(name) {
                continue;
            }
            root.set_child(name.clone(), self.adapt_site_child(slug, child));
            taken.insert(name.clone());
        }

        for (name, child) in catch_alls {
            root.set_child(name, child);
        }

        for route in &catalog.dynamic_routes {
            let name = route.name();
            if PLATFORM_ROOT_ROUTES.contains(&name) || is_excluded_name(name) {
                continue;
            }
            match self.adapt_dynamic_route(slug, route.as_ref()) {
                Some(child) => {
                    if root.has_child(name) {
                        root.set_child(name, child);
                    } else {
                        insert_before_catch_alls(&mut root, name, child);
                    }
                }
                None => {
                    tracing::debug!(route = %name, site_slug = %slug, "Dynamic route yields no path, skipping");
                }
            }
        }

        SynthesizedRouteTable {
            root_name: site_root_name(slug),
            site_slug: slug.to_string(),
            root,
            default_target,
            default_page_path,
        }
    }

    /// Copy a generic `site` child so it resolves relative to the domain root
    fn adapt_site_child(&self, slug: &str, child: &RouteSpec) -> RouteSpec {
        let mut adapted = child.clone();
        if let Some(stripped) = adapted.pattern.strip_prefix('/') {
            adapted.pattern = stripped.to_string();
        }

        adapted
            .defaults
            .entry("controller".to_string())
            .or_insert_with(|| "Index".to_string());
        adapted
            .defaults
            .insert(SITE_SLUG_PARAM.to_string(), slug.to_string());

        if !adapted.constraints.is_empty() && adapted.pattern.contains(":controller") {
            adapted
                .constraints
                .insert("controller".to_string(), self.controller_constraint());
        }

        adapted
    }

    /// Rebuild a runtime-registered route without the slug segment.
    ///
    /// Returns `None` when the route cannot be decomposed or when nothing but
    /// the slug segment remains.
    fn adapt_dynamic_route(&self, slug: &str, route: &dyn PlatformRoute) -> Option<RouteSpec> {
        let decomposition = route.decompose()?;
        let parts = self.strip_site_parts(&decomposition.parts);
        let rendered = render_pattern(&parts);
        let pattern = rendered.strip_prefix('/').unwrap_or(&rendered).to_string();
        if pattern.is_empty() {
            return None;
        }

        let kind = match route.kind() {
            RouteKind::Literal => RouteKind::Literal,
            RouteKind::Segment if is_plain_literal(&parts) => RouteKind::Literal,
            RouteKind::Segment => RouteKind::Segment,
        };

        let mut spec = RouteSpec::new(kind, pattern);
        spec.defaults = decomposition.defaults;
        spec.defaults
            .insert(SITE_SLUG_PARAM.to_string(), slug.to_string());
        spec.constraints = decomposition.constraints;
        spec.constraints.remove(SITE_SLUG_PARAM);
        if has_parameter(&parts, "controller") {
            spec.constraints
                .insert("controller".to_string(), self.controller_constraint());
        }
        Some(spec)
    }

    /// Drop the site indicator literal and the slug parameter at any depth
    fn strip_site_parts(&self, parts: &[PathPart]) -> Vec<PathPart> {
        let indicator_forms = [
            format!("/{}/", self.site_indicator),
            format!("/{}", self.site_indicator),
        ];

        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                PathPart::Literal(text) if indicator_forms.iter().any(|form| form == text) => {}
                PathPart::Parameter(name) if name == SITE_SLUG_PARAM => {}
                PathPart::Optional(inner) => {
                    let inner = self.strip_site_parts(inner);
                    if !inner.is_empty() {
                        kept.push(PathPart::Optional(inner));
                    }
                }
                other => kept.push(other.clone()),
            }
        }
        kept
    }
}

fn is_plain_literal(parts: &[PathPart]) -> bool {
    parts.iter().all(|part| matches!(part, PathPart::Literal(_)))
}

fn insert_before_catch_alls(root: &mut RouteSpec, name: &str, child: RouteSpec) {
    let position = root
        .children
        .iter()
        .position(|(existing, _)| existing == "resource-id" || existing == "resource")
        .unwrap_or(root.children.len());
    root.children.insert(position, (name.to_string(), child));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routing::definitions::{CompiledRoute, RegisteredRoute, RouteDecomposition};
    use std::sync::Arc;

    #[derive(Debug)]
    struct OpaqueRoute;

    impl PlatformRoute for OpaqueRoute {
        fn name(&self) -> &str {
            "opaque"
        }

        fn decompose(&self) -> Option<RouteDecomposition> {
            None
        }
    }

    fn builder() -> RouteTemplateBuilder {
        RouteTemplateBuilder::new("s")
    }

    fn compiled(table: &SynthesizedRouteTable) -> CompiledRoute {
        CompiledRoute::compile(&table.root_name, &table.root).unwrap()
    }

    #[test]
    fn test_build_is_idempotent() {
        let catalog = PlatformCatalog::standard("s");
        let first = builder().build("demo", Some("about"), &catalog);
        let second = builder().build("demo", Some("about"), &catalog);
        assert_eq!(first, second);
    }

    #[test]
    fn test_root_defaults_to_browse_without_default_page() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));
        assert_eq!(table.root_name, "site::demo");
        assert_eq!(table.default_target, "item/browse");
        assert_eq!(table.default_page_path, "s/demo");
        assert_eq!(table.root.defaults.get("controller").map(String::as_str), Some("Item"));
        assert_eq!(table.root.defaults.get("action").map(String::as_str), Some("browse"));
        assert!(!table.root.defaults.contains_key(PAGE_SLUG_PARAM));
    }

    #[test]
    fn test_root_defaults_to_default_page() {
        let table = builder().build("demo", Some("about"), &PlatformCatalog::standard("s"));
        assert_eq!(table.default_target, "page/about");
        let root = compiled(&table);

        let at_root = root.match_path("/").unwrap();
        let at_default = root.match_path("/s/demo").unwrap();
        assert_eq!(at_root.route, "site::demo");
        assert_eq!(at_default.route, "site::demo/default-page");
        assert_eq!(at_root.params.get("controller"), at_default.params.get("controller"));
        assert_eq!(at_root.params.get(PAGE_SLUG_PARAM).map(String::as_str), Some("about"));
        assert_eq!(at_default.params.get(PAGE_SLUG_PARAM).map(String::as_str), Some("about"));
    }

    #[test]
    fn test_every_route_carries_slug() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));
        let root = compiled(&table);
        for path in ["/item/5", "/item", "/page/about", "/item-set/3", "/search", "/timeline/2"] {
            let found = root.match_path(path).unwrap_or_else(|| panic!("{} should match", path));
            assert_eq!(
                found.params.get(SITE_SLUG_PARAM).map(String::as_str),
                Some("demo"),
                "{} lost the slug",
                path
            );
        }
    }

    #[test]
    fn test_specific_routes_beat_catch_alls() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));
        let root = compiled(&table);
        assert_eq!(root.match_path("/page/about").unwrap().route, "site::demo/page");
        assert_eq!(root.match_path("/item/5").unwrap().route, "site::demo/resource-id");
        assert_eq!(root.match_path("/item/browse").unwrap().route, "site::demo/resource");
        assert_eq!(root.match_path("/timeline").unwrap().route, "site::demo/timeline");
    }

    #[test]
    fn test_legacy_form_does_not_match() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));
        let root = compiled(&table);
        assert!(root.match_path("/s/demo/item/5").is_none());
    }

    #[test]
    fn test_long_indicator_never_matches_as_controller() {
        let builder = RouteTemplateBuilder::new("site");
        let table = builder.build("demo", None, &PlatformCatalog::standard("site"));
        let root = compiled(&table);

        assert!(root.match_path("/site/other").is_none());
        assert!(root.match_path("/site").is_none());
        assert_eq!(root.match_path("/item/5").unwrap().route, "site::demo/resource-id");
        assert_eq!(root.match_path("/item/browse").unwrap().route, "site::demo/resource");
        assert_eq!(root.match_path("/site/demo").unwrap().route, "site::demo/default-page");
    }

    #[test]
    fn test_generic_children_are_adapted() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));

        let search = table.root.child("search").unwrap();
        assert_eq!(search.pattern, "search[/:action]");
        assert_eq!(search.defaults.get("controller").map(String::as_str), Some("Index"));
        assert_eq!(search.defaults.get(SITE_SLUG_PARAM).map(String::as_str), Some("demo"));

        let faceted = table.root.child("faceted").unwrap();
        assert_eq!(faceted.pattern, "faceted/:controller");
        assert_eq!(faceted.constraints.get("controller"), Some(&builder().controller_constraint()));

        // Already-defined names keep the builder's own definition
        assert_eq!(table.root.child("page").unwrap().pattern, "page/:page-slug");
    }

    #[test]
    fn test_excluded_routes_never_synthesized() {
        let catalog = PlatformCatalog::standard("s")
            .with_site_child("admin-tools", RouteSpec::literal("/admin-tools"))
            .with_site_child("login", RouteSpec::literal("/login"))
            .with_dynamic_route(Arc::new(RegisteredRoute::new("api-context", "/api-context")));
        let table = builder().build("demo", None, &catalog);

        for name in ["admin-tools", "login", "api-context", "oai-pmh", "top", "site"] {
            assert!(!table.root.has_child(name), "{} should be excluded", name);
        }
    }

    #[test]
    fn test_dynamic_routes_lose_slug_segment() {
        let table = builder().build("demo", None, &PlatformCatalog::standard("s"));

        let timeline = table.root.child("timeline").unwrap();
        assert_eq!(timeline.pattern, "timeline[/:id]");
        assert_eq!(timeline.kind, RouteKind::Segment);
        assert_eq!(timeline.defaults.get(SITE_SLUG_PARAM).map(String::as_str), Some("demo"));

        // Optional slug group disappears entirely
        let transcription = table.root.child("transcription").unwrap();
        assert_eq!(transcription.pattern, "transcribe/project/:project-id");
    }

    #[test]
    fn test_dynamic_routes_without_path_are_dropped() {
        let catalog = PlatformCatalog::new()
            .with_dynamic_route(Arc::new(RegisteredRoute::new("slug-only", "/s/:site-slug")))
            .with_dynamic_route(Arc::new(OpaqueRoute))
            .with_dynamic_route(Arc::new(RegisteredRoute::new("about", "/s/:site-slug/about")));
        let table = builder().build("demo", None, &catalog);

        assert!(!table.root.has_child("slug-only"));
        assert!(!table.root.has_child("opaque"));
        let about = table.root.child("about").unwrap();
        assert_eq!(about.kind, RouteKind::Literal);
        assert_eq!(about.pattern, "about");
    }

    #[test]
    fn test_is_excluded_path() {
        assert!(is_excluded_path("/admin"));
        assert!(is_excluded_path("/login"));
        assert!(is_excluded_path("/api/items"));
        assert!(is_excluded_path("/page/site-admin-notes"));
        assert!(!is_excluded_path("/page/rapid-response"));
        assert!(!is_excluded_path("/item/5"));
        assert!(!is_excluded_path("/"));
    }
}
