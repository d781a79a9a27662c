//! Route Registry
//!
//! Holds the host platform's static routes plus one synthesized table per
//! site, each under its own `site::<slug>` key. Routes are matched inbound
//! and assembled back into paths for outbound links.
//!
//! # Concurrency
//! Installation is an upsert and is not serialized. Two requests for a site
//! seen for the first time may both build and install its table; builds are
//! idempotent so the last writer installs an identical table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::definitions::{CompiledRoute, RouteMatch, RouteSpec, ROUTE_NAME_SEPARATOR};
use super::pattern::{Params, PatternError};
use super::template::{SynthesizedRouteTable, ADMIN_MARKER};

/// Outcome of installing a synthesized table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// No table was registered under this key before
    Installed,
    /// A different table was registered and has been replaced
    Replaced,
    /// An identical table was already registered
    Unchanged,
}

struct InstalledTable {
    table: Arc<SynthesizedRouteTable>,
    compiled: Arc<CompiledRoute>,
}

/// Namespaced route registry shared by all requests
pub struct RouteRegistry {
    static_routes: Vec<CompiledRoute>,
    tables: RwLock<HashMap<String, InstalledTable>>,
}

impl RouteRegistry {
    /// Create a registry over the platform's static routes
    pub fn new(static_routes: &[(String, RouteSpec)]) -> Result<Self, PatternError> {
        let static_routes = static_routes
            .iter()
            .map(|(name, spec)| CompiledRoute::compile(name, spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            static_routes,
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Install a synthesized table under its site-scoped key
    pub fn add_routes(&self, table: SynthesizedRouteTable) -> Result<Installation, PatternError> {
        {
            let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(existing) = tables.get(&table.root_name) {
                if *existing.table == table {
                    return Ok(Installation::Unchanged);
                }
            }
        }

        // Compile outside the write lock
        let compiled = CompiledRoute::compile(&table.root_name, &table.root)?;
        let key = table.root_name.clone();
        let installed = InstalledTable {
            table: Arc::new(table),
            compiled: Arc::new(compiled),
        };

        let mut tables = self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = tables.insert(key.clone(), installed);

        let outcome = if previous.is_some() {
            Installation::Replaced
        } else {
            Installation::Installed
        };
        tracing::debug!(route = %key, outcome = ?outcome, total_tables = tables.len(), "Site route table installed");
        Ok(outcome)
    }

    /// Returns true if a site table or a static route is registered under this name
    pub fn has_route(&self, name: &str) -> bool {
        let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.contains_key(name) || self.static_routes.iter().any(|r| r.name() == name)
    }

    /// Remove a site table. Static routes cannot be removed.
    pub fn remove_route(&self, name: &str) -> bool {
        let mut tables = self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.remove(name).is_some()
    }

    /// The table currently installed under a key
    pub fn table(&self, name: &str) -> Option<Arc<SynthesizedRouteTable>> {
        let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.get(name).map(|installed| Arc::clone(&installed.table))
    }

    /// Match a path against one site's table only
    pub fn match_site(&self, name: &str, path: &str) -> Option<RouteMatch> {
        let compiled = {
            let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(&tables.get(name)?.compiled)
        };
        compiled.match_path(path)
    }

    /// Match a path against the platform's static routes, in registration order
    pub fn match_static(&self, path: &str) -> Option<RouteMatch> {
        self.static_routes.iter().find_map(|route| route.match_path(path))
    }

    /// Assemble the path of a named route, e.g. `site::demo/resource-id`.
    ///
    /// A browse link (`action=browse`) aimed at a route that does not name
    /// the browsed resource is sent to that route's `<name>/<resource>`
    /// child when one exists, so `site::demo` with `controller=item` becomes
    /// `site::demo/resource`. Administrative routes are never rewritten.
    pub fn assemble(&self, name: &str, params: &Params) -> Option<String> {
        if let Some(browse) = self.browse_route(name, params) {
            if let Some(path) = self.assemble_exact(&browse, params) {
                return Some(path);
            }
        }
        self.assemble_exact(name, params)
    }

    fn assemble_exact(&self, name: &str, params: &Params) -> Option<String> {
        let root = name.split(ROUTE_NAME_SEPARATOR).next()?;
        let site = {
            let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            tables.get(root).map(|installed| Arc::clone(&installed.compiled))
        };
        match site {
            Some(compiled) => compiled.assemble(name, params),
            None => self
                .static_routes
                .iter()
                .find(|route| route.name() == root)?
                .assemble(name, params),
        }
    }

    fn browse_route(&self, name: &str, params: &Params) -> Option<String> {
        if name.contains(ADMIN_MARKER) || params.get("action").map(String::as_str) != Some("browse") {
            return None;
        }
        let controller = params.get("controller")?.to_lowercase();
        let child = if controller == "item" {
            "resource".to_string()
        } else {
            controller
        };
        if name.contains(child.as_str()) || self.has_route(&child) {
            return None;
        }
        Some(format!("{}{}{}", name, ROUTE_NAME_SEPARATOR, child))
    }

    /// Number of installed site tables
    pub fn site_count(&self) -> usize {
        let tables = self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routing::platform::PlatformCatalog;
    use crate::routing::template::RouteTemplateBuilder;
    use std::thread;

    fn registry() -> RouteRegistry {
        RouteRegistry::new(&PlatformCatalog::standard("s").static_routes).unwrap()
    }

    fn table(slug: &str, default_page: Option<&str>) -> SynthesizedRouteTable {
        RouteTemplateBuilder::new("s").build(slug, default_page, &PlatformCatalog::standard("s"))
    }

    #[test]
    fn test_install_then_unchanged_then_replaced() {
        let registry = registry();
        assert_eq!(registry.add_routes(table("demo", None)).unwrap(), Installation::Installed);
        assert_eq!(registry.add_routes(table("demo", None)).unwrap(), Installation::Unchanged);
        assert_eq!(
            registry.add_routes(table("demo", Some("about"))).unwrap(),
            Installation::Replaced
        );
        assert_eq!(registry.site_count(), 1);
        assert_eq!(registry.table("site::demo").unwrap().default_target, "page/about");
    }

    #[test]
    fn test_site_tables_are_isolated() {
        let registry = registry();
        registry.add_routes(table("alpha", None)).unwrap();
        registry.add_routes(table("beta", None)).unwrap();

        let found = registry.match_site("site::alpha", "/item/1").unwrap();
        assert!(found.route.starts_with("site::alpha/"));
        assert_eq!(found.params.get("site-slug").map(String::as_str), Some("alpha"));

        assert!(registry.match_site("site::gamma", "/item/1").is_none());
    }

    #[test]
    fn test_has_and_remove_route() {
        let registry = registry();
        registry.add_routes(table("demo", None)).unwrap();
        assert!(registry.has_route("site::demo"));
        assert!(registry.has_route("admin"));

        assert!(registry.remove_route("site::demo"));
        assert!(!registry.has_route("site::demo"));
        assert!(!registry.remove_route("admin"));
        assert!(registry.has_route("admin"));
    }

    #[test]
    fn test_assemble_site_routes_round_trip() {
        let registry = registry();
        registry.add_routes(table("demo", None)).unwrap();

        for path in ["/", "/item/5", "/item/5/edit", "/page/about", "/item-set/3", "/timeline/2", "/search"] {
            let found = registry.match_site("site::demo", path).unwrap();
            assert_eq!(
                registry.assemble(&found.route, &found.params).as_deref(),
                Some(path),
                "route {}",
                found.route
            );
        }
        assert!(registry.assemble("site::other/resource", &Params::new()).is_none());
    }

    #[test]
    fn test_assemble_rewrites_browse_links() {
        let registry = registry();
        registry.add_routes(table("demo", None)).unwrap();

        let browse = |controller: &str| -> Params {
            [("controller", controller), ("action", "browse")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        assert_eq!(registry.assemble("site::demo", &browse("item")).as_deref(), Some("/item"));
        assert_eq!(registry.assemble("site::demo", &browse("item-set")).as_deref(), Some("/item-set"));
        assert_eq!(registry.assemble("site::demo", &Params::new()).as_deref(), Some("/"));
        assert_eq!(
            registry.assemble("admin/default", &browse("item")).as_deref(),
            Some("/admin/item/browse")
        );
    }

    #[test]
    fn test_match_static_routes() {
        let registry = registry();
        assert_eq!(registry.match_static("/").unwrap().route, "top");
        assert_eq!(registry.match_static("/admin/item").unwrap().route, "admin/default");
        assert_eq!(registry.match_static("/s/demo/page/about").unwrap().route, "site/page");
        assert!(registry.match_static("/nothing/here/at/all").is_none());
    }

    #[test]
    fn test_concurrent_installs_converge() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.add_routes(table("demo", None)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.site_count(), 1);
        assert_eq!(*registry.table("site::demo").unwrap(), table("demo", None));
    }
}
