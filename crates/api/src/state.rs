//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::mappings::{MappingReconciler, MappingStore};
use crate::routing::pattern::PatternError;
use crate::routing::{DomainCache, DomainResolver, PlatformCatalog, RouteRegistry, RouteTemplateBuilder};

/// State handed to every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MappingStore>,
    pub registry: Arc<RouteRegistry>,
    pub resolver: Arc<DomainResolver>,
    pub reconciler: Arc<MappingReconciler>,
}

impl AppState {
    /// Wire the routing components over a mapping store using the platform's
    /// standard route catalog
    pub fn new(config: Config, store: Arc<dyn MappingStore>) -> Result<Self, PatternError> {
        let catalog = PlatformCatalog::standard(&config.site_prefix);
        Self::with_catalog(config, store, catalog)
    }

    pub fn with_catalog(
        config: Config,
        store: Arc<dyn MappingStore>,
        catalog: PlatformCatalog,
    ) -> Result<Self, PatternError> {
        let registry = Arc::new(RouteRegistry::new(&catalog.static_routes)?);
        let cache = Arc::new(DomainCache::with_ttl(config.domain_cache_ttl));
        let resolver = DomainResolver::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::new(catalog),
            RouteTemplateBuilder::new(config.site_prefix.clone()),
            cache,
        )
        .with_platform_host_canonicalization(config.canonicalize_platform_host);

        Ok(Self {
            reconciler: Arc::new(MappingReconciler::new(Arc::clone(&store))),
            resolver: Arc::new(resolver),
            registry,
            store,
            config: Arc::new(config),
        })
    }
}
