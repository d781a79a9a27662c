//! Request Resolver
//!
//! Turns an inbound request into a [`Resolution`]:
//!
//! 1. Normalize the host and look up its mapping (through the domain cache).
//!    No mapping, or an excluded path, ends in passthrough.
//! 2. Build the site's synthesized table and upsert it into the registry.
//! 3. Match the path against that table only. On a miss, a path in the
//!    `/<indicator>/<slug>` form is stripped and retried exactly once. A path
//!    addressing another site by its slug is sent to that site's domain, or
//!    left unmatched when that site has none.
//! 4. Hand the outcome to [`redirect::decide`](super::redirect::decide).
//!
//! Nothing in here returns an error: store failures are logged and the
//! request passes through.

use std::sync::Arc;

use axum::http::{header, HeaderMap, Uri};

use sitehost_shared::SiteBinding;

use super::cache::DomainCache;
use super::definitions::ROUTE_NAME_SEPARATOR;
use super::pattern::Params;
use super::platform::PlatformCatalog;
use super::redirect::{self, MatchOutcome, PassthroughReason, Resolution};
use super::registry::{Installation, RouteRegistry};
use super::template::{is_excluded_path, RouteTemplateBuilder, SynthesizedRouteTable};
use crate::mappings::domain::{is_valid_hostname, normalize_host};
use crate::mappings::store::MappingStore;

/// Header set by TLS-terminating proxies
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

/// The parts of a request that resolution looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
}

impl RequestContext {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query: Option<String>,
    ) -> Self {
        let path = path.into();
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: if path.is_empty() { "/".to_string() } else { path },
            query: query.filter(|q| !q.is_empty()),
        }
    }

    /// Extract from an HTTP request.
    ///
    /// Scheme comes from `X-Forwarded-Proto` when present, host from the
    /// `Host` header, falling back to the URI authority.
    pub fn from_http(headers: &HeaderMap, uri: &Uri, default_scheme: &str) -> Self {
        let scheme = headers
            .get(FORWARDED_PROTO_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_scheme.to_string());

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_default();

        Self::new(scheme, host, uri.path(), uri.query().map(str::to_string))
    }
}

/// Strip a legacy `/<indicator>/<slug>` prefix.
///
/// Returns the remainder, at least `/`, or `None` when the path does not
/// start with exactly that prefix.
pub fn strip_legacy_prefix<'a>(path: &'a str, indicator: &str, slug: &str) -> Option<&'a str> {
    let rest = path.strip_prefix('/')?.strip_prefix(indicator)?.strip_prefix('/')?;
    let rest = rest.strip_prefix(slug)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Slug of a `/<indicator>/<slug>[/...]` path
pub fn legacy_slug<'a>(path: &'a str, indicator: &str) -> Option<&'a str> {
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next()? != indicator {
        return None;
    }
    segments.next().filter(|slug| !slug.is_empty())
}

/// Resolves requests against per-site synthesized route tables
pub struct DomainResolver {
    store: Arc<dyn MappingStore>,
    registry: Arc<RouteRegistry>,
    catalog: Arc<PlatformCatalog>,
    builder: RouteTemplateBuilder,
    cache: Arc<DomainCache>,
    canonicalize_platform_host: bool,
}

impl DomainResolver {
    pub fn new(
        store: Arc<dyn MappingStore>,
        registry: Arc<RouteRegistry>,
        catalog: Arc<PlatformCatalog>,
        builder: RouteTemplateBuilder,
        cache: Arc<DomainCache>,
    ) -> Self {
        Self {
            store,
            registry,
            catalog,
            builder,
            cache,
            canonicalize_platform_host: false,
        }
    }

    /// Redirect slug-addressed requests on unmapped hosts to the site's domain
    pub fn with_platform_host_canonicalization(mut self, enabled: bool) -> Self {
        self.canonicalize_platform_host = enabled;
        self
    }

    pub async fn resolve(&self, request: &RequestContext) -> Resolution {
        let host = normalize_host(&request.host);

        let (binding, foreign_host) = match self.lookup(&host).await {
            Some(binding) => (binding, false),
            None => match self.platform_host_binding(&request.path).await {
                Some(binding) => (binding, true),
                None => {
                    tracing::debug!(host = %host, path = %request.path, "Host has no domain mapping");
                    return Resolution::Passthrough(PassthroughReason::Unmapped);
                }
            },
        };

        let slug = binding.site_slug.as_str();
        let legacy_remainder = strip_legacy_prefix(&request.path, self.builder.site_indicator(), slug);
        if is_excluded_path(legacy_remainder.unwrap_or(&request.path)) {
            tracing::debug!(host = %host, site_slug = %slug, path = %request.path, "Excluded path");
            return Resolution::Passthrough(PassthroughReason::Excluded);
        }

        let Some(table) = self.install_table(&binding) else {
            return Resolution::Passthrough(PassthroughReason::Unmatched);
        };
        let root_name = table.root_name;
        let default_target = table.default_target;
        let default_page_path = format!("/{}", table.default_page_path);

        let mut resolved_path = request.path.as_str();
        let mut legacy = false;
        let mut matched = self.registry.match_site(&root_name, resolved_path);
        if matched.is_none() {
            if let Some(remainder) = legacy_remainder {
                resolved_path = remainder;
                legacy = true;
                matched = self.registry.match_site(&root_name, remainder);
            }
        }

        if matched.is_none() && !legacy && !foreign_host {
            if let Some(location) = self.other_site_location(request, slug).await {
                tracing::debug!(host = %host, site_slug = %slug, location = %location, "Path addresses another site");
                return Resolution::Redirect(location);
            }
        }

        let resolution = redirect::decide(MatchOutcome {
            scheme: &request.scheme,
            domain: binding.domain(),
            resolved_path,
            query: request.query.as_deref(),
            legacy,
            foreign_host,
            default_page_path: &default_page_path,
            default_target: &default_target,
            matched,
        });

        match &resolution {
            Resolution::Serve(found) => {
                tracing::debug!(host = %host, site_slug = %slug, route = %found.route, "Serving site route");
            }
            Resolution::Redirect(location) => {
                tracing::debug!(host = %host, site_slug = %slug, location = %location, "Redirecting to canonical URL");
            }
            Resolution::Passthrough(reason) => {
                tracing::debug!(host = %host, site_slug = %slug, reason = ?reason, "No site route matched");
            }
        }
        resolution
    }

    /// Absolute URL of a route in a mapped site's table.
    ///
    /// `route` is relative to the site root (`resource-id`, `page`, or empty
    /// for the root itself). Returns `None` when the site has no domain or
    /// the route cannot be assembled from `params`.
    pub async fn site_url(&self, site_slug: &str, route: &str, params: &Params, scheme: &str) -> Option<String> {
        let binding = match self.store.find_by_site_slug(site_slug).await {
            Ok(binding) => binding?,
            Err(e) => {
                tracing::warn!(site_slug = %site_slug, error = %e, "Mapping lookup by slug failed");
                return None;
            }
        };
        let table = self.install_table(&binding)?;

        let route = route.trim_matches(ROUTE_NAME_SEPARATOR);
        let name = if route.is_empty() {
            table.root_name
        } else {
            format!("{}{}{}", table.root_name, ROUTE_NAME_SEPARATOR, route)
        };
        let path = self.registry.assemble(&name, params)?;
        Some(redirect::compose_url(scheme, binding.domain(), &path, None))
    }

    /// Build a site's table and upsert it into the registry
    fn install_table(&self, binding: &SiteBinding) -> Option<SynthesizedRouteTable> {
        let slug = binding.site_slug.as_str();
        let table = self
            .builder
            .build(slug, binding.default_page_slug.as_deref(), &self.catalog);

        match self.registry.add_routes(table.clone()) {
            Ok(Installation::Replaced) => {
                tracing::info!(site_slug = %slug, domain = %binding.domain(), "Site route table replaced");
                Some(table)
            }
            Ok(_) => Some(table),
            Err(e) => {
                tracing::warn!(site_slug = %slug, error = %e, "Failed to install site routes");
                None
            }
        }
    }

    async fn lookup(&self, host: &str) -> Option<SiteBinding> {
        if let Some(cached) = self.cache.get(host) {
            return cached;
        }

        match self.store.find_by_domain(host).await {
            Ok(binding) => {
                // Misses are only remembered for hosts that could ever be mapped
                if binding.is_some() || is_valid_hostname(host) {
                    self.cache.set(host, binding.clone());
                }
                binding
            }
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Mapping lookup failed");
                None
            }
        }
    }

    async fn platform_host_binding(&self, path: &str) -> Option<SiteBinding> {
        if !self.canonicalize_platform_host {
            return None;
        }
        let slug = legacy_slug(path, self.builder.site_indicator())?;

        match self.store.find_by_site_slug(slug).await {
            Ok(binding) => binding,
            Err(e) => {
                tracing::warn!(site_slug = %slug, error = %e, "Mapping lookup by slug failed");
                None
            }
        }
    }

    /// Canonical URL for a `/<indicator>/<other-slug>` path on a mapped host,
    /// when that other site has a domain of its own
    async fn other_site_location(&self, request: &RequestContext, own_slug: &str) -> Option<String> {
        let indicator = self.builder.site_indicator();
        let other = legacy_slug(&request.path, indicator).filter(|other| *other != own_slug)?;

        let binding = match self.store.find_by_site_slug(other).await {
            Ok(binding) => binding?,
            Err(e) => {
                tracing::warn!(site_slug = %other, error = %e, "Mapping lookup by slug failed");
                return None;
            }
        };
        let remainder = strip_legacy_prefix(&request.path, indicator, other).unwrap_or("/");
        Some(redirect::compose_url(
            &request.scheme,
            binding.domain(),
            remainder,
            request.query.as_deref(),
        ))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> Arc<DomainCache> {
        Arc::clone(&self.cache)
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }
}
