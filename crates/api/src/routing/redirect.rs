//! Redirect Decision Engine
//!
//! Pure decision over a finished match attempt. Given what was requested,
//! what matched, and the mapped site's canonical domain, picks exactly one of
//! passthrough, redirect, or serve. Redirect targets are absolute URLs built
//! by string composition.
//!
//! Decision table, first applicable row wins:
//!
//! | matched | condition                                   | outcome                          |
//! |---------|---------------------------------------------|----------------------------------|
//! | yes     | resolved path is `/` or the default-page path | redirect to the default target |
//! | yes     | legacy form, or request on another host     | redirect to the resolved path    |
//! | yes     | otherwise                                   | serve                            |
//! | no      | legacy form, or request on another host     | redirect to the normalized path  |
//! | no      | otherwise                                   | passthrough                      |

use serde::Serialize;

use super::definitions::RouteMatch;

/// Why a request was left to the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    /// Host has no domain mapping
    Unmapped,
    /// Path belongs to a route family that is never served through a domain
    Excluded,
    /// Nothing in the site's table matched, even after normalization
    Unmatched,
}

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Passthrough(PassthroughReason),
    Redirect(String),
    Serve(RouteMatch),
}

/// Everything the engine needs to decide, gathered by the resolver
#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    /// Scheme the redirect target should use
    pub scheme: &'a str,
    /// Canonical domain of the mapped site
    pub domain: &'a str,
    /// Path the match was attempted on last; the legacy-stripped path after a retry
    pub resolved_path: &'a str,
    pub query: Option<&'a str>,
    /// Request used the `/<indicator>/<slug>` form
    pub legacy: bool,
    /// Request arrived on a host other than `domain`
    pub foreign_host: bool,
    /// Default-page literal path, e.g. `/s/demo`
    pub default_page_path: &'a str,
    /// Canonical landing path relative to the domain root, e.g. `page/about`
    pub default_target: &'a str,
    pub matched: Option<RouteMatch>,
}

/// Apply the decision table
pub fn decide(outcome: MatchOutcome<'_>) -> Resolution {
    let relocated = outcome.legacy || outcome.foreign_host;

    match outcome.matched {
        Some(_) if is_site_index(outcome.resolved_path, outcome.default_page_path) => Resolution::Redirect(
            compose_url(outcome.scheme, outcome.domain, outcome.default_target, outcome.query),
        ),
        Some(_) if relocated => Resolution::Redirect(compose_url(
            outcome.scheme,
            outcome.domain,
            outcome.resolved_path,
            outcome.query,
        )),
        Some(found) => Resolution::Serve(found),
        None if relocated => Resolution::Redirect(compose_url(
            outcome.scheme,
            outcome.domain,
            outcome.resolved_path,
            outcome.query,
        )),
        None => Resolution::Passthrough(PassthroughReason::Unmatched),
    }
}

fn is_site_index(path: &str, default_page_path: &str) -> bool {
    path == "/" || path == default_page_path
}

/// Build `scheme://domain/path[?query]`.
///
/// A path that already starts with the domain is not prefixed twice, and an
/// empty query is dropped.
pub fn compose_url(scheme: &str, domain: &str, path: &str, query: Option<&str>) -> String {
    let trimmed = path.trim_start_matches('/');
    let relative = match trimmed.strip_prefix(domain) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => rest,
        _ => path,
    };
    let relative = relative.trim_start_matches('/');

    let mut url = format!("{}://{}/{}", scheme, domain, relative);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}
