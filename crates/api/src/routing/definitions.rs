//! Route definitions and tree matching
//!
//! A [`RouteSpec`] is the declarative form of a route tree as the host
//! platform registers it. Specs are plain data and compare structurally, which
//! is what makes route synthesis checkable for idempotence. Before matching,
//! a spec is compiled into a [`CompiledRoute`] tree.

use std::fmt;

use serde::Serialize;

use super::pattern::{CompiledPattern, Constraint, Constraints, Params, PathPart, PatternError};

/// Separator between a parent route name and a child route name
pub const ROUTE_NAME_SEPARATOR: char = '/';

/// How a route's pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Pattern is matched verbatim
    Literal,
    /// Pattern may contain `:params` and `[optional]` groups
    Segment,
}

/// Declarative route tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub kind: RouteKind,
    pub pattern: String,
    pub defaults: Params,
    pub constraints: Constraints,
    pub may_terminate: bool,
    /// Child routes in precedence order; names are unique
    pub children: Vec<(String, RouteSpec)>,
}

impl RouteSpec {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::new(RouteKind::Literal, pattern)
    }

    pub fn segment(pattern: impl Into<String>) -> Self {
        Self::new(RouteKind::Segment, pattern)
    }

    pub fn new(kind: RouteKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            defaults: Params::new(),
            constraints: Constraints::new(),
            may_terminate: false,
            children: Vec::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn with_constraint(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(name.into(), constraint);
        self
    }

    pub fn terminating(mut self) -> Self {
        self.may_terminate = true;
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: RouteSpec) -> Self {
        self.set_child(name, child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&RouteSpec> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, spec)| spec)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Insert a child, replacing an existing child of the same name in place
    pub fn set_child(&mut self, name: impl Into<String>, child: RouteSpec) {
        let name = name.into();
        match self.children.iter_mut().find(|(child_name, _)| *child_name == name) {
            Some(slot) => slot.1 = child,
            None => self.children.push((name, child)),
        }
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }
}

/// Result of matching a path against a route tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// Fully-qualified route name, e.g. `site::demo/resource-id`
    pub route: String,
    pub params: Params,
}

/// A route tree ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    name: String,
    pattern: CompiledPattern,
    defaults: Params,
    constraints: Constraints,
    may_terminate: bool,
    children: Vec<CompiledRoute>,
}

impl CompiledRoute {
    /// Compile a spec tree.
    ///
    /// Children whose patterns fail to parse are skipped with a warning; only
    /// a malformed root is an error.
    pub fn compile(name: &str, spec: &RouteSpec) -> Result<Self, PatternError> {
        let pattern = match spec.kind {
            RouteKind::Literal => CompiledPattern::literal(&spec.pattern),
            RouteKind::Segment => CompiledPattern::segment(&spec.pattern)?,
        };

        let mut children = Vec::with_capacity(spec.children.len());
        for (child_name, child_spec) in &spec.children {
            match CompiledRoute::compile(child_name, child_spec) {
                Ok(child) => children.push(child),
                Err(e) => {
                    tracing::warn!(
                        route = %name,
                        child = %child_name,
                        error = %e,
                        "Skipping child route with malformed pattern"
                    );
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            pattern,
            defaults: spec.defaults.clone(),
            constraints: spec.constraints.clone(),
            may_terminate: spec.may_terminate,
            children,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match a full request path against this tree
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.match_at(path, 0, None, &Params::new())
    }

    /// Build the path of a route in this tree from its fully-qualified name.
    ///
    /// Each node on the way contributes its pattern rendered with `params`;
    /// defaults accumulate from the root down as they do when matching.
    pub fn assemble(&self, route: &str, params: &Params) -> Option<String> {
        let mut names = route.split(ROUTE_NAME_SEPARATOR);
        if names.next()? != self.name {
            return None;
        }
        let rest: Vec<&str> = names.collect();

        let mut path = String::new();
        self.assemble_into(&rest, params, &Params::new(), &mut path)?;
        Some(path)
    }

    fn assemble_into(&self, rest: &[&str], params: &Params, inherited: &Params, out: &mut String) -> Option<()> {
        let mut defaults = inherited.clone();
        defaults.extend(self.defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        out.push_str(&self.pattern.assemble(params, &defaults, &self.constraints)?);

        match rest.split_first() {
            None => (self.may_terminate || self.children.is_empty()).then_some(()),
            Some((next, tail)) => self
                .children
                .iter()
                .find(|child| child.name == *next)?
                .assemble_into(tail, params, &defaults, out),
        }
    }

    fn match_at(&self, path: &str, pos: usize, parent: Option<&str>, inherited: &Params) -> Option<RouteMatch> {
        let name = match parent {
            Some(parent) => format!("{}{}{}", parent, ROUTE_NAME_SEPARATOR, self.name),
            None => self.name.clone(),
        };

        for (end, captured) in self.pattern.match_prefix(path, pos, &self.constraints) {
            let mut params = inherited.clone();
            params.extend(self.defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
            params.extend(captured);

            if end == path.len() && (self.may_terminate || self.children.is_empty()) {
                return Some(RouteMatch { route: name, params });
            }

            for child in &self.children {
                if let Some(found) = child.match_at(path, end, Some(&name), &params) {
                    return Some(found);
                }
            }
        }

        None
    }
}

/// Structural view of a platform route: its path pieces plus defaults
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteDecomposition {
    pub parts: Vec<PathPart>,
    pub defaults: Params,
    pub constraints: Constraints,
}

/// A route registered at runtime by the host platform or one of its modules.
///
/// Routes that cannot describe their path structure return `None` from
/// [`PlatformRoute::decompose`] and are left out of synthesized tables.
pub trait PlatformRoute: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> RouteKind {
        RouteKind::Segment
    }

    fn decompose(&self) -> Option<RouteDecomposition>;
}

/// A platform route declared by pattern string
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    name: String,
    pattern: String,
    defaults: Params,
    constraints: Constraints,
}

impl RegisteredRoute {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            defaults: Params::new(),
            constraints: Constraints::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn with_constraint(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(name.into(), constraint);
        self
    }
}

impl PlatformRoute for RegisteredRoute {
    fn name(&self) -> &str {
        &self.name
    }

    fn decompose(&self) -> Option<RouteDecomposition> {
        let parts = super::pattern::parse_pattern(&self.pattern).ok()?;
        Some(RouteDecomposition {
            parts,
            defaults: self.defaults.clone(),
            constraints: self.constraints.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_tree() -> RouteSpec {
        RouteSpec::literal("/")
            .terminating()
            .with_default("controller", "Index")
            .with_child(
                "page",
                RouteSpec::segment("page/:page-slug").with_default("action", "show"),
            )
            .with_child(
                "resource",
                RouteSpec::segment(":controller[/:action]")
                    .with_default("action", "browse")
                    .with_constraint("controller", Constraint::Identifier { min_len: 3 }),
            )
    }

    #[test]
    fn test_assemble_reverses_match() {
        let compiled = CompiledRoute::compile("root", &sample_tree()).unwrap();
        for path in ["/", "/page/about", "/item", "/item/edit"] {
            let found = compiled.match_path(path).unwrap();
            assert_eq!(compiled.assemble(&found.route, &found.params).as_deref(), Some(path));
        }

        assert!(compiled.assemble("root/missing", &Params::new()).is_none());
        assert!(compiled.assemble("other/page", &Params::new()).is_none());
        // Required page slug has no default
        assert!(compiled.assemble("root/page", &Params::new()).is_none());
    }

    #[test]
    fn test_root_terminates_on_exact_path() {
        let compiled = CompiledRoute::compile("root", &sample_tree()).unwrap();
        let found = compiled.match_path("/").unwrap();
        assert_eq!(found.route, "root");
        assert_eq!(found.params.get("controller").map(String::as_str), Some("Index"));
    }

    #[test]
    fn test_first_child_wins_and_params_merge() {
        let compiled = CompiledRoute::compile("root", &sample_tree()).unwrap();

        let found = compiled.match_path("/page/about").unwrap();
        assert_eq!(found.route, "root/page");
        assert_eq!(found.params.get("page-slug").map(String::as_str), Some("about"));
        assert_eq!(found.params.get("action").map(String::as_str), Some("show"));
        // Inherited from the parent
        assert_eq!(found.params.get("controller").map(String::as_str), Some("Index"));

        let found = compiled.match_path("/item").unwrap();
        assert_eq!(found.route, "root/resource");
        assert_eq!(found.params.get("controller").map(String::as_str), Some("item"));
        assert_eq!(found.params.get("action").map(String::as_str), Some("browse"));
    }

    #[test]
    fn test_partial_match_is_not_a_match() {
        let compiled = CompiledRoute::compile("root", &sample_tree()).unwrap();
        assert!(compiled.match_path("/page/about/extra").is_none());
        assert!(compiled.match_path("/s/demo").is_none());
    }

    #[test]
    fn test_malformed_child_is_skipped() {
        let spec = sample_tree().with_child("broken", RouteSpec::segment("oops[/:id"));
        let compiled = CompiledRoute::compile("root", &spec).unwrap();
        assert!(compiled.match_path("/item/browse").is_some());
    }

    #[test]
    fn test_set_child_replaces_in_place() {
        let mut spec = sample_tree();
        spec.set_child("page", RouteSpec::literal("pages"));
        let names: Vec<&str> = spec.child_names().collect();
        assert_eq!(names, vec!["page", "resource"]);
        assert_eq!(spec.child("page").unwrap().pattern, "pages");
    }

    #[test]
    fn test_registered_route_decomposes() {
        let route = RegisteredRoute::new("timeline", "/s/:site-slug/timeline[/:id]")
            .with_default("controller", "Timeline");
        let decomposed = route.decompose().unwrap();
        assert_eq!(decomposed.parts.len(), 4);
        assert_eq!(
            decomposed.defaults.get("controller").map(String::as_str),
            Some("Timeline")
        );

        let broken = RegisteredRoute::new("broken", "/s/[:site-slug");
        assert!(broken.decompose().is_none());
    }
}
