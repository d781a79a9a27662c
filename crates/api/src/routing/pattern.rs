//! Route path patterns
//!
//! Patterns are written the way the host platform declares them:
//! - literal text: `page`
//! - parameters: `:page-slug`
//! - optional groups: `item-set[/:item-set-id]` (groups may nest)
//!
//! A pattern is compiled into its flat alternatives (every combination of
//! optional groups present or absent), longest first, so matching is a
//! simple left-to-right scan with no backtracking and no regular expressions.
//! Assembly walks the same alternatives in the same order.

use std::collections::{BTreeMap, BTreeSet};

/// Captured or default route parameters
pub type Params = BTreeMap<String, String>;

/// Parameter constraints keyed by parameter name
pub type Constraints = BTreeMap<String, Constraint>;

/// Typed shape constraint for a route parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// One or more ASCII digits
    Digits,
    /// ASCII letter followed by alphanumerics, `_` or `-`, at least `min_len` long
    Identifier { min_len: usize },
    /// [`Constraint::Identifier`] that is never equal to `reserved`
    IdentifierExcept { min_len: usize, reserved: String },
    /// One or more alphanumerics, `_` or `-`
    Token,
}

impl Constraint {
    /// Returns true if the value satisfies this constraint
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Constraint::Digits => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Constraint::Identifier { min_len } => is_identifier(value, *min_len),
            Constraint::IdentifierExcept { min_len, reserved } => {
                is_identifier(value, *min_len) && value != reserved
            }
            Constraint::Token => !value.is_empty() && value.chars().all(is_token_char),
        }
    }
}

fn is_identifier(value: &str, min_len: usize) -> bool {
    let mut chars = value.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter && value.len() >= min_len.max(1) && chars.all(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_param_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// One structural piece of a route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Literal(String),
    Parameter(String),
    Optional(Vec<PathPart>),
}

impl PathPart {
    pub fn literal(text: impl Into<String>) -> Self {
        PathPart::Literal(text.into())
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        PathPart::Parameter(name.into())
    }
}

/// Errors raised while parsing a segment pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Unbalanced brackets in pattern '{0}'")]
    UnbalancedBrackets(String),

    #[error("Empty parameter name in pattern '{0}'")]
    EmptyParameter(String),
}

/// Parse a segment pattern into its parts
pub fn parse_pattern(pattern: &str) -> Result<Vec<PathPart>, PatternError> {
    // Stack of open groups; the bottom entry is the top-level sequence
    let mut stack: Vec<Vec<PathPart>> = vec![Vec::new()];
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ':' => {
                flush_literal(&mut literal, &mut stack);
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_param_name_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(PatternError::EmptyParameter(pattern.to_string()));
                }
                push_part(&mut stack, PathPart::Parameter(name));
            }
            '[' => {
                flush_literal(&mut literal, &mut stack);
                stack.push(Vec::new());
            }
            ']' => {
                flush_literal(&mut literal, &mut stack);
                if stack.len() < 2 {
                    return Err(PatternError::UnbalancedBrackets(pattern.to_string()));
                }
                let group = stack.pop().unwrap_or_default();
                push_part(&mut stack, PathPart::Optional(group));
            }
            other => literal.push(other),
        }
    }

    flush_literal(&mut literal, &mut stack);
    if stack.len() != 1 {
        return Err(PatternError::UnbalancedBrackets(pattern.to_string()));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn flush_literal(literal: &mut String, stack: &mut [Vec<PathPart>]) {
    if !literal.is_empty() {
        let text = std::mem::take(literal);
        push_part(stack, PathPart::Literal(text));
    }
}

fn push_part(stack: &mut [Vec<PathPart>], part: PathPart) {
    if let Some(top) = stack.last_mut() {
        // Adjacent literals are merged so equal paths render identically
        if let (PathPart::Literal(text), Some(PathPart::Literal(prev))) = (&part, top.last_mut()) {
            prev.push_str(text);
            return;
        }
        top.push(part);
    }
}

/// Render parts back into pattern syntax
pub fn render_pattern(parts: &[PathPart]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            PathPart::Literal(text) => out.push_str(text),
            PathPart::Parameter(name) => {
                out.push(':');
                out.push_str(name);
            }
            PathPart::Optional(inner) => {
                out.push('[');
                out.push_str(&render_pattern(inner));
                out.push(']');
            }
        }
    }
    out
}

/// Returns true if any part (at any depth) is the named parameter
pub fn has_parameter(parts: &[PathPart], name: &str) -> bool {
    parts.iter().any(|part| match part {
        PathPart::Parameter(p) => p == name,
        PathPart::Optional(inner) => has_parameter(inner, name),
        PathPart::Literal(_) => false,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Parameter(String),
}

/// A pattern compiled into flat alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    alternatives: Vec<Vec<Token>>,
}

impl CompiledPattern {
    /// Compile a literal pattern (no parameter or group syntax)
    pub fn literal(text: &str) -> Self {
        let tokens = if text.is_empty() {
            Vec::new()
        } else {
            vec![Token::Literal(text.to_string())]
        };
        Self {
            alternatives: vec![tokens],
        }
    }

    /// Compile a segment pattern
    pub fn segment(pattern: &str) -> Result<Self, PatternError> {
        let parts = parse_pattern(pattern)?;
        Ok(Self::from_parts(&parts))
    }

    pub fn from_parts(parts: &[PathPart]) -> Self {
        let mut alternatives = expand(parts);
        // Stable: among equal lengths the "group present" variant stays first
        alternatives.sort_by_key(|alt| std::cmp::Reverse(alt.len()));
        alternatives.dedup();
        Self { alternatives }
    }

    /// Match this pattern against `path` starting at byte offset `pos`.
    ///
    /// Yields every alternative that matches as a prefix, in priority order,
    /// as `(end_offset, captured_params)`.
    pub fn match_prefix(&self, path: &str, pos: usize, constraints: &Constraints) -> Vec<(usize, Params)> {
        self.alternatives
            .iter()
            .filter_map(|tokens| match_tokens(tokens, path, pos, constraints))
            .collect()
    }

    /// Render this pattern with parameter values.
    ///
    /// Values come from `params`, falling back to `defaults`. An optional
    /// group is emitted only when at least one parameter in it was given a
    /// value that differs from its default, so defaults stay implicit.
    /// Returns `None` when no alternative can be filled: a required
    /// parameter is missing or a value breaks its constraint.
    pub fn assemble(&self, params: &Params, defaults: &Params, constraints: &Constraints) -> Option<String> {
        let required = self.required_parameters();
        self.alternatives
            .iter()
            .filter(|tokens| {
                let mut optional = tokens.iter().filter_map(|token| match token {
                    Token::Parameter(name) if !required.contains(name.as_str()) => Some(name),
                    _ => None,
                });
                optional.clone().next().is_none()
                    || optional.any(|name| {
                        params
                            .get(name)
                            .is_some_and(|value| defaults.get(name) != Some(value))
                    })
            })
            .find_map(|tokens| render_tokens(tokens, params, defaults, constraints))
    }

    /// Parameters present in every alternative
    fn required_parameters(&self) -> BTreeSet<&str> {
        let mut alternatives = self.alternatives.iter().map(|tokens| {
            tokens
                .iter()
                .filter_map(|token| match token {
                    Token::Parameter(name) => Some(name.as_str()),
                    Token::Literal(_) => None,
                })
                .collect::<BTreeSet<_>>()
        });
        let first = alternatives.next().unwrap_or_default();
        alternatives.fold(first, |acc, set| acc.intersection(&set).copied().collect())
    }
}

fn render_tokens(tokens: &[Token], params: &Params, defaults: &Params, constraints: &Constraints) -> Option<String> {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Parameter(name) => {
                let value = params.get(name).or_else(|| defaults.get(name))?;
                if value.is_empty() || value.contains('/') {
                    return None;
                }
                if let Some(constraint) = constraints.get(name) {
                    if !constraint.accepts(value) {
                        return None;
                    }
                }
                out.push_str(value);
            }
        }
    }
    Some(out)
}

fn expand(parts: &[PathPart]) -> Vec<Vec<Token>> {
    let mut alternatives: Vec<Vec<Token>> = vec![Vec::new()];
    for part in parts {
        match part {
            PathPart::Literal(text) => {
                for alt in &mut alternatives {
                    append_literal(alt, text);
                }
            }
            PathPart::Parameter(name) => {
                for alt in &mut alternatives {
                    alt.push(Token::Parameter(name.clone()));
                }
            }
            PathPart::Optional(inner) => {
                let inner_alternatives = expand(inner);
                let mut next = Vec::with_capacity(alternatives.len() * (inner_alternatives.len() + 1));
                for alt in &alternatives {
                    for inner_alt in &inner_alternatives {
                        let mut combined = alt.clone();
                        for token in inner_alt {
                            match token {
                                Token::Literal(text) => append_literal(&mut combined, text),
                                Token::Parameter(_) => combined.push(token.clone()),
                            }
                        }
                        next.push(combined);
                    }
                    next.push(alt.clone());
                }
                alternatives = next;
            }
        }
    }
    alternatives
}

fn append_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

fn match_tokens(tokens: &[Token], path: &str, start: usize, constraints: &Constraints) -> Option<(usize, Params)> {
    let mut pos = start;
    let mut captured = Params::new();

    for token in tokens {
        let rest = path.get(pos..)?;
        match token {
            Token::Literal(text) => {
                if !rest.starts_with(text.as_str()) {
                    return None;
                }
                pos += text.len();
            }
            Token::Parameter(name) => {
                // A parameter never spans a path separator
                let len = rest.find('/').unwrap_or(rest.len());
                if len == 0 {
                    return None;
                }
                let value = &rest[..len];
                if let Some(constraint) = constraints.get(name) {
                    if !constraint.accepts(value) {
                        return None;
                    }
                }
                captured.insert(name.clone(), value.to_string());
                pos += len;
            }
        }
    }

    Some((pos, captured))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn constraints(pairs: &[(&str, Constraint)]) -> Constraints {
        pairs
            .iter()
            .map(|(name, c)| (name.to_string(), c.clone()))
            .collect()
    }

    #[test]
    fn test_constraint_accepts() {
        assert!(Constraint::Digits.accepts("42"));
        assert!(!Constraint::Digits.accepts("4a"));
        assert!(!Constraint::Digits.accepts(""));

        let controller = Constraint::Identifier { min_len: 3 };
        assert!(controller.accepts("item"));
        assert!(controller.accepts("item-set"));
        assert!(!controller.accepts("s"));
        assert!(!controller.accepts("ab"));
        assert!(!controller.accepts("1tem"));

        let controller = Constraint::IdentifierExcept {
            min_len: 3,
            reserved: "site".to_string(),
        };
        assert!(controller.accepts("item"));
        assert!(controller.accepts("sites"));
        assert!(!controller.accepts("site"));

        assert!(Constraint::Token.accepts("0-index_a"));
        assert!(!Constraint::Token.accepts("a.b"));
    }

    #[test]
    fn test_assemble_keeps_defaults_implicit() {
        let pattern = CompiledPattern::segment(":controller/:id[/:action[/:format]]").unwrap();
        let rules = constraints(&[("id", Constraint::Digits)]);
        let defaults = params(&[("action", "show")]);

        assert_eq!(
            pattern.assemble(&params(&[("controller", "item"), ("id", "5")]), &defaults, &rules),
            Some("item/5".to_string())
        );
        assert_eq!(
            pattern.assemble(
                &params(&[("controller", "item"), ("id", "5"), ("action", "show")]),
                &defaults,
                &rules
            ),
            Some("item/5".to_string())
        );
        assert_eq!(
            pattern.assemble(
                &params(&[("controller", "item"), ("id", "5"), ("action", "edit")]),
                &defaults,
                &rules
            ),
            Some("item/5/edit".to_string())
        );
        assert_eq!(
            pattern.assemble(
                &params(&[("controller", "item"), ("id", "5"), ("format", "json")]),
                &defaults,
                &rules
            ),
            Some("item/5/show/json".to_string())
        );
    }

    #[test]
    fn test_assemble_rejects_missing_and_invalid_values() {
        let pattern = CompiledPattern::segment("item-set/:item-set-id").unwrap();
        let rules = constraints(&[("item-set-id", Constraint::Digits)]);
        let none = Params::new();
        let no_rules = Constraints::new();

        assert!(pattern.assemble(&none, &none, &rules).is_none());
        assert!(pattern.assemble(&params(&[("item-set-id", "x")]), &none, &rules).is_none());
        assert!(pattern.assemble(&params(&[("item-set-id", "1/2")]), &none, &no_rules).is_none());
        assert_eq!(
            CompiledPattern::literal("/").assemble(&none, &none, &no_rules),
            Some("/".to_string())
        );
    }

    #[test]
    fn test_parse_nested_pattern() {
        let parts = parse_pattern(":controller/:id[/:action[/:format]]").unwrap();
        assert_eq!(
            parts,
            vec![
                PathPart::parameter("controller"),
                PathPart::literal("/"),
                PathPart::parameter("id"),
                PathPart::Optional(vec![
                    PathPart::literal("/"),
                    PathPart::parameter("action"),
                    PathPart::Optional(vec![PathPart::literal("/"), PathPart::parameter("format")]),
                ]),
            ]
        );
        assert_eq!(render_pattern(&parts), ":controller/:id[/:action[/:format]]");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_pattern("item-set[/:id"),
            Err(PatternError::UnbalancedBrackets(_))
        ));
        assert!(matches!(
            parse_pattern("item-set]"),
            Err(PatternError::UnbalancedBrackets(_))
        ));
        assert!(matches!(
            parse_pattern("page/:"),
            Err(PatternError::EmptyParameter(_))
        ));
    }

    #[test]
    fn test_has_parameter() {
        let parts = parse_pattern("foo[/:controller]").unwrap();
        assert!(has_parameter(&parts, "controller"));
        assert!(!has_parameter(&parts, "id"));
    }

    #[test]
    fn test_optional_group_prefers_longest() {
        let pattern = CompiledPattern::segment("item-set[/:item-set-id]").unwrap();
        let none = Constraints::new();

        let matches = pattern.match_prefix("item-set/7", 0, &none);
        assert_eq!(matches[0].0, "item-set/7".len());
        assert_eq!(matches[0].1.get("item-set-id").map(String::as_str), Some("7"));

        let matches = pattern.match_prefix("item-set", 0, &none);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "item-set".len());
    }

    #[test]
    fn test_parameter_constraints_applied() {
        let pattern = CompiledPattern::segment(":controller/:id").unwrap();
        let rules = constraints(&[
            ("controller", Constraint::Identifier { min_len: 3 }),
            ("id", Constraint::Digits),
        ]);

        let matches = pattern.match_prefix("/item/5", 1, &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].1.get("controller").map(String::as_str), Some("item"));
        assert_eq!(matches[0].1.get("id").map(String::as_str), Some("5"));

        // The site indicator is too short to be a controller
        assert!(pattern.match_prefix("/s/5", 1, &rules).is_empty());
        assert!(pattern.match_prefix("/item/abc", 1, &rules).is_empty());
    }

    #[test]
    fn test_literal_pattern_is_not_parsed() {
        let pattern = CompiledPattern::literal("s/my-site");
        let matches = pattern.match_prefix("/s/my-site/extra", 1, &Constraints::new());
        assert_eq!(matches, vec![("/s/my-site".len(), Params::new())]);
    }
}
