//! Structural route matching.
//!
//! # Responsibilities
//! - Compile the full route registry into one dispatch table
//! - Answer which route, if any, matches a (method, path) pair
//! - Distinguish "no pattern matches the path" from "a pattern matches the
//!   path but not the method"
//!
//! # Design Decisions
//! - Matching is segment-by-segment, built by hand: a placeholder consumes
//!   exactly one path segment, checked against its constraint when present
//! - Paths are compared slash-for-slash: a trailing or doubled slash makes a
//!   different path, and an unconstrained placeholder never captures an
//!   empty segment
//! - Structural matching runs first, the method partition second, so the
//!   method-not-allowed answer can carry the union of acceptable methods
//! - Deterministic tie-break: routes are tried in registration order and the
//!   first structural match accepting the method wins
//! - Routes with an empty method set are excluded from the table entirely

use std::sync::Arc;

use http::Method;

use crate::routing::pattern::{Constraint, ParsedPattern, Token};

/// Outcome of a dispatch query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A route matched structurally and accepts the request method.
    Found {
        /// Registry index of the winning route.
        route: usize,
        /// Placeholder name to captured segment value, in pattern order.
        params: Vec<(String, String)>,
    },
    /// At least one route matched structurally, none accepts the method.
    MethodNotAllowed {
        /// Deduplicated union of methods over all structural matches.
        allowed: Vec<Method>,
    },
    /// No route matched the path at all.
    NotFound,
}

/// One route offered to the matcher at build time.
pub struct RouteEntry {
    /// Registry index reported back on a match.
    pub index: usize,
    /// Methods the route accepts.
    pub methods: Vec<Method>,
    /// Compiled full pattern, base path included.
    pub pattern: Arc<ParsedPattern>,
}

/// A path segment matcher derived from one pattern alternative.
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        constraint: Option<Constraint>,
    },
}

struct CompiledEntry {
    index: usize,
    methods: Vec<Method>,
    alternatives: Vec<Vec<Segment>>,
}

/// Immutable dispatch table over the whole registry.
///
/// Built once after the registry settles and shared by concurrent readers;
/// the router drops and rebuilds it when the registry changes.
pub struct Matcher {
    entries: Vec<CompiledEntry>,
}

impl Matcher {
    /// Compile the given routes, preserving their registration order.
    pub fn build(routes: Vec<RouteEntry>) -> Matcher {
        let mut entries = Vec::with_capacity(routes.len());
        for route in routes {
            // A route with no methods is never matchable; keeping it out of
            // the table also keeps it out of the allowed-methods union.
            if route.methods.is_empty() {
                continue;
            }
            let alternatives = route
                .pattern
                .alternatives()
                .iter()
                .map(|alt| compile_segments(alt.tokens()))
                .collect();
            entries.push(CompiledEntry {
                index: route.index,
                methods: route.methods,
                alternatives,
            });
        }
        Matcher { entries }
    }

    /// Number of matchable routes in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a (method, path) pair against the table.
    pub fn lookup(&self, method: &Method, path: &str) -> MatchOutcome {
        let segments: Vec<&str> = path.split('/').collect();

        let mut structural = false;
        let mut allowed: Vec<Method> = Vec::new();

        for entry in &self.entries {
            let Some(params) = entry.match_path(&segments) else {
                continue;
            };
            structural = true;
            if entry.methods.contains(method) {
                return MatchOutcome::Found {
                    route: entry.index,
                    params,
                };
            }
            for m in &entry.methods {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if structural {
            MatchOutcome::MethodNotAllowed { allowed }
        } else {
            MatchOutcome::NotFound
        }
    }
}

impl CompiledEntry {
    fn match_path(&self, path: &[&str]) -> Option<Vec<(String, String)>> {
        self.alternatives
            .iter()
            .find_map(|alt| match_alternative(alt, path))
    }
}

fn match_alternative(segments: &[Segment], path: &[&str]) -> Option<Vec<(String, String)>> {
    if segments.len() != path.len() {
        return None;
    }

    let mut params = Vec::new();
    for (segment, part) in segments.iter().zip(path) {
        match segment {
            Segment::Literal(text) => {
                if text != part {
                    return None;
                }
            }
            Segment::Param { name, constraint } => {
                let accepted = match constraint {
                    Some(constraint) => constraint.is_match(part),
                    None => !part.is_empty(),
                };
                if !accepted {
                    return None;
                }
                params.push((name.clone(), (*part).to_string()));
            }
        }
    }
    Some(params)
}

/// Split an alternative's tokens into per-segment matchers. The segmentation
/// mirrors splitting the rendered pattern on `/` with empty segments kept,
/// so slash placement in the pattern is significant.
fn compile_segments(tokens: &[Token]) -> Vec<Segment> {
    let mut segments = Vec::new();
    // The literal run being accumulated; None right after a placeholder,
    // which already owns the current segment.
    let mut literal: Option<String> = Some(String::new());
    for token in tokens {
        match token {
            Token::Literal(text) => {
                for ch in text.chars() {
                    if ch == '/' {
                        if let Some(done) = literal.take() {
                            segments.push(Segment::Literal(done));
                        }
                        literal = Some(String::new());
                    } else {
                        literal.get_or_insert_with(String::new).push(ch);
                    }
                }
            }
            Token::Param(placeholder) => {
                // The pattern compiler keeps placeholders on segment
                // boundaries, so at most an empty run is open here.
                literal = None;
                segments.push(Segment::Param {
                    name: placeholder.name().to_string(),
                    constraint: placeholder.constraint().cloned(),
                });
            }
        }
    }
    if let Some(done) = literal {
        segments.push(Segment::Literal(done));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, methods: Vec<Method>, pattern: &str) -> RouteEntry {
        RouteEntry {
            index,
            methods,
            pattern: Arc::new(ParsedPattern::parse(pattern).unwrap()),
        }
    }

    fn matcher(entries: Vec<RouteEntry>) -> Matcher {
        Matcher::build(entries)
    }

    #[test]
    fn test_literal_match() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/widgets")]);
        assert_eq!(
            m.lookup(&Method::GET, "/widgets"),
            MatchOutcome::Found {
                route: 0,
                params: vec![]
            }
        );
    }

    #[test]
    fn test_placeholder_captures_segment() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/users/{id}")]);
        assert_eq!(
            m.lookup(&Method::GET, "/users/42"),
            MatchOutcome::Found {
                route: 0,
                params: vec![("id".to_string(), "42".to_string())]
            }
        );
    }

    #[test]
    fn test_not_found() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/widgets")]);
        assert_eq!(m.lookup(&Method::GET, "/gadgets"), MatchOutcome::NotFound);
    }

    #[test]
    fn test_method_not_allowed_unions_methods() {
        let m = matcher(vec![
            entry(0, vec![Method::GET], "/widgets"),
            entry(1, vec![Method::POST, Method::GET], "/widgets"),
        ]);
        assert_eq!(
            m.lookup(&Method::DELETE, "/widgets"),
            MatchOutcome::MethodNotAllowed {
                allowed: vec![Method::GET, Method::POST]
            }
        );
    }

    #[test]
    fn test_constraint_rejects_structurally() {
        let m = matcher(vec![entry(0, vec![Method::GET], r"/posts/{id:\d+}")]);
        assert_eq!(m.lookup(&Method::GET, "/posts/abc"), MatchOutcome::NotFound);
        assert_eq!(
            m.lookup(&Method::GET, "/posts/7"),
            MatchOutcome::Found {
                route: 0,
                params: vec![("id".to_string(), "7".to_string())]
            }
        );
    }

    #[test]
    fn test_registration_order_tie_break() {
        let m = matcher(vec![
            entry(0, vec![Method::GET], "/users/{name}"),
            entry(1, vec![Method::GET], "/users/{id}"),
        ]);
        let MatchOutcome::Found { route, .. } = m.lookup(&Method::GET, "/users/alice") else {
            panic!("expected a match");
        };
        assert_eq!(route, 0);
    }

    #[test]
    fn test_earlier_route_without_method_does_not_shadow() {
        let m = matcher(vec![
            entry(0, vec![Method::POST], "/widgets"),
            entry(1, vec![Method::GET], "/widgets"),
        ]);
        assert_eq!(
            m.lookup(&Method::GET, "/widgets"),
            MatchOutcome::Found {
                route: 1,
                params: vec![]
            }
        );
    }

    #[test]
    fn test_optional_alternatives_match() {
        let m = matcher(vec![entry(
            0,
            vec![Method::GET],
            "/archive[/{year}[/{month}]]",
        )]);
        assert_eq!(
            m.lookup(&Method::GET, "/archive"),
            MatchOutcome::Found {
                route: 0,
                params: vec![]
            }
        );
        assert_eq!(
            m.lookup(&Method::GET, "/archive/2026/08"),
            MatchOutcome::Found {
                route: 0,
                params: vec![
                    ("year".to_string(), "2026".to_string()),
                    ("month".to_string(), "08".to_string())
                ]
            }
        );
        assert_eq!(
            m.lookup(&Method::GET, "/archive/2026/08/27"),
            MatchOutcome::NotFound
        );
    }

    #[test]
    fn test_empty_method_set_is_unmatchable() {
        let m = matcher(vec![entry(0, vec![], "/hidden")]);
        assert_eq!(m.lookup(&Method::GET, "/hidden"), MatchOutcome::NotFound);
    }

    #[test]
    fn test_trailing_slash_is_not_found() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/widgets")]);
        assert_eq!(m.lookup(&Method::GET, "/widgets/"), MatchOutcome::NotFound);
    }

    #[test]
    fn test_doubled_slash_is_not_found() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/a/b")]);
        assert_eq!(m.lookup(&Method::GET, "/a//b"), MatchOutcome::NotFound);
    }

    #[test]
    fn test_placeholder_rejects_empty_segment() {
        let m = matcher(vec![entry(0, vec![Method::GET], "/users/{id}")]);
        assert_eq!(m.lookup(&Method::GET, "/users/"), MatchOutcome::NotFound);
    }
}
