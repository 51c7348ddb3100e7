//! Pattern compilation.
//!
//! # Responsibilities
//! - Parse a textual route pattern into literal runs and named placeholders
//! - Enumerate the concrete alternatives produced by optional trailing sections
//! - Compile placeholder constraints once, anchored to a whole path segment
//!
//! # Design Decisions
//! - Placeholders span whole path segments; a placeholder glued to literal
//!   text inside one segment is a syntax error
//! - Optional sections (`[...]`) may nest but only occur at the end of a
//!   pattern; each nesting level adds one alternative, shortest first
//! - Parsing is fallible and eager about diagnostics: every error carries the
//!   offending pattern and a byte position

use std::collections::HashSet;
use std::iter::Peekable;
use std::str::CharIndices;

use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// A segment-anchored constraint attached to a placeholder.
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    regex: Regex,
}

impl Constraint {
    /// The constraint text as written in the pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a captured path segment satisfies the constraint.
    pub fn is_match(&self, segment: &str) -> bool {
        self.regex.is_match(segment)
    }
}

/// A named placeholder capturing one path segment.
#[derive(Debug, Clone)]
pub struct Placeholder {
    name: String,
    constraint: Option<Constraint>,
    offset: usize,
}

impl Placeholder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }
}

/// One piece of a concrete pattern alternative.
#[derive(Debug, Clone)]
pub enum Token {
    /// Raw literal text, slashes included.
    Literal(String),
    /// A placeholder capturing one path segment.
    Param(Placeholder),
}

/// One concrete expansion of a pattern with a fixed placeholder set.
#[derive(Debug, Clone)]
pub struct Alternative {
    tokens: Vec<Token>,
    param_count: usize,
}

impl Alternative {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of placeholders this alternative must have bound to succeed.
    pub fn param_count(&self) -> usize {
        self.param_count
    }
}

/// A compiled pattern: its alternatives ordered shortest first.
///
/// Parsing happens once per distinct pattern string; the router caches the
/// result and shares it between the matcher and the URL builder.
#[derive(Debug, Clone)]
pub struct ParsedPattern {
    pattern: String,
    alternatives: Vec<Alternative>,
}

impl ParsedPattern {
    /// Parse a pattern string into its alternatives.
    ///
    /// Grammar: literal runs, `{name}` / `{name:constraint}` placeholders and
    /// nested trailing optional sections in square brackets, e.g.
    /// `/archive[/{year:\d{4}}[/{month}]]`.
    pub fn parse(pattern: &str) -> RouterResult<ParsedPattern> {
        let mut parser = Parser::new(pattern);
        let parts = parser.parse_sequence(None)?;

        let mut alternatives = Vec::new();
        for tokens in expand(&parts) {
            validate_alignment(pattern, &tokens)?;
            let param_count = tokens
                .iter()
                .filter(|t| matches!(t, Token::Param(_)))
                .count();
            alternatives.push(Alternative {
                tokens,
                param_count,
            });
        }

        tracing::trace!(
            pattern = %pattern,
            alternatives = alternatives.len(),
            "compiled pattern"
        );

        Ok(ParsedPattern {
            pattern: pattern.to_string(),
            alternatives,
        })
    }

    /// The original pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Concrete alternatives, shortest (all optionals dropped) first.
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }
}

/// Intermediate parse tree before optional sections are expanded.
enum Part {
    Literal(String),
    Param(Placeholder),
    Optional(Vec<Part>),
}

struct Parser<'a> {
    pattern: &'a str,
    chars: Peekable<CharIndices<'a>>,
    seen: HashSet<String>,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            chars: pattern.char_indices().peekable(),
            seen: HashSet::new(),
        }
    }

    fn err(&self, position: usize, reason: impl Into<String>) -> RouterError {
        RouterError::PatternSyntax {
            pattern: self.pattern.to_string(),
            position,
            reason: reason.into(),
        }
    }

    /// Parse a part sequence; `enclosing` holds the byte offset of the `[`
    /// that opened this sequence, or `None` at the top level.
    fn parse_sequence(&mut self, enclosing: Option<usize>) -> RouterResult<Vec<Part>> {
        let mut parts: Vec<Part> = Vec::new();
        let mut literal = String::new();

        loop {
            let Some(&(i, c)) = self.chars.peek() else {
                if let Some(open) = enclosing {
                    return Err(self.err(open, "unmatched '['"));
                }
                flush_literal(&mut parts, &mut literal);
                return Ok(parts);
            };

            match c {
                '{' => {
                    self.reject_after_optional(&parts, i)?;
                    flush_literal(&mut parts, &mut literal);
                    self.chars.next();
                    let placeholder = self.parse_placeholder(i)?;
                    parts.push(Part::Param(placeholder));
                }
                '[' => {
                    self.reject_after_optional(&parts, i)?;
                    flush_literal(&mut parts, &mut literal);
                    self.chars.next();
                    let inner = self.parse_sequence(Some(i))?;
                    if inner.is_empty() {
                        return Err(self.err(i, "empty optional section"));
                    }
                    parts.push(Part::Optional(inner));
                }
                ']' => {
                    if enclosing.is_none() {
                        return Err(self.err(i, "unexpected ']'"));
                    }
                    self.chars.next();
                    flush_literal(&mut parts, &mut literal);
                    return Ok(parts);
                }
                '}' => return Err(self.err(i, "unexpected '}'")),
                _ => {
                    self.reject_after_optional(&parts, i)?;
                    literal.push(c);
                    self.chars.next();
                }
            }
        }
    }

    fn reject_after_optional(&self, parts: &[Part], position: usize) -> RouterResult<()> {
        if matches!(parts.last(), Some(Part::Optional(_))) {
            return Err(self.err(
                position,
                "optional sections may only occur at the end of the pattern",
            ));
        }
        Ok(())
    }

    /// Parse `name[:constraint]}`; the opening `{` at `open` is consumed.
    fn parse_placeholder(&mut self, open: usize) -> RouterResult<Placeholder> {
        let mut name = String::new();
        let mut raw_constraint: Option<(usize, String)> = None;

        loop {
            match self.chars.peek().copied() {
                None => return Err(self.err(open, "unmatched '{'")),
                Some((_, '}')) => {
                    self.chars.next();
                    break;
                }
                Some((i, ':')) => {
                    self.chars.next();
                    raw_constraint = Some((i + 1, self.scan_constraint(open)?));
                    break;
                }
                Some((_, ch)) => {
                    name.push(ch);
                    self.chars.next();
                }
            }
        }

        if name.is_empty() {
            return Err(self.err(open, "empty placeholder name"));
        }
        if !is_identifier(&name) {
            return Err(self.err(open, format!("invalid placeholder name {name:?}")));
        }
        if !self.seen.insert(name.clone()) {
            return Err(self.err(open, format!("duplicate placeholder {name:?}")));
        }

        let constraint = match raw_constraint {
            None => None,
            Some((at, raw)) => {
                if raw.is_empty() {
                    return Err(self.err(at, "empty constraint"));
                }
                let regex = Regex::new(&format!("^(?:{raw})$"))
                    .map_err(|e| self.err(at, format!("invalid constraint regex: {e}")))?;
                Some(Constraint { raw, regex })
            }
        };

        Ok(Placeholder {
            name,
            constraint,
            offset: open,
        })
    }

    /// Scan constraint text up to the `}` closing the placeholder, allowing
    /// balanced braces inside (repetition counts such as `\d{4}`).
    fn scan_constraint(&mut self, open: usize) -> RouterResult<String> {
        let mut depth = 0usize;
        let mut raw = String::new();

        loop {
            match self.chars.next() {
                None => return Err(self.err(open, "unmatched '{'")),
                Some((_, '{')) => {
                    depth += 1;
                    raw.push('{');
                }
                Some((_, '}')) => {
                    if depth == 0 {
                        return Ok(raw);
                    }
                    depth -= 1;
                    raw.push('}');
                }
                Some((_, ch)) => raw.push(ch),
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn flush_literal(parts: &mut Vec<Part>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(Part::Literal(std::mem::take(literal)));
    }
}

/// Expand trailing optional sections into flat alternatives, shortest first.
fn expand(parts: &[Part]) -> Vec<Vec<Token>> {
    let mut base: Vec<Token> = Vec::new();

    for part in parts {
        match part {
            Part::Literal(text) => push_literal(&mut base, text),
            Part::Param(placeholder) => base.push(Token::Param(placeholder.clone())),
            Part::Optional(inner) => {
                // The parser guarantees an optional is the last part.
                let mut out = vec![base.clone()];
                for tail in expand(inner) {
                    let mut alt = base.clone();
                    for token in tail {
                        match token {
                            Token::Literal(text) => push_literal(&mut alt, &text),
                            param => alt.push(param),
                        }
                    }
                    out.push(alt);
                }
                return out;
            }
        }
    }

    vec![base]
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

/// Every placeholder must sit between segment boundaries once literals are
/// merged: preceded by start-of-pattern or a literal ending in `/`, followed
/// by end-of-pattern or a literal starting with `/`.
fn validate_alignment(pattern: &str, tokens: &[Token]) -> RouterResult<()> {
    for (i, token) in tokens.iter().enumerate() {
        let Token::Param(placeholder) = token else {
            continue;
        };
        let before_ok = match i.checked_sub(1).map(|j| &tokens[j]) {
            None => true,
            Some(Token::Literal(text)) => text.ends_with('/'),
            Some(Token::Param(_)) => false,
        };
        let after_ok = match tokens.get(i + 1) {
            None => true,
            Some(Token::Literal(text)) => text.starts_with('/'),
            Some(Token::Param(_)) => false,
        };
        if !before_ok || !after_ok {
            return Err(RouterError::PatternSyntax {
                pattern: pattern.to_string(),
                position: placeholder.offset,
                reason: format!(
                    "placeholder {:?} must span a whole path segment",
                    placeholder.name
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str) -> ParsedPattern {
        ParsedPattern::parse(pattern).unwrap()
    }

    fn literals(alt: &Alternative) -> String {
        alt.tokens()
            .iter()
            .map(|t| match t {
                Token::Literal(text) => text.clone(),
                Token::Param(p) => format!("<{}>", p.name()),
            })
            .collect()
    }

    #[test]
    fn test_parse_literal_pattern() {
        let parsed = parse("/users/all");
        assert_eq!(parsed.alternatives().len(), 1);
        assert_eq!(parsed.alternatives()[0].param_count(), 0);
        assert_eq!(literals(&parsed.alternatives()[0]), "/users/all");
    }

    #[test]
    fn test_parse_placeholder() {
        let parsed = parse("/users/{id}");
        let alt = &parsed.alternatives()[0];
        assert_eq!(alt.param_count(), 1);
        assert_eq!(literals(alt), "/users/<id>");
    }

    #[test]
    fn test_parse_constraint() {
        let parsed = parse(r"/posts/{id:\d+}");
        let alt = &parsed.alternatives()[0];
        let Token::Param(p) = &alt.tokens()[1] else {
            panic!("expected placeholder");
        };
        let constraint = p.constraint().unwrap();
        assert_eq!(constraint.as_str(), r"\d+");
        assert!(constraint.is_match("42"));
        assert!(!constraint.is_match("42x"));
    }

    #[test]
    fn test_constraint_with_repetition_braces() {
        let parsed = parse(r"/archive/{year:\d{4}}");
        let Token::Param(p) = &parsed.alternatives()[0].tokens()[1] else {
            panic!("expected placeholder");
        };
        assert!(p.constraint().unwrap().is_match("2026"));
        assert!(!p.constraint().unwrap().is_match("26"));
    }

    #[test]
    fn test_optional_sections_expand_shortest_first() {
        let parsed = parse(r"/archive[/{year}[/{month}]]");
        let alts = parsed.alternatives();
        assert_eq!(alts.len(), 3);
        assert_eq!(literals(&alts[0]), "/archive");
        assert_eq!(literals(&alts[1]), "/archive/<year>");
        assert_eq!(literals(&alts[2]), "/archive/<year>/<month>");
        assert_eq!(alts[2].param_count(), 2);
    }

    #[test]
    fn test_optional_literal_section() {
        let parsed = parse("/feed[.json]");
        let alts = parsed.alternatives();
        assert_eq!(alts.len(), 2);
        assert_eq!(literals(&alts[0]), "/feed");
        assert_eq!(literals(&alts[1]), "/feed.json");
    }

    #[test]
    fn test_unmatched_brace_is_error() {
        let err = ParsedPattern::parse("/users/{id").unwrap_err();
        let RouterError::PatternSyntax { position, reason, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(position, 7);
        assert!(reason.contains("unmatched '{'"));
    }

    #[test]
    fn test_empty_placeholder_name_is_error() {
        assert!(ParsedPattern::parse("/users/{}").is_err());
    }

    #[test]
    fn test_invalid_placeholder_name_is_error() {
        assert!(ParsedPattern::parse("/users/{1d}").is_err());
    }

    #[test]
    fn test_duplicate_placeholder_is_error() {
        assert!(ParsedPattern::parse("/{id}/x/{id}").is_err());
    }

    #[test]
    fn test_non_trailing_optional_is_error() {
        let err = ParsedPattern::parse("/a[/b]/c").unwrap_err();
        let RouterError::PatternSyntax { reason, .. } = err else {
            panic!("expected syntax error");
        };
        assert!(reason.contains("end of the pattern"));
    }

    #[test]
    fn test_stray_close_bracket_is_error() {
        assert!(ParsedPattern::parse("/a]/b").is_err());
    }

    #[test]
    fn test_empty_optional_is_error() {
        assert!(ParsedPattern::parse("/a[]").is_err());
    }

    #[test]
    fn test_invalid_constraint_regex_is_error() {
        let err = ParsedPattern::parse("/a/{id:[}").unwrap_err();
        let RouterError::PatternSyntax { reason, .. } = err else {
            panic!("expected syntax error");
        };
        assert!(reason.contains("invalid constraint regex"));
    }

    #[test]
    fn test_mid_segment_placeholder_is_error() {
        let err = ParsedPattern::parse("/file-{name}.txt").unwrap_err();
        let RouterError::PatternSyntax { reason, .. } = err else {
            panic!("expected syntax error");
        };
        assert!(reason.contains("whole path segment"));
    }

    #[test]
    fn test_adjacent_placeholders_are_error() {
        assert!(ParsedPattern::parse("/{a}{b}").is_err());
    }
}
