//! Router error taxonomy.
//!
//! # Responsibilities
//! - Distinguish caller-input errors from dispatch outcomes
//! - Carry enough context for an HTTP adapter to map outcomes to status codes
//!
//! # Design Decisions
//! - Not-found and method-not-allowed are expected control flow, surfaced as
//!   distinguishable variants rather than internal faults
//! - No retry or recovery inside the router; every failure propagates to the
//!   immediate caller

use http::Method;
use thiserror::Error;

/// Errors surfaced by the router.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// No registered pattern structurally matches the request path.
    #[error("no route matches the request path")]
    NotFound,

    /// At least one pattern matches the path, but none of the matching routes
    /// accepts the request method.
    #[error("request method not supported; following request methods are allowed: {}", join_methods(.allowed))]
    MethodNotAllowed {
        /// Union of methods accepted by every structurally matching route,
        /// deduplicated. Suitable for an `Allow` header.
        allowed: Vec<Method>,
    },

    /// Malformed registration or URL-building argument.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A route pattern failed to compile.
    #[error("syntax error in pattern {pattern:?} at byte {position}: {reason}")]
    PatternSyntax {
        pattern: String,
        position: usize,
        reason: String,
    },
}

impl RouterError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        RouterError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let err = RouterError::MethodNotAllowed {
            allowed: vec![Method::GET, Method::POST],
        };
        assert_eq!(
            err.to_string(),
            "request method not supported; following request methods are allowed: GET, POST"
        );
    }

    #[test]
    fn test_pattern_syntax_reports_position() {
        let err = RouterError::PatternSyntax {
            pattern: "/users/{".to_string(),
            position: 7,
            reason: "unmatched '{'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("byte 7"));
        assert!(msg.contains("/users/{"));
    }
}
