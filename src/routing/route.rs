//! Route data model and handler-chain resolution.
//!
//! # Responsibilities
//! - Hold one registration: id, method set, full pattern, handlers
//! - Resolve the effective handler chain by walking the group ancestry
//!
//! # Design Decisions
//! - The full pattern (group prefix + local pattern) is frozen at
//!   construction; re-parenting a route is not supported, which keeps the
//!   pattern/group relationship unambiguous
//! - Handlers are uniformly an ordered list; a single handler is a
//!   one-element list, so there is no one-vs-many branch anywhere
//! - The chain contract: outermost group first, inner groups in root-to-leaf
//!   order, the route's own handlers last

use http::Method;

use crate::routing::group::{GroupId, GroupTree};

/// One registered route: method set, full pattern, handler chain tail.
#[derive(Debug, Clone)]
pub struct Route<H> {
    id: String,
    group: GroupId,
    methods: Vec<Method>,
    pattern: String,
    handlers: Vec<H>,
}

impl<H> Route<H> {
    /// Build a route with its full, already-prefixed pattern.
    ///
    /// [`Router::route`](crate::Router::route) is the usual entry point; it
    /// concatenates the current group's effective prefix onto the local
    /// pattern before calling this.
    pub fn new(
        id: impl Into<String>,
        group: GroupId,
        methods: Vec<Method>,
        pattern: impl Into<String>,
        handlers: Vec<H>,
    ) -> Self {
        Self {
            id: id.into(),
            group,
            methods,
            pattern: pattern.into(),
            handlers,
        }
    }

    /// Unique id, fixed at construction.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The group this route was registered under.
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn set_methods(&mut self, methods: Vec<Method>) {
        self.methods = methods;
    }

    /// Full pattern: owning group's effective prefix plus the local pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
    }

    /// The route's own handlers, excluding group middleware.
    pub fn handlers(&self) -> &[H] {
        &self.handlers
    }

    pub fn set_handlers(&mut self, handlers: Vec<H>) {
        self.handlers = handlers;
    }

    /// Resolve the full effective handler chain.
    ///
    /// Walks the ownership chain leaf-to-root collecting group handlers,
    /// reverses to root-to-leaf order, then appends the route's own handlers.
    /// Groups without handlers contribute nothing. The result is stable
    /// across calls as long as the route and its groups are unmodified.
    pub fn handler_chain<'a>(&'a self, groups: &'a GroupTree<H>) -> Vec<&'a H> {
        let mut lineage = Vec::new();
        let mut cursor = Some(self.group);
        while let Some(id) = cursor {
            lineage.push(id);
            cursor = groups.get(id).parent();
        }

        let mut chain: Vec<&H> = Vec::new();
        for id in lineage.into_iter().rev() {
            chain.extend(groups.get(id).handlers());
        }
        chain.extend(self.handlers.iter());
        chain
    }
}

/// Registration pattern argument: a bare pattern or a named `(id, pattern)`
/// pair, replacing the original string-or-map convention.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub(crate) id: Option<String>,
    pub(crate) pattern: String,
}

impl From<&str> for RouteSpec {
    fn from(pattern: &str) -> Self {
        Self {
            id: None,
            pattern: pattern.to_string(),
        }
    }
}

impl From<String> for RouteSpec {
    fn from(pattern: String) -> Self {
        Self { id: None, pattern }
    }
}

impl From<(&str, &str)> for RouteSpec {
    fn from((id, pattern): (&str, &str)) -> Self {
        Self {
            id: Some(id.to_string()),
            pattern: pattern.to_string(),
        }
    }
}

impl From<(String, String)> for RouteSpec {
    fn from((id, pattern): (String, String)) -> Self {
        Self {
            id: Some(id),
            pattern,
        }
    }
}

/// Adapter accepting a single handler, an optional handler or a handler list
/// wherever the registration API takes middleware.
pub trait IntoHandlers<H> {
    fn into_handlers(self) -> Vec<H>;
}

impl<H> IntoHandlers<H> for H {
    fn into_handlers(self) -> Vec<H> {
        vec![self]
    }
}

impl<H> IntoHandlers<H> for Vec<H> {
    fn into_handlers(self) -> Vec<H> {
        self
    }
}

impl<H> IntoHandlers<H> for Option<H> {
    fn into_handlers(self) -> Vec<H> {
        self.into_iter().collect()
    }
}
