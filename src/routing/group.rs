//! Route groups.
//!
//! # Responsibilities
//! - Hold the prefix/middleware tree that routes are registered under
//! - Resolve a group's effective pattern (root-to-node prefix concatenation)
//!
//! # Design Decisions
//! - Groups live in an arena owned by the router; parents are stable indices,
//!   so the tree has no ownership cycles and is trivially shareable once built
//! - A group's effective pattern is computed when the group is created;
//!   mutating a parent's pattern later does not ripple into existing children
//!   or into routes already registered beneath it
//! - No pattern validation here: patterns are compiled lazily, when matched
//!   or URL-built

/// Stable handle to a group in the router's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// A node in the prefix/middleware tree.
#[derive(Debug, Clone)]
pub struct Group<H> {
    pattern: String,
    handlers: Vec<H>,
    parent: Option<GroupId>,
    routes: Vec<String>,
}

impl<H> Group<H> {
    /// Effective pattern prefix, concatenated from the root to this node.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
    }

    /// Middleware attached to the group itself; applies to every route
    /// nested under it.
    pub fn handlers(&self) -> &[H] {
        &self.handlers
    }

    pub fn set_handlers(&mut self, handlers: Vec<H>) {
        self.handlers = handlers;
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Ids of routes registered directly under this group (not transitively).
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    /// Record a route id under this group. Re-adding an id is a no-op:
    /// last write wins in the registry, the original position is kept here.
    pub(crate) fn add_route(&mut self, id: &str) {
        if !self.routes.iter().any(|r| r == id) {
            self.routes.push(id.to_string());
        }
    }
}

/// Arena holding every group of one router; the root group sits at index 0
/// with an empty prefix and no parent.
#[derive(Debug, Clone)]
pub struct GroupTree<H> {
    nodes: Vec<Group<H>>,
}

impl<H> GroupTree<H> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Group {
                pattern: String::new(),
                handlers: Vec::new(),
                parent: None,
                routes: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    /// Create a child group. Its effective pattern is the parent's effective
    /// pattern with `prefix` appended, fixed at this moment.
    pub fn push(&mut self, parent: GroupId, prefix: &str, handlers: Vec<H>) -> GroupId {
        let pattern = format!("{}{}", self.get(parent).pattern, prefix);
        self.nodes.push(Group {
            pattern,
            handlers,
            parent: Some(parent),
            routes: Vec::new(),
        });
        GroupId(self.nodes.len() - 1)
    }

    /// Ids are only minted by this arena, so lookups are infallible.
    pub fn get(&self, id: GroupId) -> &Group<H> {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: GroupId) -> &mut Group<H> {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<H> Default for GroupTree<H> {
    fn default() -> Self {
        Self::new()
    }
}
