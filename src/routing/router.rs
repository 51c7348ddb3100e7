//! Router orchestration.
//!
//! # Responsibilities
//! - Own the group tree, the flat route registry and the current-group cursor
//! - Registration API: `route`, per-method shorthands, `mount`/`mount_under`
//! - Dispatch requests through the compiled matcher
//! - Reverse patterns back into concrete URLs
//!
//! # Design Decisions
//! - Registration takes `&mut self`; dispatch and URL building take `&self`
//!   and are safe under concurrent readers once registration is done
//! - The compiled dispatch table lives in an `ArcSwapOption`: every registry
//!   mutation drops it, the next dispatch rebuilds it idempotently
//! - Parsed patterns are cached in a `DashMap` shared by the matcher and the
//!   URL builder; parsing is on the hot path of every URL build
//! - Auto-generated route ids come from a counter owned by this router, not
//!   from process-wide state

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use http::{Method, Request};

use crate::error::{RouterError, RouterResult};
use crate::routing::group::{Group, GroupId, GroupTree};
use crate::routing::matcher::{MatchOutcome, Matcher, RouteEntry};
use crate::routing::params::PathParams;
use crate::routing::pattern::{ParsedPattern, Token};
use crate::routing::route::{IntoHandlers, Route, RouteSpec};

/// Default method set for [`Router::route`] registrations without an
/// explicit method list.
pub const ALL_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// HTTP request router: registration, dispatch and URL generation.
///
/// `H` is the opaque handler unit; the router orders handlers but never
/// invokes them.
pub struct Router<H> {
    groups: GroupTree<H>,
    current: GroupId,
    routes: Vec<Route<H>>,
    ids: HashMap<String, usize>,
    base_path: String,
    next_auto_id: u64,
    table: ArcSwapOption<Matcher>,
    patterns: DashMap<String, Arc<ParsedPattern>>,
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::with_base_path("")
    }

    /// Create a router whose dispatch expects every path to start with
    /// `base_path` (right-trimmed of trailing slashes).
    pub fn with_base_path(base_path: &str) -> Self {
        let groups = GroupTree::new();
        let current = groups.root();
        Self {
            groups,
            current,
            routes: Vec::new(),
            ids: HashMap::new(),
            base_path: base_path.trim_end_matches('/').to_string(),
            next_auto_id: 0,
            table: ArcSwapOption::empty(),
            patterns: DashMap::new(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Set the base path; trailing slashes are trimmed. Affects dispatch
    /// only, never generated URLs.
    pub fn set_base_path(&mut self, path: &str) {
        self.base_path = path.trim_end_matches('/').to_string();
        self.invalidate();
    }

    /// The group new registrations currently land under.
    pub fn current_group(&self) -> GroupId {
        self.current
    }

    pub fn set_current_group(&mut self, group: GroupId) {
        self.current = group;
    }

    pub fn group(&self, id: GroupId) -> &Group<H> {
        self.groups.get(id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group<H> {
        self.groups.get_mut(id)
    }

    pub fn groups(&self) -> &GroupTree<H> {
        &self.groups
    }

    /// Look up a route by id.
    pub fn get_route(&self, id: &str) -> Option<&Route<H>> {
        self.ids.get(id).map(|&i| &self.routes[i])
    }

    /// Mutable route access; conservatively drops the dispatch table since
    /// pattern or method edits would stale it.
    pub fn get_route_mut(&mut self, id: &str) -> Option<&mut Route<H>> {
        self.invalidate();
        self.ids.get(id).map(|&i| &mut self.routes[i])
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
        self.routes.iter()
    }

    /// Register a pre-built route under its group and the flat registry.
    ///
    /// Re-registering an existing id replaces the previous route in place:
    /// last write wins, no error, original registration position kept.
    pub fn add_route(&mut self, route: Route<H>) -> &mut Self {
        self.groups.get_mut(route.group()).add_route(route.id());
        match self.ids.get(route.id()) {
            Some(&i) => self.routes[i] = route,
            None => {
                self.ids.insert(route.id().to_string(), self.routes.len());
                self.routes.push(route);
            }
        }
        self.invalidate();
        self
    }

    /// Register a route under the current group.
    ///
    /// `spec` is a pattern (`"/users/{id}"`) or a named pattern
    /// (`("profile", "/users/{id}")`). The full pattern is the current
    /// group's effective prefix plus the local pattern, fixed now.
    pub fn route(
        &mut self,
        spec: impl Into<RouteSpec>,
        handlers: impl IntoHandlers<H>,
        methods: &[Method],
    ) -> &mut Self {
        let spec = spec.into();
        let id = match spec.id {
            Some(id) => id,
            None => {
                let id = format!("route{}", self.next_auto_id);
                self.next_auto_id += 1;
                id
            }
        };
        let pattern = format!("{}{}", self.groups.get(self.current).pattern(), spec.pattern);
        tracing::debug!(id = %id, pattern = %pattern, "registering route");
        let route = Route::new(
            id,
            self.current,
            methods.to_vec(),
            pattern,
            handlers.into_handlers(),
        );
        self.add_route(route)
    }

    /// Register a route accepting every default method.
    pub fn any(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &ALL_METHODS)
    }

    pub fn get(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::GET])
    }

    pub fn post(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::POST])
    }

    pub fn put(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::PUT])
    }

    pub fn patch(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::PATCH])
    }

    pub fn delete(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::DELETE])
    }

    pub fn options(&mut self, spec: impl Into<RouteSpec>, handlers: impl IntoHandlers<H>) -> &mut Self {
        self.route(spec, handlers, &[Method::OPTIONS])
    }

    /// Composition form of mounting: run the callback against this router
    /// without opening a new group.
    pub fn mount(&mut self, callback: impl FnOnce(&mut Self)) -> &mut Self {
        callback(self);
        self
    }

    /// Open a child group with `prefix` appended to the current effective
    /// prefix and optional group middleware, run the callback with the child
    /// as the current group, then pop back to the parent.
    ///
    /// Routes registered inside the callback land directly in this router's
    /// registry; registrations made before a callback panics are kept (no
    /// rollback).
    pub fn mount_under(
        &mut self,
        prefix: &str,
        handlers: impl IntoHandlers<H>,
        callback: impl FnOnce(&mut Self),
    ) -> &mut Self {
        let parent = self.current;
        let child = self
            .groups
            .push(parent, prefix, handlers.into_handlers());
        self.current = child;
        callback(self);
        self.current = parent;
        self
    }

    /// Dispatch a request against the registry.
    ///
    /// On a match, every captured placeholder is written into the request's
    /// extensions as [`PathParams`] and the route is returned; running its
    /// [`handler chain`](Router::handler_chain) is the caller's job.
    pub fn dispatch<B>(&self, request: &mut Request<B>) -> RouterResult<&Route<H>> {
        let table = self.dispatch_table()?;
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match table.lookup(&method, &path) {
            MatchOutcome::NotFound => {
                tracing::debug!(method = %method, path = %path, "no route matched");
                Err(RouterError::NotFound)
            }
            MatchOutcome::MethodNotAllowed { allowed } => {
                tracing::debug!(method = %method, path = %path, "method not allowed");
                Err(RouterError::MethodNotAllowed { allowed })
            }
            MatchOutcome::Found { route, params } => {
                let route = &self.routes[route];
                tracing::debug!(method = %method, path = %path, route = %route.id(), "route matched");
                request
                    .extensions_mut()
                    .insert(params.into_iter().collect::<PathParams>());
                Ok(route)
            }
        }
    }

    /// Full effective handler chain for a route owned by this router.
    pub fn handler_chain<'a>(&'a self, route: &'a Route<H>) -> Vec<&'a H> {
        route.handler_chain(&self.groups)
    }

    /// Build a concrete URL from a registered route id or a literal pattern.
    ///
    /// Alternatives are tried most-placeholders-first; one succeeds only if
    /// every placeholder it contains is bound in `params`. Unconsumed params
    /// become the query string. The base path is never prepended.
    pub fn create_url(&self, pattern: &str, params: &[(&str, &str)]) -> RouterResult<String> {
        let pattern = match self.get_route(pattern) {
            Some(route) => route.pattern().to_string(),
            None => pattern.to_string(),
        };
        let parsed = self.parsed(&pattern)?;

        // Most specific first: most placeholders, then most literal text.
        let mut alternatives: Vec<_> = parsed.alternatives().iter().collect();
        alternatives.sort_by_key(|alt| {
            (
                std::cmp::Reverse(alt.param_count()),
                std::cmp::Reverse(alt.tokens().len()),
            )
        });

        for alternative in alternatives {
            let mut url = String::new();
            let mut consumed = vec![false; params.len()];
            let mut satisfied = true;

            for token in alternative.tokens() {
                match token {
                    Token::Literal(text) => url.push_str(text),
                    Token::Param(placeholder) => {
                        // Only the first unconsumed occurrence is
                        // substituted; duplicate names spill into the
                        // query string with the other leftovers.
                        let slot = params
                            .iter()
                            .enumerate()
                            .find(|(i, (name, _))| {
                                !consumed[*i] && *name == placeholder.name()
                            })
                            .map(|(i, _)| i);
                        match slot {
                            Some(i) => {
                                consumed[i] = true;
                                url.push_str(params[i].1);
                            }
                            None => {
                                satisfied = false;
                                break;
                            }
                        }
                    }
                }
            }

            if satisfied {
                let leftovers: Vec<_> = params
                    .iter()
                    .zip(&consumed)
                    .filter(|(_, used)| !**used)
                    .map(|(pair, _)| *pair)
                    .collect();
                if !leftovers.is_empty() {
                    let mut query = url::form_urlencoded::Serializer::new(String::new());
                    for (name, value) in leftovers {
                        query.append_pair(name, value);
                    }
                    url.push('?');
                    url.push_str(&query.finish());
                }
                return Ok(url);
            }
        }

        Err(RouterError::invalid_argument("wrong pattern provided"))
    }

    /// Fetch or build the compiled dispatch table.
    fn dispatch_table(&self) -> RouterResult<Arc<Matcher>> {
        if let Some(table) = self.table.load_full() {
            return Ok(table);
        }
        let table = Arc::new(self.build_table()?);
        tracing::debug!(routes = table.len(), "compiled dispatch table");
        // Concurrent first dispatches may race here; the build is
        // idempotent, so whichever table lands last is equivalent.
        self.table.store(Some(table.clone()));
        Ok(table)
    }

    fn build_table(&self) -> RouterResult<Matcher> {
        let mut entries = Vec::with_capacity(self.routes.len());
        for (index, route) in self.routes.iter().enumerate() {
            let full = format!("{}{}", self.base_path, route.pattern());
            entries.push(RouteEntry {
                index,
                methods: route.methods().to_vec(),
                pattern: self.parsed(&full)?,
            });
        }
        Ok(Matcher::build(entries))
    }

    /// Parse through the shared cache; patterns are parsed once per distinct
    /// string for the lifetime of the router.
    fn parsed(&self, pattern: &str) -> RouterResult<Arc<ParsedPattern>> {
        if let Some(cached) = self.patterns.get(pattern) {
            return Ok(cached.clone());
        }
        let parsed = Arc::new(ParsedPattern::parse(pattern)?);
        self.patterns.insert(pattern.to_string(), parsed.clone());
        Ok(parsed)
    }

    fn invalidate(&mut self) {
        self.table.store(None);
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}
