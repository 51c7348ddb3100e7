//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, single-threaded):
//!     route() / mount_under()
//!     → group.rs (prefix/middleware tree, arena-backed)
//!     → route.rs (full pattern frozen at construction)
//!     → flat registry on the Router, keyed by route id
//!
//! Dispatch (read-only, concurrent):
//!     (method, path)
//!     → pattern.rs (compile patterns, cached)
//!     → matcher.rs (structural match, then method partition)
//!     → Found / NotFound / MethodNotAllowed{allowed}
//!
//! URL generation:
//!     route id or pattern + params
//!     → pattern.rs (cached parse, alternative selection)
//!     → literal substitution + query string for leftovers
//! ```
//!
//! # Design Decisions
//! - Registry mutation drops the compiled dispatch table; the next dispatch
//!   rebuilds it, so matching always reflects the current registry
//! - Registration order is the tie-break for overlapping patterns
//! - The router classifies outcomes but never executes handlers or writes
//!   response bodies

pub mod group;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;
