//! Pattern-based HTTP request router with grouped middleware and URL generation.

pub mod error;
pub mod routing;

pub use error::{RouterError, RouterResult};
pub use routing::group::{Group, GroupId, GroupTree};
pub use routing::matcher::{MatchOutcome, Matcher};
pub use routing::params::PathParams;
pub use routing::pattern::ParsedPattern;
pub use routing::route::{IntoHandlers, Route, RouteSpec};
pub use routing::router::{Router, ALL_METHODS};
