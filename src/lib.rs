//! # routemap
//!
//! **routemap** is a rule-based URL routing engine. It compiles declarative
//! route templates into matchers, resolves a request path and method to an
//! endpoint plus typed values, and builds canonical URLs back from an endpoint
//! and its values.
//!
//! ## Overview
//!
//! ```text
//! /archive/<int(fixed_digits=4):year>/<slug>
//!  ^ literal ^ converter + arguments  ^ variable (default converter)
//! ```
//!
//! - Rules are ranked automatically: static text beats variables, narrow
//!   converters beat free strings, the greedy `path` converter goes last.
//! - Non-leaf rules (`/docs/`) redirect `/docs` to `/docs/`.
//! - A rule with defaults is the canonical URL of its endpoint; matching a
//!   longer sibling with the same values redirects to it.
//! - Building picks the first rule of the endpoint that can represent the
//!   given values and appends the rest as a query string.
//!
//! ## Architecture
//!
//! The library is organized into these modules:
//!
//! - **[`router`]** - converters, rules, the routing table and adapters
//! - **[`config`]** - route files in YAML, JSON or TOML
//! - **[`runtime_config`]** - request-context defaults from the environment
//! - **[`hot_reload`]** - reload a route file into a shared table
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - the `routemap` command-line tool
//!
//! ## Quick Start
//!
//! ```
//! use http::Method;
//! use routemap::router::{Map, Rule};
//! use routemap::values;
//!
//! let mut map = Map::new();
//! map.add(Rule::new("/", "index")).unwrap();
//! map.add(Rule::new("/all/", "all").defaults(values! { "page" => 1 })).unwrap();
//! map.add(Rule::new("/all/page/<int:page>", "all")).unwrap();
//!
//! let urls = map.bind("example.com");
//!
//! // The canonical URL for page 1 is /all/
//! let err = urls.match_path("/all/page/1", &Method::GET).unwrap_err();
//! assert_eq!(err.location(), Some("http://example.com/all/"));
//!
//! let (endpoint, values) = urls.match_path("/all/page/2", &Method::GET).unwrap();
//! assert_eq!(endpoint, "all");
//! assert_eq!(values, values! { "page" => 2 });
//!
//! assert_eq!(urls.build("all", &values! { "page" => 1 }, None, false).unwrap(), "/all/");
//! assert_eq!(urls.build("all", &values! { "page" => 3 }, None, false).unwrap(), "/all/page/3");
//! assert_eq!(urls.build("index", &values! { "q" => "x y" }, None, false).unwrap(), "/?q=x+y");
//! ```
//!
//! ## Concurrency
//!
//! Rules are added through `&mut Map` during setup. Matching and building go
//! through a [`MapAdapter`](router::MapAdapter) holding an `Arc` of an
//! immutable sorted snapshot, so adapters can be shared freely between
//! threads. [`SharedMap`](router::SharedMap) swaps whole tables atomically
//! for hot reload.

pub mod cli;
pub mod config;
pub mod hot_reload;
pub mod logging;
pub mod router;
pub mod runtime_config;

pub use config::{load_routes, RouteFile};
pub use router::{
    BuildError, Map, MapAdapter, MapConfig, Rule, RoutingError, RuleError, SharedMap, Value,
    Values,
};
