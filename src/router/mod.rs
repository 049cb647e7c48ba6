//! # Router Module
//!
//! Rule-based URL routing: route templates are compiled into anchored regexes,
//! ranked, and used in both directions, matching a request path to an
//! endpoint and building a URL back from an endpoint and its values.
//!
//! ## Overview
//!
//! - [`Rule`] - one template such as `/downloads/<int:id>` plus its endpoint,
//!   methods, defaults, subdomain and redirect behaviour
//! - [`Map`] - the routing table; binds rules and keeps them in match order
//!   and per-endpoint build order
//! - [`MapAdapter`] - a map bound to one request context (server name, script
//!   root, subdomain, scheme) exposing `match_path` and `build`
//! - [`Converter`] - per-variable parsing and serialization (`string`, `any`,
//!   `path`, `int`, `float`, `uuid`, or custom)
//! - Rule factories ([`Subdomain`], [`Submount`], [`EndpointPrefix`],
//!   [`RuleTemplate`]) that expand into plain rules
//!
//! ## Architecture
//!
//! Matching works in two phases:
//!
//! 1. **Binding**: each rule's template is tokenized and compiled into a regex
//!    over the key `subdomain|/path`, a reconstruction trace and a ranking key.
//!
//! 2. **Matching**: the adapter tries rules in rank order. The first structural
//!    match whose converters accept the segments and whose methods include the
//!    request method wins, unless it asks for a redirect (missing trailing
//!    slash, canonical defaults, alias, explicit target).
//!
//! Ranking prefers static text over variables, longer literals over shorter,
//! more segments over fewer, and narrow converters over greedy ones, so that
//! declaration order never matters.
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use routemap::router::{Map, Rule, RoutingError};
//! use routemap::values;
//!
//! let mut map = Map::new();
//! map.add(Rule::new("/", "index")).unwrap();
//! map.add(Rule::new("/downloads/", "downloads/index")).unwrap();
//! map.add(Rule::new("/downloads/<int:id>", "downloads/show")).unwrap();
//!
//! let urls = map.bind("example.com");
//! let (endpoint, values) = urls.match_path("/downloads/42", &Method::GET).unwrap();
//! assert_eq!(endpoint, "downloads/show");
//! assert_eq!(values, values! { "id" => 42 });
//!
//! assert!(matches!(
//!     urls.match_path("/downloads", &Method::GET),
//!     Err(RoutingError::RequestRedirect { .. })
//! ));
//!
//! let url = urls.build("downloads/show", &values! { "id" => 42 }, None, false).unwrap();
//! assert_eq!(url, "/downloads/42");
//! ```

mod adapter;
mod args;
mod converters;
mod error;
mod factory;
mod map;
mod pattern;
mod rule;
mod value;
#[cfg(test)]
mod tests;

pub use adapter::MapAdapter;
pub use args::{parse_converter_args, ConverterArg, ConverterArgs};
pub use converters::{
    normalize_path, quote, AnyConverter, Converter, ConverterFactory, ConverterRegistry,
    FloatConverter, IntegerConverter, PathConverter, StringConverter, UuidConverter,
    DEFAULT_WEIGHT, GREEDY_WEIGHT, NARROW_WEIGHT,
};
pub use error::{BuildError, RoutingError, RuleError};
pub use factory::{
    substitute, EndpointPrefix, RuleFactory, RuleTemplate, RuleTemplateFactory, Subdomain,
    Submount,
};
pub use map::{Map, MapConfig, RuleSet, SharedMap};
pub use pattern::{tokenize, Token, Weight, Weights};
pub use rule::{RedirectCallback, RedirectTarget, Rule, RuleMatch};
pub use value::{Value, Values};
