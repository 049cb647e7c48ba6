//! # Route File Module
//!
//! Declarative route files in YAML, JSON or TOML, loaded into a [`Map`](crate::router::Map).
//!
//! ```yaml
//! strict_slashes: true
//! rules:
//!   - rule: /downloads/<int:id>
//!     endpoint: downloads/show
//!     methods: [GET]
//! groups:
//!   - submount: /api
//!     endpoint_prefix: "api."
//!     rules:
//!       - rule: /users/<int:id>
//!         endpoint: users.show
//! ```
//!
//! Rules are bound while loading, so a file that loads is a file that routes:
//! malformed templates, unknown converters and bad methods are reported with
//! the offending rule.

mod build;
mod load;
mod types;

pub(crate) use build::parse_method;
pub use load::*;
pub use types::*;
