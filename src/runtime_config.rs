//! # Runtime Configuration Module
//!
//! Environment variable-based defaults for the request context that adapters
//! are bound to.
//!
//! ## Environment Variables
//!
//! | Variable                  | Default     | Meaning                               |
//! |---------------------------|-------------|---------------------------------------|
//! | `ROUTEMAP_SERVER_NAME`    | `localhost` | Host name URLs are built against      |
//! | `ROUTEMAP_SCRIPT_NAME`    | `/`         | Mount point of the application        |
//! | `ROUTEMAP_URL_SCHEME`     | `http`      | Scheme of externally built URLs       |
//! | `ROUTEMAP_DEFAULT_METHOD` | `GET`       | Method assumed when none is given     |
//!
//! ## Usage
//!
//! ```rust
//! use routemap::router::{Map, Rule};
//! use routemap::runtime_config::RuntimeConfig;
//!
//! let mut map = Map::new();
//! map.add(Rule::new("/", "index")).unwrap();
//!
//! let config = RuntimeConfig::from_env();
//! let urls = config.bind(&map);
//! assert_eq!(urls.server_name(), config.server_name);
//! ```

use crate::router::{Map, MapAdapter};
use http::Method;
use std::env;
use tracing::warn;

/// Request-context defaults loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Server name (default: `localhost`)
    pub server_name: String,
    /// Script root (default: `/`)
    pub script_name: String,
    /// URL scheme (default: `http`)
    pub url_scheme: String,
    /// Default method for matching and building (default: `GET`)
    pub default_method: Method,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_string(),
            script_name: "/".to_string(),
            url_scheme: "http".to_string(),
            default_method: Method::GET,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup (used by tests).
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        let default_method = match lookup("ROUTEMAP_DEFAULT_METHOD") {
            Some(raw) => match Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()) {
                Ok(method) => method,
                Err(_) => {
                    warn!(value = %raw, "invalid ROUTEMAP_DEFAULT_METHOD, using GET");
                    defaults.default_method.clone()
                }
            },
            None => defaults.default_method.clone(),
        };

        RuntimeConfig {
            server_name: read("ROUTEMAP_SERVER_NAME", defaults.server_name),
            script_name: read("ROUTEMAP_SCRIPT_NAME", defaults.script_name),
            url_scheme: read("ROUTEMAP_URL_SCHEME", defaults.url_scheme),
            default_method,
        }
    }

    /// Bind `map` to this context.
    pub fn bind(&self, map: &Map) -> MapAdapter {
        map.bind(&self.server_name)
            .with_script_name(self.script_name.as_str())
            .with_url_scheme(self.url_scheme.as_str())
            .with_default_method(self.default_method.clone())
    }
}
