//! # CLI Module
//!
//! The `routemap` command-line tool: inspect a route file, match paths
//! against it and build URLs from it.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List rules in match order (or one endpoint's rules in build order):
//!
//! ```bash
//! routemap routes --file routes.yaml
//! routemap routes --file routes.yaml --endpoint downloads/show
//! ```
//!
//! ### `match`
//!
//! Resolve a path and print the endpoint and values as JSON:
//!
//! ```bash
//! routemap match --file routes.yaml --path /downloads/42 --method GET
//! ```
//!
//! ### `build`
//!
//! Build a URL for an endpoint:
//!
//! ```bash
//! routemap build --file routes.yaml --endpoint downloads/show --value id=42 --external
//! ```
//!
//! ### `check`
//!
//! Load and bind a route file, reporting the first error:
//!
//! ```bash
//! routemap check --file routes.yaml
//! ```
//!
//! `match` and `build` take `--server-name`, `--subdomain`, `--script-name`
//! and `--url-scheme`; unset options fall back to the `ROUTEMAP_*`
//! environment variables read by [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).

mod commands;


pub use commands::{execute, parse_value_arg, run_cli, Cli, Commands, ContextArgs};
