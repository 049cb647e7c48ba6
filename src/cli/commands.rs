use crate::config::{load_routes, parse_method};
use crate::router::{Map, MapAdapter, RoutingError, Value, Values};
use crate::runtime_config::RuntimeConfig;
use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// Command-line interface for routemap
#[derive(Parser, Debug)]
#[command(name = "routemap")]
#[command(about = "Inspect, match and build URLs against a route file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log level for diagnostics on stderr
    #[arg(long, global = true, env = "ROUTEMAP_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Request context overrides shared by `match` and `build`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextArgs {
    /// Server name URLs are built against
    #[arg(long)]
    pub server_name: Option<String>,

    /// Subdomain of the simulated request
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Mount point of the application
    #[arg(long)]
    pub script_name: Option<String>,

    /// Scheme of externally built URLs
    #[arg(long)]
    pub url_scheme: Option<String>,
}

impl ContextArgs {
    fn runtime_config(&self, base: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            server_name: self.server_name.clone().unwrap_or(base.server_name),
            script_name: self.script_name.clone().unwrap_or(base.script_name),
            url_scheme: self.url_scheme.clone().unwrap_or(base.url_scheme),
            default_method: base.default_method,
        }
    }

    fn bind(&self, map: &Map, base: RuntimeConfig) -> MapAdapter {
        let adapter = self.runtime_config(base).bind(map);
        match &self.subdomain {
            Some(subdomain) => adapter.with_subdomain(subdomain.as_str()),
            None => adapter,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List rules in match order, or one endpoint's rules in build order
    Routes {
        /// Route file (YAML, JSON or TOML)
        #[arg(short, long)]
        file: PathBuf,

        /// Only show rules of this endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Match a path and print the endpoint and values as JSON
    Match {
        /// Route file (YAML, JSON or TOML)
        #[arg(short, long)]
        file: PathBuf,

        /// Request path, percent-encoded as sent
        #[arg(short, long)]
        path: String,

        /// Request method (default: ROUTEMAP_DEFAULT_METHOD or GET)
        #[arg(short, long)]
        method: Option<String>,

        #[command(flatten)]
        context: ContextArgs,
    },
    /// Build a URL for an endpoint
    Build {
        /// Route file (YAML, JSON or TOML)
        #[arg(short, long)]
        file: PathBuf,

        /// Endpoint to build
        #[arg(short, long)]
        endpoint: String,

        /// Values as key=value (repeatable)
        #[arg(long = "value", value_name = "KEY=VALUE")]
        values: Vec<String>,

        /// Only consider rules accepting this method
        #[arg(short, long)]
        method: Option<String>,

        /// Always produce a fully qualified URL
        #[arg(long, default_value_t = false)]
        external: bool,

        #[command(flatten)]
        context: ContextArgs,
    },
    /// Load and bind a route file, reporting the first error
    Check {
        /// Route file (YAML, JSON or TOML)
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Parse `key=value`. Integers and decimals become numbers, anything else
/// stays text.
pub fn parse_value_arg(raw: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("empty key in '{raw}'");
    }
    let value = match (value.parse::<i64>(), value.parse::<f64>()) {
        (Ok(i), _) => Value::Integer(i),
        (_, Ok(f)) if value.contains('.') && f.is_finite() => Value::Float(f),
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Run `cli`, writing results to `out`.
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Routes { file, endpoint } => {
            let map = load_routes(file)?;
            let rules = map.iter_rules(endpoint.as_deref());
            if let Some(endpoint) = endpoint.as_deref().filter(|_| rules.is_empty()) {
                bail!("no rules for endpoint '{endpoint}'");
            }
            for rule in rules {
                let methods = rule
                    .get_methods()
                    .map(|m| m.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(","))
                    .unwrap_or_else(|| "*".to_string());
                let subdomain = rule.bound_subdomain().unwrap_or_default();
                writeln!(
                    out,
                    "{:<40} {:<24} {:<20} {}",
                    rule.rule(),
                    rule.endpoint(),
                    methods,
                    if subdomain.is_empty() { "-" } else { subdomain }
                )?;
            }
            Ok(())
        }
        Commands::Match {
            file,
            path,
            method,
            context,
        } => {
            let map = load_routes(file)?;
            let base = RuntimeConfig::from_env();
            let method = match method {
                Some(m) => parse_method(m)?,
                None => base.default_method.clone(),
            };
            let adapter = context.bind(&map, base);
            match adapter.match_path(path, &method) {
                Ok((endpoint, values)) => {
                    let body = serde_json::json!({ "endpoint": endpoint, "values": values });
                    writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
                    Ok(())
                }
                Err(RoutingError::RequestRedirect { location, code }) => {
                    let body = serde_json::json!({
                        "redirect": location,
                        "status": code.as_u16(),
                    });
                    writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
                    Ok(())
                }
                Err(e) => Err(anyhow::Error::new(e).context(format!("{method} {path}"))),
            }
        }
        Commands::Build {
            file,
            endpoint,
            values,
            method,
            external,
            context,
        } => {
            let map = load_routes(file)?;
            let values = values
                .iter()
                .map(|raw| parse_value_arg(raw))
                .collect::<anyhow::Result<Values>>()?;
            let method = method.as_deref().map(parse_method).transpose()?;
            let adapter = context.bind(&map, RuntimeConfig::from_env());
            let url = adapter.build(endpoint, &values, method.as_ref(), *external)?;
            writeln!(out, "{url}")?;
            Ok(())
        }
        Commands::Check { file } => {
            let map = load_routes(file)?;
            writeln!(
                out,
                "ok: {} rules, {} endpoints",
                map.rule_count(),
                map.endpoints().len()
            )?;
            Ok(())
        }
    }
}

/// Run `cli` against stdout.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&cli, &mut out)
}
