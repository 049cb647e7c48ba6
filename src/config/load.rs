use super::types::RouteFile;
use crate::router::Map;
use anyhow::{anyhow, Context};
use std::path::Path;
use tracing::info;

/// Serialization format of a route file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    Yaml,
    Json,
    Toml,
}

impl RouteFormat {
    /// Guess the format from the file extension.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(RouteFormat::Yaml),
            "json" => Ok(RouteFormat::Json),
            "toml" => Ok(RouteFormat::Toml),
            other => Err(anyhow!(
                "unsupported route file extension '{other}' for {}",
                path.display()
            )),
        }
    }
}

/// Parse route file text without binding anything.
pub fn parse_routes(content: &str, format: RouteFormat) -> anyhow::Result<RouteFile> {
    let file = match format {
        RouteFormat::Yaml => serde_yaml::from_str(content).context("invalid YAML route file")?,
        RouteFormat::Json => serde_json::from_str(content).context("invalid JSON route file")?,
        RouteFormat::Toml => toml::from_str(content).context("invalid TOML route file")?,
    };
    Ok(file)
}

/// Read and parse a route file.
pub fn load_route_file<P: AsRef<Path>>(path: P) -> anyhow::Result<RouteFile> {
    let path = path.as_ref();
    let format = RouteFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read route file {}", path.display()))?;
    parse_routes(&content, format).with_context(|| format!("in {}", path.display()))
}

/// Read a route file and bind it into a sorted [`Map`].
pub fn load_routes<P: AsRef<Path>>(path: P) -> anyhow::Result<Map> {
    let path = path.as_ref();
    let map = load_route_file(path)?
        .into_map()
        .with_context(|| format!("in {}", path.display()))?;
    map.update();
    info!(
        path = %path.display(),
        rules = map.rule_count(),
        endpoints = map.endpoints().len(),
        "route file loaded"
    );
    Ok(map)
}
