use super::adapter::MapAdapter;
use super::converters::ConverterRegistry;
use super::error::RuleError;
use super::factory::RuleFactory;
use super::rule::Rule;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Table-wide settings shared by every rule bound to a [`Map`].
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Subdomain of rules that do not declare one.
    pub default_subdomain: String,
    /// Whether non-leaf rules redirect requests missing the trailing slash.
    pub strict_slashes: bool,
    /// Whether matches are redirected to the canonical URL of their endpoint.
    pub redirect_defaults: bool,
    /// Converters available to rule templates.
    pub converters: ConverterRegistry,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_subdomain: String::new(),
            strict_slashes: true,
            redirect_defaults: true,
            converters: ConverterRegistry::builtin(),
        }
    }
}

/// Immutable, sorted view of a map's rules.
///
/// Adapters hold one of these for their whole lifetime, so concurrent
/// matching never observes a half-updated table.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// In match order.
    rules: Vec<Arc<Rule>>,
    /// Per endpoint, in build order.
    by_endpoint: HashMap<String, Vec<Arc<Rule>>>,
}

impl RuleSet {
    fn sorted(rules: &[Arc<Rule>]) -> Self {
        let mut ordered: Vec<Arc<Rule>> = rules.to_vec();
        ordered.sort_by(|a, b| a.match_key().cmp(&b.match_key()));

        let mut by_endpoint: HashMap<String, Vec<Arc<Rule>>> = HashMap::new();
        for rule in &ordered {
            by_endpoint
                .entry(rule.endpoint().to_string())
                .or_default()
                .push(Arc::clone(rule));
        }
        for bucket in by_endpoint.values_mut() {
            bucket.sort_by_cached_key(|rule| {
                (
                    rule.is_alias(),
                    Reverse(rule.arguments().len()),
                    Reverse(rule.get_defaults().map_or(0, |d| d.len())),
                    rule.match_key().cloned(),
                )
            });
        }

        Self {
            rules: ordered,
            by_endpoint,
        }
    }

    /// All rules in match order.
    #[must_use]
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Rules of one endpoint in build order.
    #[must_use]
    pub fn for_endpoint(&self, endpoint: &str) -> &[Arc<Rule>] {
        self.by_endpoint
            .get(endpoint)
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The routing table.
///
/// Rules are added with `&mut self` during setup. The first call that needs
/// ordering (`update`, `bind`, `iter_rules`) sorts the rules and publishes an
/// immutable [`RuleSet`]; adding more rules drops the published snapshot and
/// the next read builds a new one.
pub struct Map {
    config: Arc<MapConfig>,
    rules: Vec<Arc<Rule>>,
    published: ArcSwapOption<RuleSet>,
}

impl Map {
    /// Empty table with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            config: Arc::new(config),
            rules: Vec::new(),
            published: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Flatten `factory`, bind every produced rule and add them.
    ///
    /// All-or-nothing: if any rule fails to bind, none are added.
    pub fn add(&mut self, factory: impl RuleFactory) -> Result<(), RuleError> {
        let mut bound = Vec::new();
        for mut rule in factory.get_rules()? {
            rule.bind_with(&self.config)?;
            debug!(
                rule = %rule.rule(),
                endpoint = %rule.endpoint(),
                subdomain = rule.bound_subdomain().unwrap_or(""),
                "rule bound"
            );
            bound.push(Arc::new(rule));
        }
        self.rules.extend(bound);
        self.published.store(None);
        Ok(())
    }

    /// Sorted snapshot of the current rules, computed on first use after a
    /// change.
    pub fn update(&self) -> Arc<RuleSet> {
        if let Some(published) = self.published.load_full() {
            return published;
        }
        let snapshot = Arc::new(RuleSet::sorted(&self.rules));
        self.published.store(Some(Arc::clone(&snapshot)));
        info!(
            rules = snapshot.len(),
            endpoints = snapshot.by_endpoint.len(),
            "rule snapshot published"
        );
        snapshot
    }

    /// Rules in match order, or one endpoint's rules in build order.
    pub fn iter_rules(&self, endpoint: Option<&str>) -> Vec<Arc<Rule>> {
        let snapshot = self.update();
        match endpoint {
            Some(endpoint) => snapshot.for_endpoint(endpoint).to_vec(),
            None => snapshot.rules().to_vec(),
        }
    }

    /// Whether some rule of `endpoint` takes all of `arguments`.
    pub fn is_endpoint_expecting(&self, endpoint: &str, arguments: &[&str]) -> bool {
        self.update()
            .for_endpoint(endpoint)
            .iter()
            .any(|rule| arguments.iter().all(|a| rule.arguments().contains(*a)))
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Distinct endpoint names, sorted.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .rules
            .iter()
            .map(|r| r.endpoint().to_string())
            .collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        endpoints
    }

    /// Adapter for requests to `server_name` on the default subdomain.
    pub fn bind(&self, server_name: &str) -> MapAdapter {
        MapAdapter::new(self.update(), Arc::clone(&self.config), server_name)
    }

    /// Adapter for a request whose `Host` header is `host`.
    ///
    /// The subdomain is whatever precedes `server_name` in the host. A host
    /// outside `server_name` gets the subdomain `<invalid>`, which no rule
    /// matches. Default ports for `url_scheme` are ignored on both sides.
    pub fn bind_for_host(&self, server_name: &str, host: &str, url_scheme: &str) -> MapAdapter {
        let server_name = strip_default_port(&server_name.to_ascii_lowercase(), url_scheme);
        let host = strip_default_port(&host.to_ascii_lowercase(), url_scheme);

        let host_labels: Vec<&str> = host.split('.').collect();
        let server_labels: Vec<&str> = server_name.split('.').collect();
        let subdomain = if host_labels.len() >= server_labels.len()
            && host_labels[host_labels.len() - server_labels.len()..] == server_labels[..]
        {
            host_labels[..host_labels.len() - server_labels.len()]
                .iter()
                .filter(|l| !l.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(".")
        } else {
            warn!(
                host = %host,
                server_name = %server_name,
                "host does not belong to the configured server name"
            );
            "<invalid>".to_string()
        };

        self.bind(&server_name)
            .with_subdomain(subdomain)
            .with_url_scheme(url_scheme)
    }
}

fn strip_default_port(host: &str, scheme: &str) -> String {
    let default = match scheme {
        "http" | "ws" => ":80",
        "https" | "wss" => ":443",
        _ => return host.to_string(),
    };
    host.strip_suffix(default).unwrap_or(host).to_string()
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("config", &self.config)
            .field("rules", &self.rules)
            .field("published", &self.published.load().is_some())
            .finish()
    }
}

/// Swappable handle to the map currently serving requests.
///
/// Readers load an `Arc<Map>` and keep using it even if a reload replaces the
/// handle's contents meanwhile.
pub struct SharedMap {
    current: ArcSwap<Map>,
}

impl SharedMap {
    /// Publish `map` (sorting it first).
    #[must_use]
    pub fn new(map: Map) -> Self {
        map.update();
        Self {
            current: ArcSwap::from_pointee(map),
        }
    }

    /// The map serving requests right now.
    #[must_use]
    pub fn load(&self) -> Arc<Map> {
        self.current.load_full()
    }

    /// Atomically replace the served map.
    pub fn replace(&self, map: Map) {
        map.update();
        let rules = map.rule_count();
        self.current.store(Arc::new(map));
        info!(rules, "routing table replaced");
    }

    /// Adapter over the current map.
    pub fn bind(&self, server_name: &str) -> MapAdapter {
        self.current.load().bind(server_name)
    }
}

impl fmt::Debug for SharedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMap")
            .field("rules", &self.current.load().rule_count())
            .finish()
    }
}
