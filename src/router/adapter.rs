//! Request-scoped view of a routing table.

use super::converters::normalize_path;
use super::error::{BuildError, RoutingError};
use super::map::{MapConfig, RuleSet};
use super::rule::{RedirectTarget, Rule, RuleMatch};
use super::value::Values;
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A [`Map`](super::Map) bound to one request context: server name, script
/// root, subdomain and scheme.
///
/// Adapters are cheap to create and clone. They keep the rule snapshot that
/// was current when they were bound.
#[derive(Clone)]
pub struct MapAdapter {
    rules: Arc<RuleSet>,
    config: Arc<MapConfig>,
    server_name: String,
    script_name: String,
    subdomain: String,
    url_scheme: String,
    default_method: Method,
    path_info: String,
    query_args: Option<String>,
}

impl MapAdapter {
    pub(crate) fn new(rules: Arc<RuleSet>, config: Arc<MapConfig>, server_name: &str) -> Self {
        let subdomain = config.default_subdomain.clone();
        Self {
            rules,
            config,
            server_name: server_name.to_ascii_lowercase(),
            script_name: "/".to_string(),
            subdomain,
            url_scheme: "http".to_string(),
            default_method: Method::GET,
            path_info: "/".to_string(),
            query_args: None,
        }
    }

    /// Mount point of the application. Always stored with a trailing `/`.
    #[must_use]
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        let mut script_name: String = script_name.into();
        if !script_name.starts_with('/') {
            script_name.insert(0, '/');
        }
        if !script_name.ends_with('/') {
            script_name.push('/');
        }
        self.script_name = script_name;
        self
    }

    #[must_use]
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = subdomain.into();
        self
    }

    #[must_use]
    pub fn with_url_scheme(mut self, url_scheme: impl Into<String>) -> Self {
        self.url_scheme = url_scheme.into();
        self
    }

    /// Method assumed by [`match_current`](Self::match_current) and tried
    /// first by [`build`](Self::build) when none is given.
    #[must_use]
    pub fn with_default_method(mut self, method: Method) -> Self {
        self.default_method = method;
        self
    }

    /// Path used by [`match_current`](Self::match_current).
    #[must_use]
    pub fn with_path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = path_info.into();
        self
    }

    /// Encoded query string carried over to redirect locations.
    #[must_use]
    pub fn with_query_args(mut self, query_args: impl Into<String>) -> Self {
        let query: String = query_args.into();
        let query = query.trim_start_matches('?');
        self.query_args = (!query.is_empty()).then(|| query.to_string());
        self
    }

    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    #[must_use]
    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    #[must_use]
    pub fn url_scheme(&self) -> &str {
        &self.url_scheme
    }

    #[must_use]
    pub fn default_method(&self) -> &Method {
        &self.default_method
    }

    /// Resolve `path` and `method` to an endpoint and its values.
    ///
    /// `path` is the request path as sent (percent-encoded); it may be given
    /// relative to the script root or include it.
    pub fn match_path(&self, path: &str, method: &Method) -> Result<(String, Values), RoutingError> {
        self.match_rule(path, method)
            .map(|(rule, values)| (rule.endpoint().to_string(), values))
    }

    /// [`match_path`](Self::match_path) with the adapter's own path and
    /// default method.
    pub fn match_current(&self) -> Result<(String, Values), RoutingError> {
        self.match_path(&self.path_info, &self.default_method)
    }

    /// Like [`match_path`](Self::match_path) but returns the rule itself.
    pub fn match_rule(
        &self,
        path: &str,
        method: &Method,
    ) -> Result<(Arc<Rule>, Values), RoutingError> {
        self.scan(path, Some(method))
    }

    /// Whether `path` resolves (a redirect counts as resolving).
    #[must_use]
    pub fn test(&self, path: &str, method: &Method) -> bool {
        match self.match_path(path, method) {
            Ok(_) | Err(RoutingError::RequestRedirect { .. }) => true,
            Err(_) => false,
        }
    }

    /// Methods accepted by the method-restricted rules matching `path`.
    ///
    /// Empty when nothing matches, and also when an unrestricted rule
    /// matches (any method is fine then).
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        match self.scan(path, None) {
            Err(RoutingError::MethodNotAllowed { allowed }) => allowed,
            _ => Vec::new(),
        }
    }

    /// Match, then hand the endpoint and values to `view`.
    pub fn dispatch<F, R>(&self, path: &str, method: &Method, view: F) -> Result<R, RoutingError>
    where
        F: FnOnce(&str, Values) -> R,
    {
        let (rule, values) = self.match_rule(path, method)?;
        Ok(view(rule.endpoint(), values))
    }

    /// `method == None` probes: restricted rules count as mismatches and no
    /// trailing-slash redirect is issued.
    fn scan(
        &self,
        path: &str,
        method: Option<&Method>,
    ) -> Result<(Arc<Rule>, Values), RoutingError> {
        let path = self.relative_path(&normalize_path(path));
        let key = format!("{}|{}", self.subdomain, path);
        let mut allowed: Vec<Method> = Vec::new();

        for rule in self.rules.rules() {
            let values = match rule.match_path(&key, method) {
                RuleMatch::NoMatch => continue,
                RuleMatch::MissingSlash => {
                    let location = self.make_redirect_url(&format!("{path}/"), None);
                    debug!(path = %path, location = %location, "trailing slash redirect");
                    return Err(RoutingError::redirect(location));
                }
                RuleMatch::Matched(values) => values,
            };

            let method_ok = match method {
                Some(m) => rule.allows(m),
                None => rule.get_methods().is_none(),
            };
            if !method_ok {
                allowed.extend(rule.get_methods().unwrap_or_default().iter().cloned());
                continue;
            }

            if self.config.redirect_defaults {
                if let Some(location) = self.default_redirect(rule, &values, method) {
                    debug!(path = %path, location = %location, "canonical defaults redirect");
                    return Err(RoutingError::redirect(location));
                }
                if rule.is_alias() {
                    if let Some(location) = self.alias_redirect(rule, &values, method, &path) {
                        debug!(path = %path, location = %location, "alias redirect");
                        return Err(RoutingError::redirect(location));
                    }
                }
            }

            if let Some(target) = rule.get_redirect_to() {
                let location = self.explicit_redirect(rule, target, &values);
                debug!(path = %path, location = %location, "rule redirect");
                return Err(RoutingError::redirect(location));
            }

            debug!(
                path = %path,
                rule = %rule.rule(),
                endpoint = %rule.endpoint(),
                "route matched"
            );
            return Ok((Arc::clone(rule), values));
        }

        if allowed.is_empty() {
            debug!(path = %path, "no route matched");
            return Err(RoutingError::NotFound);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed.dedup();
        debug!(path = %path, allowed = ?allowed, "method not allowed");
        Err(RoutingError::MethodNotAllowed { allowed })
    }

    /// Normalize to a single leading `/` and drop the script root if the
    /// caller passed the full path.
    fn relative_path(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        let path = format!("/{}", path.trim_start_matches('/'));
        let root = self.script_name.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(rest) = path.strip_prefix(root) {
                if rest.is_empty() {
                    return "/".to_string();
                }
                if rest.starts_with('/') {
                    return rest.to_string();
                }
            }
        }
        path
    }

    /// A same-endpoint sibling ranked before `rule` that supplies defaults
    /// for it produces the canonical URL.
    fn default_redirect(
        &self,
        rule: &Arc<Rule>,
        values: &Values,
        method: Option<&Method>,
    ) -> Option<String> {
        for candidate in self.rules.for_endpoint(rule.endpoint()) {
            if Arc::ptr_eq(candidate, rule) {
                break;
            }
            if candidate.provides_defaults_for(rule) && candidate.suitable_for(values, method) {
                let mut merged = values.clone();
                if let Some(defaults) = candidate.get_defaults() {
                    merged.extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                if let Some((domain, path)) = candidate.build(&merged, true) {
                    return Some(self.make_redirect_url(&path, Some(&domain)));
                }
            }
        }
        None
    }

    fn alias_redirect(
        &self,
        rule: &Rule,
        values: &Values,
        method: Option<&Method>,
        path: &str,
    ) -> Option<String> {
        let mut location = self
            .build_url(rule.endpoint(), values, method, true, false)
            .ok()?;
        if let Some(query) = &self.query_args {
            location.push(if location.contains('?') { '&' } else { '?' });
            location.push_str(query);
        }
        // The alias may be the only rule able to build.
        (location != self.make_redirect_url(path, None)).then_some(location)
    }

    fn explicit_redirect(&self, rule: &Rule, target: &RedirectTarget, values: &Values) -> String {
        let target = match target {
            RedirectTarget::Template(template) => rule.render_redirect_template(template, values),
            RedirectTarget::Callback(callback) => callback(self, values),
        };
        let base = format!(
            "{}://{}{}",
            self.url_scheme,
            self.get_host(None),
            self.script_name
        );
        match url::Url::parse(&base).and_then(|base| base.join(&target)) {
            Ok(url) => url.to_string(),
            Err(_) => target,
        }
    }

    /// `sub.server` for a domain part, falling back to the adapter's subdomain.
    fn get_host(&self, domain: Option<&str>) -> String {
        let subdomain = domain.unwrap_or(&self.subdomain);
        if subdomain.is_empty() {
            self.server_name.clone()
        } else {
            format!("{subdomain}.{}", self.server_name)
        }
    }

    fn make_redirect_url(&self, path: &str, domain: Option<&str>) -> String {
        let root = self.script_name.trim_end_matches('/').trim_start_matches('/');
        let path = path.trim_start_matches('/');
        let joined = if root.is_empty() {
            path.to_string()
        } else {
            format!("{root}/{path}")
        };
        let mut url = format!("{}://{}/{}", self.url_scheme, self.get_host(domain), joined);
        if let Some(query) = &self.query_args {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(query);
        }
        url
    }

    /// Build a URL for `endpoint`.
    ///
    /// Without a method the adapter's default method is tried first, then any
    /// rule. Values no rule variable consumes become the query string. The
    /// result is root-relative when the rule lives on the adapter's subdomain,
    /// fully qualified otherwise or when `force_external` is set.
    pub fn build(
        &self,
        endpoint: &str,
        values: &Values,
        method: Option<&Method>,
        force_external: bool,
    ) -> Result<String, BuildError> {
        self.build_url(endpoint, values, method, force_external, true)
    }

    fn build_url(
        &self,
        endpoint: &str,
        values: &Values,
        method: Option<&Method>,
        force_external: bool,
        append_unknown: bool,
    ) -> Result<String, BuildError> {
        let built = match method {
            Some(m) => self.partial_build(endpoint, values, Some(m), append_unknown),
            None => self
                .partial_build(endpoint, values, Some(&self.default_method), append_unknown)
                .or_else(|| self.partial_build(endpoint, values, None, append_unknown)),
        };
        let Some((domain, path)) = built else {
            debug!(endpoint, "no rule can build the endpoint");
            return Err(BuildError {
                endpoint: endpoint.to_string(),
                values: values.clone(),
                method: method.cloned(),
            });
        };

        let url = if !force_external && domain == self.subdomain {
            format!(
                "{}/{}",
                self.script_name.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        } else {
            format!(
                "{}://{}{}/{}",
                self.url_scheme,
                self.get_host(Some(&domain)),
                self.script_name.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        debug!(endpoint, url = %url, "url built");
        Ok(url)
    }

    fn partial_build(
        &self,
        endpoint: &str,
        values: &Values,
        method: Option<&Method>,
        append_unknown: bool,
    ) -> Option<(String, String)> {
        self.rules
            .for_endpoint(endpoint)
            .iter()
            .filter(|rule| rule.suitable_for(values, method))
            .find_map(|rule| rule.build(values, append_unknown))
    }
}

impl fmt::Debug for MapAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapAdapter")
            .field("server_name", &self.server_name)
            .field("script_name", &self.script_name)
            .field("subdomain", &self.subdomain)
            .field("url_scheme", &self.url_scheme)
            .field("default_method", &self.default_method)
            .field("rules", &self.rules.len())
            .finish()
    }
}
