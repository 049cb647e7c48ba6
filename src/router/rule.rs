//! A single routing entry and its match/build behaviour.

use super::adapter::MapAdapter;
use super::converters::quote;
use super::error::RuleError;
use super::map::{Map, MapConfig};
use super::pattern::{compile, CompiledPattern, PatternSpec, TraceItem, Weights, SUFFIX_GROUP};
use super::value::{Value, Values};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// `<name>` placeholders inside a redirect template.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>]+)>").expect("placeholder regex is valid"));

/// Computes a redirect location from the adapter and the matched values.
pub type RedirectCallback = Arc<dyn Fn(&MapAdapter, &Values) -> String + Send + Sync>;

/// Where a matching request is sent instead of being dispatched.
#[derive(Clone)]
pub enum RedirectTarget {
    /// URL template; `<name>` placeholders are replaced with the serialized
    /// matched values. Relative targets resolve against the script root.
    Template(String),
    /// Arbitrary computation of the target.
    Callback(RedirectCallback),
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Template(t) => f.debug_tuple("Template").field(t).finish(),
            RedirectTarget::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Result of testing one rule against a lookup key.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMatch {
    /// The pattern does not match, or a converter rejected a segment.
    NoMatch,
    /// The path matches except for the trailing slash the rule requires.
    MissingSlash,
    /// Matched; values include the rule's defaults.
    Matched(Values),
}

/// Total match order. Ascending is tried first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MatchKey {
    weights: Reverse<Weights>,
    segments: Reverse<usize>,
    has_variables: bool,
    lacks_defaults: bool,
    greediness: usize,
    variables: usize,
    rule: String,
    subdomain: String,
    methods: Vec<String>,
    endpoint: String,
}

#[derive(Debug)]
struct BoundRule {
    subdomain: String,
    strict_slashes: bool,
    pattern: CompiledPattern,
    match_key: MatchKey,
}

/// One routing entry: a template, the endpoint it resolves to, and the
/// constraints under which it applies.
///
/// Rules are declared with a builder and become usable once added to a
/// [`Map`], which binds them:
///
/// ```
/// use http::Method;
/// use routemap::router::{Map, Rule};
/// use routemap::values;
///
/// let mut map = Map::new();
/// map.add(Rule::new("/all/", "all").defaults(values! { "page" => 1 })).unwrap();
/// map.add(Rule::new("/all/page/<int:page>", "all").methods([Method::GET])).unwrap();
/// ```
#[derive(Clone)]
pub struct Rule {
    pub(crate) rule: String,
    pub(crate) endpoint: String,
    pub(crate) defaults: Option<Values>,
    pub(crate) subdomain: Option<String>,
    pub(crate) methods: Option<Vec<Method>>,
    pub(crate) build_only: bool,
    pub(crate) strict_slashes: Option<bool>,
    pub(crate) redirect_to: Option<RedirectTarget>,
    pub(crate) alias: bool,
    arguments: BTreeSet<String>,
    bound: Option<Arc<BoundRule>>,
}

impl Rule {
    /// Declare a rule for `endpoint`. Nothing is validated until binding.
    pub fn new(rule: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            endpoint: endpoint.into(),
            defaults: None,
            subdomain: None,
            methods: None,
            build_only: false,
            strict_slashes: None,
            redirect_to: None,
            alias: false,
            arguments: BTreeSet::new(),
            bound: None,
        }
    }

    /// Values merged into every match and used to pick canonical URLs.
    #[must_use]
    pub fn defaults(mut self, defaults: Values) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Restrict the rule to these methods. `HEAD` is added when `GET` is
    /// present. An empty list means "all methods".
    #[must_use]
    pub fn methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.methods = normalize_methods(methods);
        self
    }

    /// Subdomain template this rule lives on (may contain variables).
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Override the table's strict-slashes policy for this rule.
    #[must_use]
    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = Some(strict);
        self
    }

    /// Only used for building; never matches.
    #[must_use]
    pub fn build_only(mut self, build_only: bool) -> Self {
        self.build_only = build_only;
        self
    }

    /// Redirect matching requests instead of returning the endpoint.
    #[must_use]
    pub fn redirect_to(mut self, target: RedirectTarget) -> Self {
        self.redirect_to = Some(target);
        self
    }

    /// Shorthand for a [`RedirectTarget::Template`].
    #[must_use]
    pub fn redirect_to_template(self, template: impl Into<String>) -> Self {
        self.redirect_to(RedirectTarget::Template(template.into()))
    }

    /// Shorthand for a [`RedirectTarget::Callback`].
    #[must_use]
    pub fn redirect_to_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&MapAdapter, &Values) -> String + Send + Sync + 'static,
    {
        self.redirect_to(RedirectTarget::Callback(Arc::new(callback)))
    }

    /// Mark the rule as an alias: it matches, but with canonical-defaults
    /// redirection enabled the request is redirected to the URL the endpoint
    /// builds to. Aliases are tried last when building.
    #[must_use]
    pub fn alias(mut self, alias: bool) -> Self {
        self.alias = alias;
        self
    }

    /// Unbound copy carrying the same declaration.
    #[must_use]
    pub fn empty(&self) -> Self {
        Self {
            arguments: BTreeSet::new(),
            bound: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn get_defaults(&self) -> Option<&Values> {
        self.defaults.as_ref()
    }

    #[must_use]
    pub fn get_methods(&self) -> Option<&[Method]> {
        self.methods.as_deref()
    }

    /// Declared subdomain template, if any.
    #[must_use]
    pub fn get_subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    #[must_use]
    pub fn get_redirect_to(&self) -> Option<&RedirectTarget> {
        self.redirect_to.as_ref()
    }

    #[must_use]
    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.alias
    }

    /// A leaf rule does not end in `/`.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !self.rule.ends_with('/')
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Subdomain after binding (the table default if none was declared).
    #[must_use]
    pub fn bound_subdomain(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.subdomain.as_str())
    }

    /// Variable names and default keys. Complete only after binding.
    #[must_use]
    pub fn arguments(&self) -> &BTreeSet<String> {
        &self.arguments
    }

    /// Bind the rule to `map`'s configuration. A rule binds exactly once.
    ///
    /// [`Map::add`] calls this; binding by hand is only useful to validate a
    /// rule ahead of time.
    pub fn bind(&mut self, map: &Map) -> Result<(), RuleError> {
        self.bind_with(map.config())
    }

    pub(crate) fn bind_with(&mut self, config: &MapConfig) -> Result<(), RuleError> {
        if self.bound.is_some() {
            return Err(RuleError::AlreadyBound {
                rule: self.rule.clone(),
            });
        }
        if !self.rule.starts_with('/') {
            return Err(RuleError::MissingLeadingSlash {
                rule: self.rule.clone(),
            });
        }

        let subdomain = self
            .subdomain
            .clone()
            .unwrap_or_else(|| config.default_subdomain.clone());
        let strict_slashes = self.strict_slashes.unwrap_or(config.strict_slashes);
        let pattern = compile(
            &PatternSpec {
                rule: &self.rule,
                subdomain: &subdomain,
                is_leaf: self.is_leaf(),
                strict_slashes,
                build_only: self.build_only,
            },
            &config.converters,
        )?;

        let mut arguments: BTreeSet<String> = self
            .defaults
            .iter()
            .flat_map(|d| d.keys().cloned())
            .collect();
        arguments.extend(pattern.variables().map(str::to_string));

        if let Some(RedirectTarget::Template(template)) = &self.redirect_to {
            for caps in PLACEHOLDER.captures_iter(template) {
                let name = &caps[1];
                if !arguments.contains(name) {
                    return Err(RuleError::UnknownRedirectVariable {
                        rule: self.rule.clone(),
                        variable: name.to_string(),
                    });
                }
            }
        }

        let variables = pattern.converters.len();
        let match_key = MatchKey {
            weights: Reverse(pattern.weights.clone()),
            segments: Reverse(self.rule.matches('/').count()),
            has_variables: variables > 0,
            lacks_defaults: self.defaults.as_ref().is_none_or(|d| d.is_empty()),
            greediness: pattern.greediness,
            variables,
            rule: self.rule.clone(),
            subdomain: subdomain.clone(),
            methods: self
                .methods
                .iter()
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect(),
            endpoint: self.endpoint.clone(),
        };

        self.arguments = arguments;
        self.bound = Some(Arc::new(BoundRule {
            subdomain,
            strict_slashes,
            pattern,
            match_key,
        }));
        Ok(())
    }

    pub(crate) fn match_key(&self) -> Option<&MatchKey> {
        self.bound.as_ref().map(|b| &b.match_key)
    }

    /// Whether `method` passes this rule's method restriction.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods
            .as_ref()
            .is_none_or(|methods| methods.contains(method))
    }

    /// Test the lookup key `subdomain|/path` against this rule.
    ///
    /// `method` only affects the trailing-slash check: a rule that would not
    /// accept the method never asks for a slash redirect. `None` disables the
    /// check entirely.
    #[must_use]
    pub fn match_path(&self, key: &str, method: Option<&Method>) -> RuleMatch {
        let Some(bound) = &self.bound else {
            return RuleMatch::NoMatch;
        };
        let Some(regex) = &bound.pattern.regex else {
            return RuleMatch::NoMatch;
        };
        let Some(caps) = regex.captures(key) else {
            return RuleMatch::NoMatch;
        };

        let mut values = Values::new();
        for (name, converter) in &bound.pattern.converters {
            let raw = caps.name(name).map_or("", |m| m.as_str());
            let Ok(decoded) = urlencoding::decode(raw) else {
                return RuleMatch::NoMatch;
            };
            let Some(value) = converter.parse(&decoded) else {
                return RuleMatch::NoMatch;
            };
            values.insert(name.clone(), value);
        }

        if bound.strict_slashes && !self.is_leaf() {
            let has_slash = caps
                .name(SUFFIX_GROUP)
                .is_some_and(|m| !m.as_str().is_empty());
            if !has_slash && method.is_some_and(|m| self.allows(m)) {
                return RuleMatch::MissingSlash;
            }
        }

        if let Some(defaults) = &self.defaults {
            values.extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        RuleMatch::Matched(values)
    }

    /// Whether this rule can build a URL from `values` for `method`.
    ///
    /// Every argument must be supplied or defaulted, and supplied values must
    /// agree with declared defaults.
    #[must_use]
    pub fn suitable_for(&self, values: &Values, method: Option<&Method>) -> bool {
        if method.is_some_and(|m| !self.allows(m)) {
            return false;
        }
        let defaults = self.defaults.as_ref();
        let all_present = self.arguments.iter().all(|key| {
            values.contains_key(key) || defaults.is_some_and(|d| d.contains_key(key))
        });
        if !all_present {
            return false;
        }
        defaults.is_none_or(|d| {
            d.iter()
                .all(|(key, default)| values.get(key).is_none_or(|v| v == default))
        })
    }

    /// Whether this rule is the canonical form of `other`: same endpoint,
    /// same argument set, and it declares defaults.
    #[must_use]
    pub fn provides_defaults_for(&self, other: &Rule) -> bool {
        let same_rule = match (&self.bound, &other.bound) {
            (Some(a), Some(b)) => a.pattern.trace == b.pattern.trace,
            _ => false,
        };
        !self.build_only
            && self.defaults.as_ref().is_some_and(|d| !d.is_empty())
            && self.endpoint == other.endpoint
            && !same_rule
            && self.arguments == other.arguments
    }

    /// Build `(domain part, path)` from `values`.
    ///
    /// Keys not consumed by the rule become a query string when
    /// `append_unknown` is set. `None` if a converter rejects a value.
    #[must_use]
    pub fn build(&self, values: &Values, append_unknown: bool) -> Option<(String, String)> {
        let bound = self.bound.as_ref()?;
        let mut out = String::with_capacity(self.rule.len() + 16);

        for item in &bound.pattern.trace {
            match item {
                TraceItem::Literal(text) => out.push_str(text),
                TraceItem::Variable(name) => {
                    let value = values
                        .get(name)
                        .or_else(|| self.defaults.as_ref().and_then(|d| d.get(name)))?;
                    let converter = bound.pattern.converter(name)?;
                    out.push_str(&converter.serialize(value)?);
                }
            }
        }

        let (domain, path) = out.split_once('|')?;
        let mut path = path.to_string();

        if append_unknown {
            let unknown: Vec<(&String, &Value)> = values
                .iter()
                .filter(|(k, _)| !self.arguments.contains(*k))
                .collect();
            if !unknown.is_empty() {
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in unknown {
                    query.append_pair(key, &value.to_string());
                }
                path.push('?');
                path.push_str(&query.finish());
            }
        }
        Some((domain.to_string(), path))
    }

    /// Serialize one matched value the way this rule would put it in a URL.
    pub(crate) fn serialize_value(&self, name: &str, value: &Value) -> String {
        self.bound
            .as_ref()
            .and_then(|b| b.pattern.converter(name))
            .and_then(|c| c.serialize(value))
            .unwrap_or_else(|| quote(&value.to_string(), false))
    }

    /// Substitute `<name>` placeholders of a redirect template.
    pub(crate) fn render_redirect_template(&self, template: &str, values: &Values) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures<'_>| {
                values
                    .get(&caps[1])
                    .map(|v| self.serialize_value(&caps[1], v))
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn normalize_methods<I>(methods: I) -> Option<Vec<Method>>
where
    I: IntoIterator<Item = Method>,
{
    let mut methods: Vec<Method> = methods.into_iter().collect();
    if methods.is_empty() {
        return None;
    }
    if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
        methods.push(Method::HEAD);
    }
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods.dedup();
    Some(methods)
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("rule", &self.rule)
            .field("endpoint", &self.endpoint)
            .field("methods", &self.methods)
            .field("subdomain", &self.subdomain)
            .field("defaults", &self.defaults)
            .field("build_only", &self.build_only)
            .field("redirect_to", &self.redirect_to)
            .field("alias", &self.alias)
            .field("bound", &self.is_bound())
            .finish()
    }
}
