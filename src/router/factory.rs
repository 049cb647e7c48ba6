//! Rule factories: ways of declaring groups of rules that flatten into
//! concrete [`Rule`]s when added to a [`Map`](super::Map).
//!
//! ```
//! use routemap::router::{EndpointPrefix, Map, Rule, Submount, Subdomain};
//!
//! let mut map = Map::new();
//! map.add(
//!     Subdomain::new("blog").rule(
//!         EndpointPrefix::new("blog/").rule(
//!             Submount::new("/archive")
//!                 .rule(Rule::new("/", "index"))
//!                 .rule(Rule::new("/<int:year>/", "year")),
//!         ),
//!     ),
//! )
//! .unwrap();
//! ```

use super::error::RuleError;
use super::rule::Rule;
use super::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Anything that can produce rules for a map.
pub trait RuleFactory: Send + Sync {
    /// Fresh, unbound rules. Called once per `add`.
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError>;
}

impl RuleFactory for Rule {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        Ok(vec![self.clone()])
    }
}

impl<T: RuleFactory + ?Sized> RuleFactory for Box<T> {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        (**self).get_rules()
    }
}

impl<T: RuleFactory + ?Sized> RuleFactory for Arc<T> {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        (**self).get_rules()
    }
}

impl<T: RuleFactory> RuleFactory for Vec<T> {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        collect(self.iter())
    }
}

fn collect<'a, I, T>(factories: I) -> Result<Vec<Rule>, RuleError>
where
    I: IntoIterator<Item = &'a T>,
    T: RuleFactory + ?Sized + 'a,
{
    let mut rules = Vec::new();
    for factory in factories {
        rules.extend(factory.get_rules()?);
    }
    Ok(rules)
}

/// Nested factories, boxed so that groups can mix rules and other groups.
type Children = Vec<Box<dyn RuleFactory>>;

/// Place every nested rule on one subdomain.
pub struct Subdomain {
    subdomain: String,
    rules: Children,
}

impl Subdomain {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, factory: impl RuleFactory + 'static) -> Self {
        self.rules.push(Box::new(factory));
        self
    }
}

impl RuleFactory for Subdomain {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        collect(self.rules.iter())?
            .into_iter()
            .map(|rule| {
                let mut rule = rule.empty();
                rule.subdomain = Some(self.subdomain.clone());
                Ok(rule)
            })
            .collect()
    }
}

/// Prefix every nested rule's path.
pub struct Submount {
    path: String,
    rules: Children,
}

impl Submount {
    /// Trailing slashes of `path` are dropped before joining.
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            path: path.trim_end_matches('/').to_string(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, factory: impl RuleFactory + 'static) -> Self {
        self.rules.push(Box::new(factory));
        self
    }
}

impl RuleFactory for Submount {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        collect(self.rules.iter())?
            .into_iter()
            .map(|rule| {
                let mut rule = rule.empty();
                rule.rule = format!("{}{}", self.path, rule.rule);
                Ok(rule)
            })
            .collect()
    }
}

/// Prefix every nested rule's endpoint.
pub struct EndpointPrefix {
    prefix: String,
    rules: Children,
}

impl EndpointPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, factory: impl RuleFactory + 'static) -> Self {
        self.rules.push(Box::new(factory));
        self
    }
}

impl RuleFactory for EndpointPrefix {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        collect(self.rules.iter())?
            .into_iter()
            .map(|rule| {
                let mut rule = rule.empty();
                rule.endpoint = format!("{}{}", self.prefix, rule.endpoint);
                Ok(rule)
            })
            .collect()
    }
}

/// A reusable group of rules with `$name` / `${name}` placeholders in rule
/// strings, endpoints, subdomains and string defaults. `$$` is a literal `$`.
///
/// ```
/// use routemap::router::{Map, Rule, RuleTemplate};
///
/// let resource = RuleTemplate::new()
///     .rule(Rule::new("/$name/", "$name.list"))
///     .rule(Rule::new("/$name/<int:id>", "$name.show"));
///
/// let mut map = Map::new();
/// map.add(resource.apply([("name", "users")])).unwrap();
/// map.add(resource.apply([("name", "groups")])).unwrap();
/// assert_eq!(map.rule_count(), 4);
/// ```
#[derive(Clone, Default)]
pub struct RuleTemplate {
    rules: Arc<Vec<Box<dyn RuleFactory>>>,
}

impl RuleTemplate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule or factory. Call before the template is shared.
    #[must_use]
    pub fn rule(mut self, factory: impl RuleFactory + 'static) -> Self {
        let mut rules: Vec<Box<dyn RuleFactory>> = match Arc::try_unwrap(self.rules) {
            Ok(rules) => rules,
            Err(shared) => {
                // Already applied somewhere: start a fresh list holding the shared one.
                vec![Box::new(shared) as Box<dyn RuleFactory>]
            }
        };
        rules.push(Box::new(factory));
        self.rules = Arc::new(rules);
        self
    }

    /// Instantiate the template with `context`.
    pub fn apply<I, K, V>(&self, context: I) -> RuleTemplateFactory
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RuleTemplateFactory {
            rules: Arc::clone(&self.rules),
            context: context
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A [`RuleTemplate`] bound to its substitution context.
pub struct RuleTemplateFactory {
    rules: Arc<Vec<Box<dyn RuleFactory>>>,
    context: HashMap<String, String>,
}

impl RuleFactory for RuleTemplateFactory {
    fn get_rules(&self) -> Result<Vec<Rule>, RuleError> {
        let mut out = Vec::new();
        for rule in collect(self.rules.iter())? {
            let mut rule = rule.empty();
            rule.rule = substitute(&rule.rule, &self.context)?;
            rule.endpoint = substitute(&rule.endpoint, &self.context)?;
            if let Some(subdomain) = &rule.subdomain {
                rule.subdomain = Some(substitute(subdomain, &self.context)?);
            }
            if let Some(defaults) = rule.defaults.take() {
                let mut substituted = defaults.clone();
                for (key, value) in &defaults {
                    if let Value::String(text) = value {
                        substituted.insert(
                            key.clone(),
                            Value::String(substitute(text, &self.context)?),
                        );
                    }
                }
                rule.defaults = Some(substituted);
            }
            out.push(rule);
        }
        Ok(out)
    }
}

/// Replace `$name`, `${name}` and `$$` in `template`.
pub fn substitute(template: &str, context: &HashMap<String, String>) -> Result<String, RuleError> {
    let missing = |variable: &str| RuleError::MissingTemplateVariable {
        template: template.to_string(),
        variable: variable.to_string(),
    };
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            let close = braced.find('}').ok_or_else(|| missing(braced))?;
            let name = &braced[..close];
            out.push_str(context.get(name).ok_or_else(|| missing(name))?);
            rest = &braced[close + 1..];
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() {
                // A lone `$` is kept as written.
                out.push('$');
            } else {
                out.push_str(context.get(name).ok_or_else(|| missing(name))?);
            }
            rest = &after[end..];
        }
    }
    out.push_str(rest);
    Ok(out)
}
