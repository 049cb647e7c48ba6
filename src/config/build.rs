use super::types::{GroupDecl, RouteFile, RuleDecl};
use crate::router::{
    EndpointPrefix, Map, MapConfig, Rule, RuleFactory, Subdomain, Submount, Values,
};
use anyhow::{bail, Context};
use http::Method;

impl RouteFile {
    /// Bind every declared rule and group into a fresh [`Map`].
    pub fn into_map(self) -> anyhow::Result<Map> {
        let mut map = Map::with_config(MapConfig {
            default_subdomain: self.default_subdomain,
            strict_slashes: self.strict_slashes,
            redirect_defaults: self.redirect_defaults,
            ..MapConfig::default()
        });

        for decl in &self.rules {
            map.add(decl.to_rule()?)
                .with_context(|| format!("invalid rule '{}' ({})", decl.rule, decl.endpoint))?;
        }
        for (index, group) in self.groups.iter().enumerate() {
            map.add(group.to_factory()?)
                .with_context(|| format!("invalid rule in group #{index}"))?;
        }
        Ok(map)
    }
}

impl RuleDecl {
    /// The declared rule, not yet bound.
    pub fn to_rule(&self) -> anyhow::Result<Rule> {
        let methods = self
            .methods
            .iter()
            .map(|m| parse_method(m))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("rule '{}'", self.rule))?;

        let mut rule = Rule::new(self.rule.as_str(), self.endpoint.as_str())
            .methods(methods)
            .build_only(self.build_only)
            .alias(self.alias);
        if !self.defaults.is_empty() {
            let defaults: Values = self
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect();
            rule = rule.defaults(defaults);
        }
        if let Some(subdomain) = &self.subdomain {
            rule = rule.subdomain(subdomain.as_str());
        }
        if let Some(strict) = self.strict_slashes {
            rule = rule.strict_slashes(strict);
        }
        if let Some(target) = &self.redirect_to {
            rule = rule.redirect_to_template(target.as_str());
        }
        Ok(rule)
    }
}

impl GroupDecl {
    /// Nested rules and groups wrapped in the group's factories.
    pub fn to_factory(&self) -> anyhow::Result<Box<dyn RuleFactory>> {
        let mut children: Vec<Box<dyn RuleFactory>> = Vec::new();
        for decl in &self.rules {
            children.push(Box::new(decl.to_rule()?));
        }
        for group in &self.groups {
            children.push(group.to_factory()?);
        }

        let mut factory: Box<dyn RuleFactory> = Box::new(children);
        if let Some(path) = &self.submount {
            factory = Box::new(Submount::new(path.as_str()).rule(factory));
        }
        if let Some(prefix) = &self.endpoint_prefix {
            factory = Box::new(EndpointPrefix::new(prefix.as_str()).rule(factory));
        }
        if let Some(subdomain) = &self.subdomain {
            factory = Box::new(Subdomain::new(subdomain.as_str()).rule(factory));
        }
        Ok(factory)
    }
}

/// Case-insensitive HTTP method name.
pub(crate) fn parse_method(name: &str) -> anyhow::Result<Method> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() {
        bail!("empty method name");
    }
    Method::from_bytes(upper.as_bytes()).with_context(|| format!("invalid method '{name}'"))
}
