use crate::router::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// Top level of a route file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    #[serde(default = "default_true")]
    pub strict_slashes: bool,
    #[serde(default = "default_true")]
    pub redirect_defaults: bool,
    #[serde(default)]
    pub default_subdomain: String,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
    #[serde(default)]
    pub groups: Vec<GroupDecl>,
}

impl Default for RouteFile {
    fn default() -> Self {
        Self {
            strict_slashes: true,
            redirect_defaults: true,
            default_subdomain: String::new(),
            rules: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// One rule as written in a route file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    pub rule: String,
    pub endpoint: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, DefaultValue>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub strict_slashes: Option<bool>,
    #[serde(default)]
    pub build_only: bool,
    #[serde(default)]
    pub redirect_to: Option<String>,
    #[serde(default)]
    pub alias: bool,
}

/// Scalar default value. Integers are tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<DefaultValue> for Value {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Integer(i) => Value::Integer(i),
            DefaultValue::Float(f) => Value::Float(f),
            DefaultValue::String(s) => Value::String(s),
        }
    }
}

/// Rules sharing a path prefix, subdomain or endpoint prefix. Groups nest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDecl {
    #[serde(default)]
    pub submount: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub endpoint_prefix: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
    #[serde(default)]
    pub groups: Vec<GroupDecl>,
}
