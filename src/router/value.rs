//! Typed parameter values produced by converters and consumed by URL building.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Parameter map passed into and out of the router.
///
/// Ordered by key so that query strings appended during building are stable.
pub type Values = BTreeMap<String, Value>;

/// A single parameter value.
///
/// Converters parse URL segments into one of these variants and serialize them
/// back. Defaults declared on rules use the same type, which is what lets
/// `suitable_for` compare a supplied value against a declared default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Free text (the `default`, `string`, `any` and `path` converters)
    String(String),
    /// Signed integer (the `int` converter)
    Integer(i64),
    /// Floating point number (the `float` converter)
    Float(f64),
    /// UUID (the `uuid` converter)
    Uuid(Uuid),
}

impl Value {
    /// Borrow the inner text if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer.
    ///
    /// Strings are parsed so that values coming from query strings or route
    /// files can still build numeric segments.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::String(s) => s.parse().ok(),
            Value::Float(_) | Value::Uuid(_) => None,
        }
    }

    /// Interpret the value as a float. Integers widen.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.parse().ok(),
            Value::Uuid(_) => None,
        }
    }

    /// Interpret the value as a UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            Value::String(s) => Uuid::parse_str(s).ok(),
            Value::Integer(_) | Value::Float(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

/// Build a [`Values`] map from `key => value` pairs.
///
/// ```
/// use routemap::values;
/// let v = values! { "id" => 42, "slug" => "intro" };
/// assert_eq!(v.len(), 2);
/// ```
#[macro_export]
macro_rules! values {
    () => { $crate::router::Values::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::router::Values::new();
        $( map.insert(::std::string::String::from($key), $crate::router::Value::from($value)); )+
        map
    }};
}
