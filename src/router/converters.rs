//! Per-segment type converters.
//!
//! A converter owns three things for one variable of a rule: the regex
//! fragment spliced into the compiled rule, a `parse` step turning the matched
//! (percent-decoded) text into a [`Value`], and a `serialize` step turning a
//! [`Value`] back into URL text. Either step returning `None` is a local
//! rejection: the rule does not match, or the rule cannot build, and the
//! caller moves on to the next candidate.
//!
//! Built-in converters are registered under these names:
//!
//! | name               | fragment                    | weight | greedy |
//! |--------------------|-----------------------------|--------|--------|
//! | `default`/`string` | `[^/]+`                     | 100    | no     |
//! | `any`              | `(?:a\|b\|c)`               | 150    | no     |
//! | `path`             | `[^/].*?`                   | 50     | yes    |
//! | `int`              | `\d+`                       | 150    | no     |
//! | `float`            | `\d+\.\d+`                  | 150    | no     |
//! | `uuid`             | 8-4-4-4-12 hex              | 150    | no     |
//!
//! Heavier converters are tried first when rules otherwise tie.

use super::args::{ConverterArg, ConverterArgs};
use super::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Weight of an ordinary single-segment converter.
pub const DEFAULT_WEIGHT: u32 = 100;
/// Weight of converters narrower than a free string (numbers, enumerations, uuids).
pub const NARROW_WEIGHT: u32 = 150;
/// Weight of the greedy `path` converter.
pub const GREEDY_WEIGHT: u32 = 50;

/// One variable's matching, parsing and serialization behaviour.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Regex fragment matched against the raw (still percent-encoded) path.
    /// Must not contain capturing groups.
    fn regex(&self) -> &str;

    /// Ranking weight; heavier converters are more specific.
    fn weight(&self) -> u32 {
        DEFAULT_WEIGHT
    }

    /// Whether the fragment can match across `/`.
    fn is_greedy(&self) -> bool {
        false
    }

    /// Turn a matched, percent-decoded segment into a value.
    fn parse(&self, segment: &str) -> Option<Value>;

    /// Turn a value into percent-encoded URL text.
    fn serialize(&self, value: &Value) -> Option<String>;
}

/// Constructor for a converter given its parsed argument list.
pub type ConverterFactory =
    Arc<dyn Fn(&ConverterArgs) -> Result<Arc<dyn Converter>, String> + Send + Sync>;

/// Immutable name → converter-constructor table owned by a routing table.
///
/// There is no process-wide registry: each [`MapConfig`](super::MapConfig)
/// carries its own, seeded with the built-ins.
#[derive(Clone)]
pub struct ConverterRegistry {
    factories: HashMap<String, ConverterFactory>,
}

impl ConverterRegistry {
    /// Registry containing only the built-in converters.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("default", |args| Ok(Arc::new(StringConverter::from_args(args)?)));
        registry.register("string", |args| Ok(Arc::new(StringConverter::from_args(args)?)));
        registry.register("any", |args| Ok(Arc::new(AnyConverter::from_args(args)?)));
        registry.register("path", |args| Ok(Arc::new(PathConverter::from_args(args)?)));
        registry.register("int", |args| Ok(Arc::new(IntegerConverter::from_args(args)?)));
        registry.register("float", |args| Ok(Arc::new(FloatConverter::from_args(args)?)));
        registry.register("uuid", |args| Ok(Arc::new(UuidConverter::from_args(args)?)));
        registry
    }

    /// Register (or replace) a converter under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ConverterArgs) -> Result<Arc<dyn Converter>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&ConverterArgs) -> Result<Arc<dyn Converter>, String> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the converter `name`. `Ok(None)` means the name is unknown.
    pub fn create(
        &self,
        name: &str,
        args: &ConverterArgs,
    ) -> Result<Option<Arc<dyn Converter>>, String> {
        match self.factories.get(name) {
            Some(factory) => factory(args).map(Some),
            None => Ok(None),
        }
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("names", &self.names())
            .finish()
    }
}

const PCHAR_EXTRA: &[u8] = b"-._~!$&'()*+,;=:@";

fn is_pchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || PCHAR_EXTRA.contains(&b)
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn push_escaped(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('%');
    out.push(char::from(HEX[usize::from(b >> 4)]));
    out.push(char::from(HEX[usize::from(b & 0x0F)]));
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-encode everything outside the RFC 3986 `pchar` set.
/// `/` is kept only when `keep_slash` is set.
#[must_use]
pub fn quote(text: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for &b in text.as_bytes() {
        if is_pchar(b) || (keep_slash && b == b'/') {
            out.push(char::from(b));
        } else {
            push_escaped(&mut out, b);
        }
    }
    out
}

/// Bring an incoming path into the form [`quote`] produces.
///
/// Bytes that cannot appear in a path are escaped, existing escapes get
/// uppercase hex, and escaped unreserved characters are decoded. Escaped
/// delimiters such as `%2F` stay escaped. A `%` not followed by two hex
/// digits is kept as is.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len() + 8);
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let escaped = bytes
                .get(i + 1)
                .and_then(|&h| hex_value(h))
                .zip(bytes.get(i + 2).and_then(|&l| hex_value(l)));
            if let Some((high, low)) = escaped {
                let decoded = (high << 4) | low;
                if is_unreserved(decoded) {
                    out.push(char::from(decoded));
                } else {
                    push_escaped(&mut out, decoded);
                }
                i += 3;
                continue;
            }
            out.push('%');
        } else if is_pchar(b) || b == b'/' {
            out.push(char::from(b));
        } else {
            push_escaped(&mut out, b);
        }
        i += 1;
    }
    out
}

fn optional_usize(args: &ConverterArgs, name: &str, position: usize) -> Result<Option<usize>, String> {
    match args.get(name, position) {
        None | Some(ConverterArg::None) => Ok(None),
        Some(arg) => arg
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| format!("{name} must be a non-negative integer, got {arg}")),
    }
}

fn optional_i64(args: &ConverterArgs, name: &str, position: usize) -> Result<Option<i64>, String> {
    match args.get(name, position) {
        None | Some(ConverterArg::None) => Ok(None),
        Some(arg) => arg
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{name} must be an integer, got {arg}")),
    }
}

fn optional_f64(args: &ConverterArgs, name: &str, position: usize) -> Result<Option<f64>, String> {
    match args.get(name, position) {
        None | Some(ConverterArg::None) => Ok(None),
        Some(arg) => arg
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{name} must be a number, got {arg}")),
    }
}

fn flag(args: &ConverterArgs, name: &str, position: usize) -> Result<bool, String> {
    match args.get(name, position) {
        None | Some(ConverterArg::None) => Ok(false),
        Some(ConverterArg::Bool(b)) => Ok(*b),
        Some(arg) => Err(format!("{name} must be true or false, got {arg}")),
    }
}

/// Single-segment string with optional length bounds.
///
/// Arguments: `minlength` (default 1), `maxlength`, `length`. Bounds count
/// characters of the decoded value, not of its escaped form.
#[derive(Debug, Clone)]
pub struct StringConverter {
    min: usize,
    max: Option<usize>,
    regex: String,
}

impl StringConverter {
    pub fn new(minlength: usize, maxlength: Option<usize>, length: Option<usize>) -> Self {
        let (min, max) = match length {
            Some(n) => (n, Some(n)),
            None => (minlength, maxlength),
        };
        let regex = if min == 0 { "[^/]*" } else { "[^/]+" }.to_string();
        Self { min, max, regex }
    }

    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        args.expect_only(&["minlength", "maxlength", "length"], 3)?;
        let min = optional_usize(args, "minlength", 0)?.unwrap_or(1);
        let max = optional_usize(args, "maxlength", 1)?;
        let length = optional_usize(args, "length", 2)?;
        if max.is_some_and(|max| max < min) {
            return Err(format!("maxlength is smaller than minlength {min}"));
        }
        Ok(Self::new(min, max, length))
    }

    fn fits(&self, text: &str) -> bool {
        let len = text.chars().count();
        len >= self.min && self.max.map_or(true, |max| len <= max)
    }
}

impl Converter for StringConverter {
    fn regex(&self) -> &str {
        &self.regex
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        self.fits(segment)
            .then(|| Value::String(segment.to_string()))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        let text = value.to_string();
        self.fits(&text).then(|| quote(&text, false))
    }
}

/// One of a fixed set of literal values: `<any(about, help):page>`.
#[derive(Debug, Clone)]
pub struct AnyConverter {
    items: Vec<String>,
    regex: String,
}

impl AnyConverter {
    pub fn new<I, S>(items: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err("any() needs at least one item".to_string());
        }
        let alternatives: Vec<String> = items
            .iter()
            .map(|item| regex::escape(&quote(item, false)))
            .collect();
        let regex = format!("(?:{})", alternatives.join("|"));
        Ok(Self { items, regex })
    }

    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        if !args.keyword.is_empty() {
            return Err("any() takes positional items only".to_string());
        }
        let items = args
            .positional
            .iter()
            .map(|arg| arg.as_text().ok_or_else(|| format!("invalid any() item {arg}")))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(items)
    }
}

impl Converter for AnyConverter {
    fn regex(&self) -> &str {
        &self.regex
    }

    fn weight(&self) -> u32 {
        NARROW_WEIGHT
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        self.items
            .iter()
            .any(|item| item == segment)
            .then(|| Value::String(segment.to_string()))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        let text = value.to_string();
        self.items
            .iter()
            .any(|item| *item == text)
            .then(|| quote(&text, false))
    }
}

/// Rest of the path, slashes included. Greedy and light so that specific
/// rules sharing its prefix are tried first.
#[derive(Debug, Clone, Default)]
pub struct PathConverter;

impl PathConverter {
    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        if !args.is_empty() {
            return Err("path takes no arguments".to_string());
        }
        Ok(Self)
    }
}

impl Converter for PathConverter {
    fn regex(&self) -> &str {
        "[^/].*?"
    }

    fn weight(&self) -> u32 {
        GREEDY_WEIGHT
    }

    fn is_greedy(&self) -> bool {
        true
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        Some(Value::String(segment.to_string()))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        let text = value.to_string();
        if text.is_empty() || text.starts_with('/') {
            return None;
        }
        Some(quote(&text, true))
    }
}

/// Unsigned (or, with `signed=true`, signed) integer.
///
/// Arguments: `fixed_digits` (zero-pads on build and requires exactly that
/// many digits on match), `min`, `max`, `signed`.
#[derive(Debug, Clone, Default)]
pub struct IntegerConverter {
    fixed_digits: usize,
    min: Option<i64>,
    max: Option<i64>,
    signed: bool,
}

impl IntegerConverter {
    pub fn new(fixed_digits: usize, min: Option<i64>, max: Option<i64>, signed: bool) -> Self {
        Self {
            fixed_digits,
            min,
            max,
            signed,
        }
    }

    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        args.expect_only(&["fixed_digits", "min", "max", "signed"], 4)?;
        Ok(Self::new(
            optional_usize(args, "fixed_digits", 0)?.unwrap_or(0),
            optional_i64(args, "min", 1)?,
            optional_i64(args, "max", 2)?,
            flag(args, "signed", 3)?,
        ))
    }

    fn in_bounds(&self, value: i64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

impl Converter for IntegerConverter {
    fn regex(&self) -> &str {
        if self.signed {
            r"-?\d+"
        } else {
            r"\d+"
        }
    }

    fn weight(&self) -> u32 {
        NARROW_WEIGHT
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        let digits = segment.trim_start_matches('-');
        if self.fixed_digits > 0 && digits.len() != self.fixed_digits {
            return None;
        }
        let value: i64 = segment.parse().ok()?;
        self.in_bounds(value).then_some(Value::Integer(value))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        let value = value.as_i64()?;
        if !self.in_bounds(value) || (value < 0 && !self.signed) {
            return None;
        }
        let digits = format!("{:0width$}", value.unsigned_abs(), width = self.fixed_digits);
        if self.fixed_digits > 0 && digits.len() != self.fixed_digits {
            return None;
        }
        Some(if value < 0 { format!("-{digits}") } else { digits })
    }
}

/// Decimal number with a mandatory fractional part.
///
/// Arguments: `min`, `max`, `signed`.
#[derive(Debug, Clone, Default)]
pub struct FloatConverter {
    min: Option<f64>,
    max: Option<f64>,
    signed: bool,
}

impl FloatConverter {
    pub fn new(min: Option<f64>, max: Option<f64>, signed: bool) -> Self {
        Self { min, max, signed }
    }

    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        args.expect_only(&["min", "max", "signed"], 3)?;
        Ok(Self::new(
            optional_f64(args, "min", 0)?,
            optional_f64(args, "max", 1)?,
            flag(args, "signed", 2)?,
        ))
    }

    fn in_bounds(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

impl Converter for FloatConverter {
    fn regex(&self) -> &str {
        if self.signed {
            r"-?\d+\.\d+"
        } else {
            r"\d+\.\d+"
        }
    }

    fn weight(&self) -> u32 {
        NARROW_WEIGHT
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        let value: f64 = segment.parse().ok()?;
        self.in_bounds(value).then_some(Value::Float(value))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        let value = value.as_f64()?;
        if !value.is_finite() || !self.in_bounds(value) || (value < 0.0 && !self.signed) {
            return None;
        }
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        Some(text)
    }
}

/// Hyphenated UUID in any letter case; always built lowercase.
#[derive(Debug, Clone, Default)]
pub struct UuidConverter;

impl UuidConverter {
    fn from_args(args: &ConverterArgs) -> Result<Self, String> {
        if !args.is_empty() {
            return Err("uuid takes no arguments".to_string());
        }
        Ok(Self)
    }
}

impl Converter for UuidConverter {
    fn regex(&self) -> &str {
        "[A-Fa-f0-9]{8}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{12}"
    }

    fn weight(&self) -> u32 {
        NARROW_WEIGHT
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        uuid::Uuid::parse_str(segment).ok().map(Value::Uuid)
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        value.as_uuid().map(|u| u.hyphenated().to_string())
    }
}
