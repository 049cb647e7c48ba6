//! Parser for converter argument lists.
//!
//! The text between the parentheses of `<converter(args):name>` is a
//! comma-separated list of literals. Each literal is an integer, a float, a
//! quoted string, a bare word, `true`/`false` or `none`, optionally written as
//! `key=value`. Positional arguments must come before keyword arguments.
//!
//! ```text
//! <int(fixed_digits=4):year>
//! <any(about, "help me", contact):page>
//! <string(minlength=2, maxlength=8):code>
//! ```

use std::fmt;

/// One literal from a converter argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ConverterArg {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl ConverterArg {
    /// Integer view of the argument. Whole floats are accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConverterArg::Int(i) => Some(*i),
            ConverterArg::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConverterArg::Int(i) => Some(*i as f64),
            ConverterArg::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Textual view. Numbers are rendered so `any(1, 2)` still works.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConverterArg::Str(s) => Some(s.clone()),
            ConverterArg::Int(i) => Some(i.to_string()),
            ConverterArg::Float(f) => Some(f.to_string()),
            ConverterArg::Bool(_) | ConverterArg::None => None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, ConverterArg::None)
    }
}

impl fmt::Display for ConverterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterArg::Int(i) => write!(f, "{i}"),
            ConverterArg::Float(v) => write!(f, "{v}"),
            ConverterArg::Str(s) => write!(f, "{s:?}"),
            ConverterArg::Bool(b) => write!(f, "{b}"),
            ConverterArg::None => write!(f, "none"),
        }
    }
}

/// Parsed argument list: positional values followed by `key=value` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterArgs {
    pub positional: Vec<ConverterArg>,
    pub keyword: Vec<(String, ConverterArg)>,
}

impl ConverterArgs {
    /// Look up an argument by keyword, falling back to its positional slot.
    #[must_use]
    pub fn get(&self, name: &str, position: usize) -> Option<&ConverterArg> {
        self.keyword
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v)
            .or_else(|| self.positional.get(position))
    }

    /// Reject keyword names the converter does not understand and positional
    /// lists longer than `max_positional`.
    pub fn expect_only(&self, known: &[&str], max_positional: usize) -> Result<(), String> {
        if self.positional.len() > max_positional {
            return Err(format!(
                "expected at most {max_positional} positional arguments, got {}",
                self.positional.len()
            ));
        }
        if let Some((key, _)) = self.keyword.iter().find(|(k, _)| !known.contains(&k.as_str())) {
            return Err(format!("unexpected keyword argument '{key}'"));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

/// Parse the raw text found between the converter parentheses.
pub fn parse_converter_args(input: &str) -> Result<ConverterArgs, String> {
    let mut args = ConverterArgs::default();
    if input.trim().is_empty() {
        return Ok(args);
    }

    for item in split_items(input)? {
        let item = item.trim();
        if item.is_empty() {
            return Err(format!("empty argument in '{input}'"));
        }
        match split_keyword(item) {
            Some((key, raw)) => {
                let value = parse_literal(raw.trim())?;
                args.keyword.push((key.to_string(), value));
            }
            None => {
                if !args.keyword.is_empty() {
                    return Err(format!(
                        "positional argument '{item}' follows keyword arguments"
                    ));
                }
                args.positional.push(parse_literal(item)?);
            }
        }
    }
    Ok(args)
}

/// Split on commas that are not inside quotes.
fn split_items(input: &str) -> Result<Vec<&str>, String> {
    let mut items = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            ',' => {
                items.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated string in '{input}'"));
    }
    items.push(&input[start..]);
    Ok(items)
}

/// Recognise `identifier = value`, ignoring `=` inside quoted strings.
fn split_keyword(item: &str) -> Option<(&str, &str)> {
    let eq = item.find('=')?;
    let key = item[..eq].trim();
    let first_quote = item.find(['"', '\'']);
    if first_quote.is_some_and(|q| q < eq) {
        return None;
    }
    let valid = !key.is_empty()
        && key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| (key, &item[eq + 1..]))
}

fn parse_literal(raw: &str) -> Result<ConverterArg, String> {
    if raw.is_empty() {
        return Err("missing value".to_string());
    }
    let first = raw.chars().next().unwrap_or(' ');
    if first == '"' || first == '\'' {
        return unquote(raw, first).map(ConverterArg::Str);
    }
    match raw {
        "true" | "True" => return Ok(ConverterArg::Bool(true)),
        "false" | "False" => return Ok(ConverterArg::Bool(false)),
        "none" | "None" => return Ok(ConverterArg::None),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(ConverterArg::Int(i));
    }
    if raw.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = raw.parse::<f64>() {
            return Ok(ConverterArg::Float(f));
        }
    }
    if raw.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        return Err(format!("bare word '{raw}' must be quoted"));
    }
    Ok(ConverterArg::Str(raw.to_string()))
}

fn unquote(raw: &str, quote: char) -> Result<String, String> {
    let body = raw
        .strip_prefix(quote)
        .and_then(|r| r.strip_suffix(quote))
        .filter(|_| raw.len() >= 2)
        .ok_or_else(|| format!("malformed string literal {raw}"))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return Err(format!("dangling escape in {raw}")),
            }
        } else if c == quote {
            return Err(format!("unescaped quote inside {raw}"));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
