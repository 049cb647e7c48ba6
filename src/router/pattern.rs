//! Route template tokenizer and compiler.
//!
//! A template such as `/archive/<int(fixed_digits=4):year>/<slug>` is split into
//! literal runs and variables. Compilation resolves each variable to a
//! converter and produces, in one left-to-right pass:
//!
//! - a single anchored regex over the lookup key `subdomain|/path`,
//! - a trace used to rebuild URLs,
//! - the weight vector and greediness count used for ranking.

use super::args::parse_converter_args;
use super::converters::{quote, Converter, ConverterRegistry};
use super::error::RuleError;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

/// Name of the capture group holding the optional trailing slash.
pub(crate) const SUFFIX_GROUP: &str = "__suffix__";

/// One token of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Variable {
        converter: Option<String>,
        args: Option<String>,
        name: String,
    },
}

/// Ranking weight of one template piece.
///
/// Variant order matters: any literal outranks any variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weight {
    Variable(u32),
    Literal(usize),
}

pub type Weights = SmallVec<[Weight; 8]>;

/// Reconstruction step used by `build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TraceItem {
    Literal(String),
    Variable(String),
}

pub(crate) type Trace = SmallVec<[TraceItem; 8]>;

/// Everything derived from a template at bind time.
#[derive(Debug)]
pub(crate) struct CompiledPattern {
    /// `None` for build-only rules.
    pub regex: Option<Regex>,
    pub trace: Trace,
    /// In declaration order.
    pub converters: Vec<(String, Arc<dyn Converter>)>,
    pub weights: Weights,
    pub greediness: usize,
}

impl CompiledPattern {
    pub fn converter(&self, name: &str) -> Option<&Arc<dyn Converter>> {
        self.converters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.converters.iter().map(|(n, _)| n.as_str())
    }
}

/// Inputs of [`compile`].
pub(crate) struct PatternSpec<'a> {
    pub rule: &'a str,
    pub subdomain: &'a str,
    pub is_leaf: bool,
    pub strict_slashes: bool,
    pub build_only: bool,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_variable_name(name: &str) -> Result<(), String> {
    if name == SUFFIX_GROUP {
        return Err(format!("variable name '{name}' is reserved"));
    }
    Ok(())
}

/// Split a template into literal and variable tokens.
pub fn tokenize(template: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('<') {
        let literal = &rest[..open];
        if literal.contains('>') {
            return Err("unbalanced '>'".to_string());
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal.to_string()));
        }
        rest = &rest[open + 1..];

        let ident_end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .ok_or_else(|| "unterminated variable".to_string())?;
        let first = &rest[..ident_end];
        if !is_identifier(first) {
            return Err(format!("invalid variable or converter name '{first}'"));
        }
        rest = &rest[ident_end..];

        if let Some(after) = rest.strip_prefix('>') {
            check_variable_name(first)?;
            tokens.push(Token::Variable {
                converter: None,
                args: None,
                name: first.to_string(),
            });
            rest = after;
            continue;
        }

        let mut args = None;
        if rest.starts_with('(') {
            let close = find_closing_paren(rest)
                .ok_or_else(|| format!("unterminated arguments for converter '{first}'"))?;
            args = Some(rest[1..close].to_string());
            rest = &rest[close + 1..];
        }

        let after_colon = rest
            .strip_prefix(':')
            .ok_or_else(|| format!("expected ':' after converter '{first}'"))?;
        let close = after_colon
            .find('>')
            .ok_or_else(|| "unterminated variable".to_string())?;
        let name = &after_colon[..close];
        if !is_identifier(name) {
            return Err(format!("invalid variable name '{name}'"));
        }
        check_variable_name(name)?;
        tokens.push(Token::Variable {
            converter: Some(first.to_string()),
            args,
            name: name.to_string(),
        });
        rest = &after_colon[close + 1..];
    }

    if rest.contains('>') {
        return Err("unbalanced '>'".to_string());
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }
    Ok(tokens)
}

/// Index of the `)` closing the `(` at position 0, skipping quoted text.
fn find_closing_paren(s: &str) -> Option<usize> {
    let mut quote_char: Option<char> = None;
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if let Some(q) = quote_char {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote_char = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote_char = Some(c),
            ')' => return Some(i),
            _ => {}
        }
    }
    None
}

struct Compiler<'a> {
    rule: &'a str,
    registry: &'a ConverterRegistry,
    regex: String,
    trace: Trace,
    converters: Vec<(String, Arc<dyn Converter>)>,
    weights: Weights,
    greediness: usize,
}

impl Compiler<'_> {
    /// Append one part of the key. Path literals are matched in their
    /// percent-encoded form; the domain part is used as written.
    fn push_template(&mut self, template: &str, encode_literals: bool) -> Result<(), RuleError> {
        let tokens = tokenize(template).map_err(|reason| RuleError::MalformedRule {
            rule: self.rule.to_string(),
            reason,
        })?;

        for token in tokens {
            match token {
                Token::Literal(text) => {
                    let text = if encode_literals {
                        quote(&text, true)
                    } else {
                        text
                    };
                    self.regex.push_str(&regex::escape(&text));
                    for piece in text.split('/').filter(|p| !p.is_empty()) {
                        self.weights.push(Weight::Literal(piece.len()));
                    }
                    self.trace.push(TraceItem::Literal(text));
                }
                Token::Variable {
                    converter,
                    args,
                    name,
                } => self.push_variable(converter.as_deref(), args.as_deref(), name)?,
            }
        }
        Ok(())
    }

    fn push_variable(
        &mut self,
        converter: Option<&str>,
        args: Option<&str>,
        name: String,
    ) -> Result<(), RuleError> {
        if self.converters.iter().any(|(n, _)| *n == name) {
            return Err(RuleError::DuplicateVariable {
                rule: self.rule.to_string(),
                variable: name,
            });
        }

        let converter_name = converter.unwrap_or("default");
        let invalid_args = |reason: String| RuleError::InvalidConverterArguments {
            rule: self.rule.to_string(),
            converter: converter_name.to_string(),
            reason,
        };
        let parsed = parse_converter_args(args.unwrap_or("")).map_err(invalid_args)?;
        let converter = self
            .registry
            .create(converter_name, &parsed)
            .map_err(invalid_args)?
            .ok_or_else(|| RuleError::UnknownConverter {
                rule: self.rule.to_string(),
                converter: converter_name.to_string(),
            })?;

        self.regex
            .push_str(&format!("(?P<{name}>{})", converter.regex()));
        self.weights.push(Weight::Variable(converter.weight()));
        if converter.is_greedy() {
            self.greediness += 1;
        }
        self.trace.push(TraceItem::Variable(name.clone()));
        self.converters.push((name, converter));
        Ok(())
    }
}

/// Compile a rule template against a converter registry.
pub(crate) fn compile(
    spec: &PatternSpec<'_>,
    registry: &ConverterRegistry,
) -> Result<CompiledPattern, RuleError> {
    let mut compiler = Compiler {
        rule: spec.rule,
        registry,
        regex: String::with_capacity(spec.rule.len() * 2 + 16),
        trace: Trace::new(),
        converters: Vec::new(),
        weights: Weights::new(),
        greediness: 0,
    };

    compiler.regex.push('^');
    compiler.push_template(spec.subdomain, false)?;
    compiler.regex.push_str(r"\|");
    compiler.trace.push(TraceItem::Literal("|".to_string()));

    let path = if spec.is_leaf {
        spec.rule
    } else {
        spec.rule.trim_end_matches('/')
    };
    compiler.push_template(path, true)?;
    if !spec.is_leaf {
        compiler.trace.push(TraceItem::Literal("/".to_string()));
    }

    let regex = if spec.build_only {
        None
    } else {
        if !spec.is_leaf || !spec.strict_slashes {
            compiler
                .regex
                .push_str(&format!("(?P<{SUFFIX_GROUP}>/?)"));
        }
        compiler.regex.push('$');
        Some(
            Regex::new(&compiler.regex).map_err(|e| RuleError::InvalidPattern {
                rule: spec.rule.to_string(),
                reason: e.to_string(),
            })?,
        )
    };

    Ok(CompiledPattern {
        regex,
        trace: compiler.trace,
        converters: compiler.converters,
        weights: compiler.weights,
        greediness: compiler.greediness,
    })
}
