use super::value::Values;
use http::{Method, StatusCode};
use std::fmt;

/// Outcome of a failed (or redirected) match.
///
/// These are per-request conditions. The hosting layer decides whether to
/// follow a redirect or render a response for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The request should be sent elsewhere: missing trailing slash, a
    /// canonical URL that collapses defaults, an alias, or an explicit
    /// redirect rule.
    RequestRedirect {
        /// Fully qualified destination
        location: String,
        /// Always a permanent redirect
        code: StatusCode,
    },
    /// At least one rule matched the path, but none accepts the method.
    MethodNotAllowed {
        /// Union of the methods accepted by the rules that matched
        allowed: Vec<Method>,
    },
    /// No rule matched the path.
    NotFound,
}

impl RoutingError {
    pub(crate) fn redirect(location: String) -> Self {
        RoutingError::RequestRedirect {
            location,
            code: StatusCode::PERMANENT_REDIRECT,
        }
    }

    /// HTTP status the hosting layer should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::RequestRedirect { code, .. } => *code,
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RoutingError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Redirect destination, if this is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            RoutingError::RequestRedirect { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Value for an `Allow` header, if this is a method mismatch.
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            RoutingError::MethodNotAllowed { allowed } => Some(
                allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::RequestRedirect { location, code } => {
                write!(f, "redirect ({}) to {}", code.as_u16(), location)
            }
            RoutingError::MethodNotAllowed { allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                write!(f, "method not allowed; valid methods: {}", allowed.join(", "))
            }
            RoutingError::NotFound => write!(f, "no rule matched the requested path"),
        }
    }
}

impl std::error::Error for RoutingError {}

/// No rule for the endpoint can build a URL from the supplied values.
///
/// This is a programming or configuration error, not a request condition.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    pub endpoint: String,
    pub values: Values,
    pub method: Option<Method>,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        write!(
            f,
            "could not build url for endpoint '{}' with values [{}]",
            self.endpoint,
            keys.join(", ")
        )?;
        if let Some(method) = &self.method {
            write!(f, " and method {method}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildError {}

/// Construction-time failure while declaring or binding a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Route strings must start with `/`.
    MissingLeadingSlash { rule: String },
    /// The same variable name appears twice in one rule.
    DuplicateVariable { rule: String, variable: String },
    /// `<name:var>` refers to a converter the table does not know.
    UnknownConverter { rule: String, converter: String },
    /// The template itself could not be tokenized.
    MalformedRule { rule: String, reason: String },
    /// The converter rejected its argument list.
    InvalidConverterArguments {
        rule: String,
        converter: String,
        reason: String,
    },
    /// The assembled regex did not compile.
    InvalidPattern { rule: String, reason: String },
    /// The rule has already been bound to a table.
    AlreadyBound { rule: String },
    /// A redirect template references a placeholder the rule does not define.
    UnknownRedirectVariable { rule: String, variable: String },
    /// A rule template references a name missing from its context.
    MissingTemplateVariable { template: String, variable: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::MissingLeadingSlash { rule } => {
                write!(f, "rule '{rule}' must start with a leading slash")
            }
            RuleError::DuplicateVariable { rule, variable } => {
                write!(f, "variable '{variable}' used twice in rule '{rule}'")
            }
            RuleError::UnknownConverter { rule, converter } => {
                write!(f, "rule '{rule}' uses unknown converter '{converter}'")
            }
            RuleError::MalformedRule { rule, reason } => {
                write!(f, "malformed rule '{rule}': {reason}")
            }
            RuleError::InvalidConverterArguments {
                rule,
                converter,
                reason,
            } => write!(
                f,
                "invalid arguments for converter '{converter}' in rule '{rule}': {reason}"
            ),
            RuleError::InvalidPattern { rule, reason } => {
                write!(f, "rule '{rule}' compiles to an invalid pattern: {reason}")
            }
            RuleError::AlreadyBound { rule } => {
                write!(f, "rule '{rule}' is already bound to a map")
            }
            RuleError::UnknownRedirectVariable { rule, variable } => write!(
                f,
                "redirect target of rule '{rule}' references unknown variable '{variable}'"
            ),
            RuleError::MissingTemplateVariable { template, variable } => write!(
                f,
                "rule template '{template}' references '{variable}' which is not in its context"
            ),
        }
    }
}

impl std::error::Error for RuleError {}
