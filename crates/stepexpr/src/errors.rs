//! Error types shared by the template compiler and the runtime matchers.

use std::fmt;
use thiserror::Error;

/// Context for a template syntax failure.
///
/// Carries the static reason, the zero-based byte offset in the original
/// template at which the automaton or tokenizer gave up, and the offending
/// text when one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Human-readable reason for the failure.
    pub message: &'static str,
    /// Zero-based byte offset in the template where parsing failed.
    pub position: usize,
    /// Offending text, when known.
    pub found: Option<String>,
}

impl SyntaxErrorInfo {
    /// Create a new syntax-error description.
    ///
    /// # Examples
    /// ```
    /// use stepexpr::SyntaxErrorInfo;
    /// let info = SyntaxErrorInfo::new("unclosed optional", 3, None);
    /// assert_eq!(info.position, 3);
    /// ```
    #[must_use]
    pub fn new(message: &'static str, position: usize, found: Option<String>) -> Self {
        Self {
            message,
            position,
            found,
        }
    }
}

impl fmt::Display for SyntaxErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            Some(found) => write!(
                f,
                "{} near `{}` at byte {} (zero-based)",
                self.message, found, self.position
            ),
            None => write!(f, "{} at byte {} (zero-based)", self.message, self.position),
        }
    }
}

/// Errors surfaced while compiling a step template into a matcher.
///
/// Syntax errors and unknown-name errors are non-recoverable: the template
/// (or the registries handed to the compiler) must be fixed by the caller.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The template violates the pattern mini-language grammar.
    #[error("{0}")]
    Syntax(SyntaxErrorInfo),
    /// An argument names a data type absent from the registry.
    #[error("unknown data type `{0}` in template")]
    UnknownDataType(String),
    /// An assertion references a capability absent from the registry.
    #[error("unknown assertion capability `{0}` in template")]
    UnknownCapability(String),
    /// A template provider had no entry for the requested step key.
    #[error("no template registered for key `{key}` in locale `{locale}`")]
    MissingTemplate {
        /// Symbolic step key that was looked up.
        key: String,
        /// Locale the lookup ran under.
        locale: String,
    },
    /// A rendered fragment pattern failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub(crate) fn syntax_error(
    message: &'static str,
    position: usize,
    found: Option<String>,
) -> CompileError {
    CompileError::Syntax(SyntaxErrorInfo::new(message, position, found))
}

/// Errors surfaced when a matched argument value is materialized.
///
/// Matching itself never fails on a malformed value; the raw text is kept
/// and only parsed when the caller asks for the typed value.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The raw text does not parse into the argument's declared data type.
    #[error("cannot parse `{raw}` as `{data_type}`: {message}")]
    Parse {
        /// Name of the declared data type.
        data_type: String,
        /// Raw text captured during matching.
        raw: String,
        /// Parser-supplied failure detail.
        message: String,
    },
    /// The argument is a variable reference and has no literal value.
    #[error("argument `{name}` defers to variable `{variable}`; resolve it through the evaluation context")]
    Deferred {
        /// Argument name from the template.
        name: String,
        /// Referenced variable name.
        variable: String,
    },
}
