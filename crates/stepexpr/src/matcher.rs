//! Compiled matchers, match results, and argument values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use unic_langid::LanguageIdentifier;

use crate::errors::ValueError;
use crate::fragment::{ArgumentFragment, BoundValue, FragmentMatcher};
use crate::registry::DataType;

/// Immutable, ordered list of fragment matchers compiled from one template.
///
/// Matchers are fully immutable after compilation and may be cached and
/// shared across threads without synchronization; every match call works on
/// its own state.
#[derive(Debug)]
pub struct CompiledMatcher {
    fragments: Vec<FragmentMatcher>,
    arguments: HashMap<String, usize>,
}

impl CompiledMatcher {
    pub(crate) fn new(fragments: Vec<FragmentMatcher>) -> Self {
        let mut arguments = HashMap::new();
        for (index, fragment) in fragments.iter().enumerate() {
            if let FragmentMatcher::Argument(argument) = fragment {
                arguments.insert(argument.name().to_string(), index);
            }
        }
        Self {
            fragments,
            arguments,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_fragments(self) -> Vec<FragmentMatcher> {
        self.fragments
    }

    /// The ordered fragment list, for introspection.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentMatcher] {
        &self.fragments
    }

    /// Look up a typed-argument fragment by its name.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&ArgumentFragment> {
        let index = *self.arguments.get(name)?;
        match self.fragments.get(index) {
            Some(FragmentMatcher::Argument(argument)) => Some(argument),
            _ => None,
        }
    }

    /// Test `text` against the template, extracting arguments and
    /// assertion bindings.
    ///
    /// Fragments are tried in order against a shrinking suffix of the
    /// input; the first failure yields a non-match with no partial
    /// results. Trailing input left over after the last fragment does not
    /// cause a failure.
    #[must_use]
    pub fn match_text(&self, text: &str, locale: &LanguageIdentifier) -> MatchResult {
        let mut remaining = text;
        let mut arguments = HashMap::new();
        let mut assertions = HashMap::new();
        for fragment in &self.fragments {
            let Some(outcome) = fragment.try_match(remaining, locale) else {
                log::trace!("fragment `{fragment}` failed against {remaining:?}");
                return MatchResult::no_match();
            };
            remaining = remaining.get(outcome.consumed..).unwrap_or("");
            match outcome.value {
                Some(BoundValue::Argument(value)) => {
                    arguments.insert(value.name().to_string(), value);
                }
                Some(BoundValue::Assertion {
                    capability,
                    instance,
                }) => {
                    assertions.insert(capability, instance);
                }
                None => {}
            }
        }
        MatchResult {
            matched: true,
            arguments,
            assertions,
        }
    }
}

/// Outcome of matching one input line against a compiled matcher.
pub struct MatchResult {
    matched: bool,
    arguments: HashMap<String, ArgumentValue>,
    assertions: HashMap<String, Box<dyn Any>>,
}

impl MatchResult {
    pub(crate) fn no_match() -> Self {
        Self {
            matched: false,
            arguments: HashMap::new(),
            assertions: HashMap::new(),
        }
    }

    /// Whether the input conformed to the template.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// Extracted argument value by name.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments.get(name)
    }

    /// Bound assertion instance by capability name.
    #[must_use]
    pub fn assertion(&self, capability: &str) -> Option<&dyn Any> {
        self.assertions.get(capability).map(Box::as_ref)
    }

    /// Number of extracted arguments.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("matched", &self.matched)
            .field("arguments", &self.arguments)
            .field("assertions", &self.assertions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Value extracted for a typed argument.
///
/// A `Literal` carries the raw matched text and parses it on demand; a
/// `Variable` defers to an external evaluation context.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    /// Raw text conforming to the data type's pattern.
    Literal {
        /// Argument name from the template.
        name: String,
        /// Raw matched text.
        raw: String,
        /// Declared data type.
        data_type: Arc<DataType>,
    },
    /// Deferred `${identifier}` reference.
    Variable {
        /// Argument name from the template.
        name: String,
        /// Referenced variable name.
        variable: String,
        /// Declared data type.
        data_type: Arc<DataType>,
    },
}

impl ArgumentValue {
    /// Argument name the value was recorded under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Literal { name, .. } | Self::Variable { name, .. } => name,
        }
    }

    /// Declared data type of the argument.
    #[must_use]
    pub fn data_type(&self) -> &Arc<DataType> {
        match self {
            Self::Literal { data_type, .. } | Self::Variable { data_type, .. } => data_type,
        }
    }

    /// Raw matched text for a literal value.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Literal { raw, .. } => Some(raw),
            Self::Variable { .. } => None,
        }
    }

    /// Referenced variable name for a deferred value.
    #[must_use]
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::Literal { .. } => None,
            Self::Variable { variable, .. } => Some(variable),
        }
    }

    /// Parse the typed value of a literal argument.
    ///
    /// # Errors
    /// Returns [`ValueError::Parse`] when the raw text does not conform to
    /// the declared data type, and [`ValueError::Deferred`] for variable
    /// references, which must be resolved by the caller's evaluation
    /// context.
    pub fn materialize(&self) -> Result<Box<dyn Any>, ValueError> {
        match self {
            Self::Literal {
                raw, data_type, ..
            } => data_type.parse(raw).map_err(|message| ValueError::Parse {
                data_type: data_type.name().to_string(),
                raw: raw.clone(),
                message,
            }),
            Self::Variable { name, variable, .. } => Err(ValueError::Deferred {
                name: name.clone(),
                variable: variable.clone(),
            }),
        }
    }
}
