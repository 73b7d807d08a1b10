//! Runtime fragment matchers.
//!
//! A compiled matcher is an ordered list of these units. Each one is tried
//! against the remaining suffix of the input; a failed try leaves the
//! suffix untouched. Regex fragments must match at the head of the suffix,
//! while data-type, variable-reference, and assertion patterns may locate
//! their match anywhere in it.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use unic_langid::LanguageIdentifier;

use crate::errors::CompileError;
use crate::matcher::ArgumentValue;
use crate::registry::{AssertionCapability, DataType};

/// Deferred variable references accepted wherever a typed argument is
/// expected, e.g. `${total}`.
static VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .unwrap_or_else(|err| panic!("variable-reference pattern must compile: {err}"))
});

/// Value bound by a successful fragment try.
pub(crate) enum BoundValue {
    Argument(ArgumentValue),
    Assertion {
        capability: String,
        instance: Box<dyn Any>,
    },
}

/// Outcome of a successful fragment try.
pub(crate) struct FragmentMatch {
    /// Bytes of the remaining input consumed by this fragment.
    pub consumed: usize,
    /// Argument or assertion bound by the fragment, if any.
    pub value: Option<BoundValue>,
}

/// One independently-triable unit of a compiled matcher.
#[derive(Debug)]
pub enum FragmentMatcher {
    /// Plain composed pattern over literal text and structural groups.
    Regex(RegexFragment),
    /// Typed argument with a variable-reference fallback.
    Argument(ArgumentFragment),
    /// Negated word or phrase.
    Negation(NegationFragment),
    /// Reference to a named validation capability.
    Assertion(AssertionFragment),
}

impl FragmentMatcher {
    pub(crate) fn try_match(
        &self,
        remaining: &str,
        locale: &LanguageIdentifier,
    ) -> Option<FragmentMatch> {
        match self {
            Self::Regex(fragment) => fragment.try_match(remaining),
            Self::Argument(fragment) => fragment.try_match(remaining),
            Self::Negation(fragment) => fragment.try_match(remaining),
            Self::Assertion(fragment) => fragment.try_match(remaining, locale),
        }
    }
}

impl fmt::Display for FragmentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(fragment) => f.write_str(fragment.human_form()),
            Self::Argument(fragment) => write!(f, "{{{}}}", fragment.name()),
            Self::Negation(fragment) => f.write_str(fragment.human_form()),
            Self::Assertion(fragment) => write!(f, "{{{{{}}}}}", fragment.capability().name()),
        }
    }
}

/// Composed regex run with a parallel human-readable form.
#[derive(Debug)]
pub struct RegexFragment {
    regex: Regex,
    human: String,
}

impl RegexFragment {
    pub(crate) fn new(pattern: &str, human: String) -> Result<Self, CompileError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            human,
        })
    }

    /// The rendered pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// The human-readable rendering used for diagnostics.
    #[must_use]
    pub fn human_form(&self) -> &str {
        &self.human
    }

    fn try_match(&self, remaining: &str) -> Option<FragmentMatch> {
        let found = self.regex.find(remaining)?;
        if found.start() != 0 {
            return None;
        }
        Some(FragmentMatch {
            consumed: found.end(),
            value: None,
        })
    }
}

impl fmt::Display for RegexFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human)
    }
}

/// Typed argument fragment bound to a registered data type.
#[derive(Debug)]
pub struct ArgumentFragment {
    name: String,
    data_type: Arc<DataType>,
}

impl ArgumentFragment {
    pub(crate) fn new(name: &str, data_type: Arc<DataType>) -> Self {
        Self {
            name: name.to_string(),
            data_type,
        }
    }

    /// Argument name the extracted value is recorded under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound data type.
    #[must_use]
    pub fn data_type(&self) -> &Arc<DataType> {
        &self.data_type
    }

    fn try_match(&self, remaining: &str) -> Option<FragmentMatch> {
        if let Some(found) = self.data_type.pattern().find(remaining) {
            let value = ArgumentValue::Literal {
                name: self.name.clone(),
                raw: found.as_str().to_string(),
                data_type: Arc::clone(&self.data_type),
            };
            return Some(FragmentMatch {
                consumed: found.end(),
                value: Some(BoundValue::Argument(value)),
            });
        }
        let captures = VARIABLE_REFERENCE.captures(remaining)?;
        let whole = captures.get(0)?;
        let variable = captures.get(1)?.as_str().to_string();
        let value = ArgumentValue::Variable {
            name: self.name.clone(),
            variable,
            data_type: Arc::clone(&self.data_type),
        };
        Some(FragmentMatch {
            consumed: whole.end(),
            value: Some(BoundValue::Argument(value)),
        })
    }
}

/// Negated word or phrase, plus the renderable template tail after it.
///
/// The veto pattern is the negated target anchored at the head of the
/// remaining input (with a word boundary for single-word targets); when it
/// matches, the fragment fails. Otherwise the tail pattern — `\S+` or `.*`
/// for the negated position itself, concatenated with the rendering of the
/// following structural siblings — consumes input the same way a regex
/// fragment does.
#[derive(Debug)]
pub struct NegationFragment {
    veto: Regex,
    tail: Regex,
    human: String,
}

impl NegationFragment {
    pub(crate) fn new(veto: &str, tail: &str, human: String) -> Result<Self, CompileError> {
        Ok(Self {
            veto: Regex::new(veto)?,
            tail: Regex::new(tail)?,
            human,
        })
    }

    /// The rendered source of the veto pattern.
    #[must_use]
    pub fn veto_pattern(&self) -> &str {
        self.veto.as_str()
    }

    /// The rendered source of the consuming tail pattern.
    #[must_use]
    pub fn tail_pattern(&self) -> &str {
        self.tail.as_str()
    }

    /// The human-readable rendering used for diagnostics.
    #[must_use]
    pub fn human_form(&self) -> &str {
        &self.human
    }

    fn try_match(&self, remaining: &str) -> Option<FragmentMatch> {
        if self.veto.is_match(remaining) {
            return None;
        }
        let found = self.tail.find(remaining)?;
        if found.start() != 0 {
            return None;
        }
        Some(FragmentMatch {
            consumed: found.end(),
            value: None,
        })
    }
}

/// Reference to a named validation capability.
#[derive(Debug)]
pub struct AssertionFragment {
    capability: Arc<AssertionCapability>,
}

impl AssertionFragment {
    pub(crate) fn new(capability: Arc<AssertionCapability>) -> Self {
        Self { capability }
    }

    /// The referenced capability.
    #[must_use]
    pub fn capability(&self) -> &Arc<AssertionCapability> {
        &self.capability
    }

    fn try_match(&self, remaining: &str, locale: &LanguageIdentifier) -> Option<FragmentMatch> {
        for pattern in self.capability.patterns_for(locale) {
            let Some(captures) = pattern.regex().captures(remaining) else {
                continue;
            };
            let whole = captures.get(0)?;
            let parameter = captures.get(1).map(|found| found.as_str());
            let instance = pattern.build(parameter);
            return Some(FragmentMatch {
                consumed: whole.end(),
                value: Some(BoundValue::Assertion {
                    capability: self.capability.name().to_string(),
                    instance,
                }),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{english, sample_assertions, sample_types, StatusCheck};

    fn number_fragment() -> ArgumentFragment {
        let types = sample_types();
        let Some(data_type) = types.by_name("number") else {
            panic!("fixture registry must contain `number`");
        };
        ArgumentFragment::new("n", Arc::clone(data_type))
    }

    #[test]
    fn regex_fragment_requires_a_match_at_the_head() {
        let fragment = match RegexFragment::new(r"(optional\s+)?(text)", "optional? text".into())
        {
            Ok(fragment) => fragment,
            Err(err) => panic!("pattern should compile: {err}"),
        };
        assert!(fragment.try_match("text and more").is_some());
        assert!(fragment.try_match("optionaltext").is_none());
    }

    #[test]
    fn regex_fragment_consumes_through_the_match_end() {
        let fragment = match RegexFragment::new(r"(a\s+b)", "a b".into()) {
            Ok(fragment) => fragment,
            Err(err) => panic!("pattern should compile: {err}"),
        };
        let Some(outcome) = fragment.try_match("a  b rest") else {
            panic!("fragment should match");
        };
        assert_eq!(outcome.consumed, 4);
    }

    #[test]
    fn argument_fragment_prefers_the_data_type_pattern() {
        let Some(outcome) = number_fragment().try_match("42 left") else {
            panic!("fragment should match");
        };
        assert_eq!(outcome.consumed, 2);
        match outcome.value {
            Some(BoundValue::Argument(ArgumentValue::Literal { raw, .. })) => {
                assert_eq!(raw, "42");
            }
            _ => panic!("expected a literal argument"),
        }
    }

    #[test]
    fn argument_fragment_falls_back_to_a_variable_reference() {
        let Some(outcome) = number_fragment().try_match("${total} left") else {
            panic!("fragment should match");
        };
        assert_eq!(outcome.consumed, 8);
        match outcome.value {
            Some(BoundValue::Argument(ArgumentValue::Variable { variable, .. })) => {
                assert_eq!(variable, "total");
            }
            _ => panic!("expected a variable argument"),
        }
    }

    #[test]
    fn argument_fragment_fails_when_neither_pattern_matches() {
        assert!(number_fragment().try_match("no digits here").is_none());
    }

    fn negated_word() -> NegationFragment {
        match NegationFragment::new(r"^(stop)\b", r"\S+", "^stop".into()) {
            Ok(fragment) => fragment,
            Err(err) => panic!("patterns should compile: {err}"),
        }
    }

    #[test]
    fn negated_word_rejects_its_own_target() {
        assert!(negated_word().try_match("stop").is_none());
        assert!(negated_word().try_match("go").is_some());
    }

    #[test]
    fn negated_word_accepts_a_longer_word_with_the_same_prefix() {
        assert!(negated_word().try_match("stopwatch").is_some());
    }

    #[test]
    fn negated_word_consumes_through_its_tail() {
        let fragment = match NegationFragment::new(r"^(stop)\b", r"\S+(\s+now)", "^stop now".into())
        {
            Ok(fragment) => fragment,
            Err(err) => panic!("patterns should compile: {err}"),
        };
        let Some(outcome) = fragment.try_match("go now please") else {
            panic!("fragment should match");
        };
        assert_eq!(outcome.consumed, 6);
        assert!(fragment.try_match("stop now please").is_none());
    }

    #[test]
    fn negated_phrase_rejects_a_prefix_match() {
        let fragment =
            match NegationFragment::new(r"^(dark\s+blue)", r".*(\s+sky)", "^[dark blue] sky".into())
            {
                Ok(fragment) => fragment,
                Err(err) => panic!("patterns should compile: {err}"),
            };
        assert!(fragment.try_match("dark  blue sky").is_none());
        assert!(fragment.try_match("light blue sky").is_some());
    }

    #[test]
    fn assertion_fragment_probes_patterns_in_declaration_order() {
        let assertions = sample_assertions();
        let Some(capability) = assertions.by_name("status-assertion") else {
            panic!("fixture registry must contain `status-assertion`");
        };
        let fragment = AssertionFragment::new(Arc::clone(capability));
        let Some(outcome) = fragment.try_match("up and running", &english()) else {
            panic!("fragment should match");
        };
        match outcome.value {
            Some(BoundValue::Assertion { capability, instance }) => {
                assert_eq!(capability, "status-assertion");
                match instance.downcast_ref::<StatusCheck>() {
                    Some(StatusCheck::Running) => {}
                    other => panic!("expected the running check, got {other:?}"),
                }
            }
            _ => panic!("expected an assertion binding"),
        }
    }

    #[test]
    fn assertion_fragment_hands_the_captured_parameter_to_the_builder() {
        let assertions = sample_assertions();
        let Some(capability) = assertions.by_name("status-assertion") else {
            panic!("fixture registry must contain `status-assertion`");
        };
        let fragment = AssertionFragment::new(Arc::clone(capability));
        let Some(outcome) = fragment.try_match("stopped for 7 minutes", &english()) else {
            panic!("fragment should match");
        };
        match outcome.value {
            Some(BoundValue::Assertion { instance, .. }) => {
                match instance.downcast_ref::<StatusCheck>() {
                    Some(StatusCheck::Stopped { minutes }) => assert_eq!(*minutes, 7),
                    other => panic!("expected the stopped check, got {other:?}"),
                }
            }
            _ => panic!("expected an assertion binding"),
        }
    }

    #[test]
    fn assertion_fragment_fails_for_an_unknown_locale() {
        use unic_langid::langid;
        let assertions = sample_assertions();
        let Some(capability) = assertions.by_name("status-assertion") else {
            panic!("fixture registry must contain `status-assertion`");
        };
        let fragment = AssertionFragment::new(Arc::clone(capability));
        assert!(fragment.try_match("up and running", &langid!("fr")).is_none());
    }
}
