//! Collaborator registries consumed by the compiler.
//!
//! The engine does not ship concrete value types or validation rules; it
//! consumes them through the registries below. A data type pairs a
//! recognition pattern with a text-to-value parser, and an assertion
//! capability is a named, locale-aware family of validation patterns.
//! Localized template text itself comes from a [`TemplateProvider`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use regex::Regex;
use unic_langid::LanguageIdentifier;

/// Parser turning raw matched text into a typed value.
///
/// The error is a plain message; the engine wraps it with the data-type
/// name and the offending text when a value is materialized.
pub type ParseFn = Box<dyn Fn(&str) -> Result<Box<dyn Any>, String> + Send + Sync>;

/// Builder producing an assertion instance from an optional captured
/// parameter.
pub type AssertionBuilder = Box<dyn Fn(Option<&str>) -> Box<dyn Any> + Send + Sync>;

/// A named value kind with its own recognition pattern and parser.
pub struct DataType {
    name: String,
    pattern: Regex,
    parser: ParseFn,
}

impl DataType {
    /// Create a data type from its recognition pattern and parser.
    ///
    /// # Errors
    /// Returns the underlying error when `pattern` is not a valid regular
    /// expression.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        parser: ParseFn,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            parser,
        })
    }

    /// The registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recognition pattern.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Parse raw matched text into the typed value.
    ///
    /// # Errors
    /// Returns the parser's failure message when `raw` does not conform.
    pub fn parse(&self, raw: &str) -> Result<Box<dyn Any>, String> {
        (self.parser)(raw)
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataType")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Name-keyed collection of data types.
#[derive(Debug, Default)]
pub struct DataTypeRegistry {
    types: HashMap<String, Arc<DataType>>,
}

impl DataTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data type; an existing entry of the same name is
    /// replaced.
    pub fn register(&mut self, data_type: DataType) {
        self.types
            .insert(data_type.name().to_string(), Arc::new(data_type));
    }

    /// Look up a data type by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Arc<DataType>> {
        self.types.get(name)
    }
}

/// One locale-specific pattern of a capability, paired with its builder.
pub struct AssertionPattern {
    regex: Regex,
    builder: AssertionBuilder,
}

impl AssertionPattern {
    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }

    pub(crate) fn build(&self, parameter: Option<&str>) -> Box<dyn Any> {
        (self.builder)(parameter)
    }
}

impl fmt::Debug for AssertionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionPattern")
            .field("pattern", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

/// A named, locale-aware family of validation patterns.
///
/// Patterns registered for a locale are probed in declaration order during
/// matching; the first one that locates a match wins.
pub struct AssertionCapability {
    name: String,
    patterns: HashMap<LanguageIdentifier, Vec<AssertionPattern>>,
}

impl AssertionCapability {
    /// Create a capability with no patterns yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: HashMap::new(),
        }
    }

    /// Append a `(pattern, builder)` entry to the locale's ordered list.
    ///
    /// # Errors
    /// Returns the underlying error when `pattern` is not a valid regular
    /// expression.
    pub fn with_pattern(
        mut self,
        locale: LanguageIdentifier,
        pattern: &str,
        builder: AssertionBuilder,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.patterns
            .entry(locale)
            .or_default()
            .push(AssertionPattern { regex, builder });
        Ok(self)
    }

    /// The registered capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered pattern list for `locale`; empty when the locale has no
    /// registered patterns.
    #[must_use]
    pub fn patterns_for(&self, locale: &LanguageIdentifier) -> &[AssertionPattern] {
        self.patterns.get(locale).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Debug for AssertionCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionCapability")
            .field("name", &self.name)
            .field("locales", &self.patterns.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Name-keyed collection of assertion capabilities.
#[derive(Debug, Default)]
pub struct AssertionRegistry {
    capabilities: HashMap<String, Arc<AssertionCapability>>,
}

impl AssertionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability; an existing entry of the same name is
    /// replaced.
    pub fn register(&mut self, capability: AssertionCapability) {
        self.capabilities
            .insert(capability.name().to_string(), Arc::new(capability));
    }

    /// Look up a capability by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Arc<AssertionCapability>> {
        self.capabilities.get(name)
    }
}

/// Resolves localized template strings for symbolic step keys.
///
/// Localization is entirely external to the engine; implementations own
/// the key-and-locale to template mapping.
pub trait TemplateProvider {
    /// The template for `key` in `locale`, if one is registered.
    fn get(&self, key: &str, locale: &LanguageIdentifier) -> Option<String>;
}
