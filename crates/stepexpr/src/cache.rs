//! Compute-once cache of compiled matchers.

use std::sync::{Arc, Mutex, PoisonError};

use hashbrown::HashMap;
use unic_langid::LanguageIdentifier;

use crate::errors::CompileError;
use crate::matcher::CompiledMatcher;
use crate::registry::{AssertionRegistry, DataTypeRegistry, TemplateProvider};

/// Shares compiled matchers across match calls, keyed by template text.
///
/// Compilation is pure, so racing callers may compile the same template
/// twice; the matchers are observably equivalent and the first inserted
/// value wins. No locking is held while a template compiles.
#[derive(Debug)]
pub struct MatcherCache {
    types: DataTypeRegistry,
    assertions: AssertionRegistry,
    compiled: Mutex<HashMap<String, Arc<CompiledMatcher>>>,
}

impl MatcherCache {
    /// Create a cache over the given registries.
    #[must_use]
    pub fn new(types: DataTypeRegistry, assertions: AssertionRegistry) -> Self {
        Self {
            types,
            assertions,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// The data-type registry compilation runs against.
    #[must_use]
    pub fn data_types(&self) -> &DataTypeRegistry {
        &self.types
    }

    /// The assertion registry compilation runs against.
    #[must_use]
    pub fn assertions(&self) -> &AssertionRegistry {
        &self.assertions
    }

    /// Return the cached matcher for `template`, compiling it on first use.
    ///
    /// # Errors
    /// Returns [`CompileError`] when the template fails to compile; failed
    /// compilations are not cached.
    pub fn get_or_compile(&self, template: &str) -> Result<Arc<CompiledMatcher>, CompileError> {
        {
            let guard = self
                .compiled
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = guard.get(template) {
                return Ok(Arc::clone(found));
            }
        }
        let matcher = Arc::new(crate::compile(template, &self.types, &self.assertions)?);
        let mut guard = self
            .compiled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            guard.entry(template.to_string()).or_insert(matcher),
        ))
    }

    /// Resolve `key` through `provider` and compile the resulting template.
    ///
    /// # Errors
    /// Returns [`CompileError::MissingTemplate`] when the provider has no
    /// entry for the key and locale, or any compile error from the
    /// resolved template.
    pub fn compile_step(
        &self,
        provider: &dyn TemplateProvider,
        key: &str,
        locale: &LanguageIdentifier,
    ) -> Result<Arc<CompiledMatcher>, CompileError> {
        let template = provider
            .get(key, locale)
            .ok_or_else(|| CompileError::MissingTemplate {
                key: key.to_string(),
                locale: locale.to_string(),
            })?;
        self.get_or_compile(&template)
    }
}
