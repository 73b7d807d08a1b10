//! Template compilation pipeline: tokenize, build, lower.

pub(crate) mod builder;
pub(crate) mod compiler;
pub(crate) mod lexer;

use crate::errors::CompileError;
use crate::matcher::CompiledMatcher;
use crate::registry::{AssertionRegistry, DataTypeRegistry};

/// Compile a step template into a reusable matcher.
///
/// Compilation is pure and side-effect free; independent compilations may
/// run concurrently and the resulting matcher is freely shareable.
///
/// # Errors
/// Returns [`CompileError`] when the template violates the pattern
/// mini-language, when an argument names an unregistered data type, or
/// when an assertion references an unregistered capability.
pub fn compile(
    template: &str,
    types: &DataTypeRegistry,
    assertions: &AssertionRegistry,
) -> Result<CompiledMatcher, CompileError> {
    let tokens = lexer::tokenize(template)?;
    let ast = builder::build(tokens)?;
    let matcher = compiler::compile_ast(ast, types, assertions)?;
    log::debug!(
        "compiled template {template:?} into {} fragments",
        matcher.fragments().len()
    );
    Ok(matcher)
}
