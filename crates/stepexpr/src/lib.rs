//! Natural-language step template matching.
//!
//! `stepexpr` compiles small pattern templates describing executable test
//! steps into matchers that test whether a free-form input line conforms to
//! the template and, when it does, extract named typed arguments and named
//! validation capabilities from it. Compilation runs a tokenizer, a
//! push-down automaton assembling a template AST, and a lowering pass that
//! renders the tree into composed regular-expression fragments.
//!
//! The template mini-language: literal text; `*` wildcard; `(text)`
//! optional; `a|b|c` or `(a|b|c)` choice; `^word` or `^[phrase]` negation;
//! `{name}` or `{name:type}` typed argument; `{{capability}}` assertion
//! reference; `\` escapes the next structural symbol. At match time,
//! `${identifier}` is accepted wherever a typed argument is expected and
//! yields a deferred variable reference instead of a literal value.
//!
//! Compiled matchers are immutable and freely shareable across threads;
//! matching allocates only the per-call result. Data types and assertion
//! capabilities are external collaborators supplied through registries.
//!
//! ```
//! use std::any::Any;
//! use stepexpr::{AssertionRegistry, DataType, DataTypeRegistry, compile};
//! use unic_langid::langid;
//!
//! let mut types = DataTypeRegistry::new();
//! types.register(DataType::new(
//!     "number",
//!     r"\d+",
//!     Box::new(|raw| {
//!         raw.parse::<i64>()
//!             .map(|value| Box::new(value) as Box<dyn Any>)
//!             .map_err(|err| err.to_string())
//!     }),
//! )?);
//!
//! let matcher = compile("count is {n:number}", &types, &AssertionRegistry::new())?;
//! let result = matcher.match_text("count is 42", &langid!("en-US"));
//! assert!(result.is_match());
//! let n = result.argument("n").and_then(|value| value.raw());
//! assert_eq!(n, Some("42"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ast;
mod cache;
mod errors;
mod fragment;
mod matcher;
mod registry;
mod template;
#[cfg(test)]
pub(crate) mod test_support;

pub use cache::MatcherCache;
pub use errors::{CompileError, SyntaxErrorInfo, ValueError};
pub use fragment::{
    ArgumentFragment, AssertionFragment, FragmentMatcher, NegationFragment, RegexFragment,
};
pub use matcher::{ArgumentValue, CompiledMatcher, MatchResult};
pub use registry::{
    AssertionBuilder, AssertionCapability, AssertionPattern, AssertionRegistry, DataType,
    DataTypeRegistry, ParseFn, TemplateProvider,
};
pub use template::compile;
