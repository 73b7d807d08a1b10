//! AST to compiled-matcher lowering.
//!
//! Structural nodes render to regular-expression text; adjacent renderable
//! siblings merge into a single regex fragment so alternation and optional
//! groups can backtrack against their neighbours. A negation starts a
//! fragment of its own that keeps absorbing the renderable siblings after
//! it, so the consuming tail still backtracks across the negated position.
//! Argument and assertion nodes become standalone runtime fragments and
//! always break the merge run. A parallel human-readable rendering is kept
//! on each fragment for diagnostics.

use std::sync::Arc;

use crate::ast::AstNode;
use crate::errors::{CompileError, syntax_error};
use crate::fragment::{
    ArgumentFragment, AssertionFragment, FragmentMatcher, NegationFragment, RegexFragment,
};
use crate::matcher::CompiledMatcher;
use crate::registry::{AssertionRegistry, DataTypeRegistry};

/// Lower a normalized AST into an ordered fragment list.
pub(crate) fn compile_ast(
    ast: AstNode,
    types: &DataTypeRegistry,
    assertions: &AssertionRegistry,
) -> Result<CompiledMatcher, CompileError> {
    let children = match ast {
        AstNode::Sequence(children) => children,
        other => vec![other],
    };

    let mut fragments = Vec::new();
    let mut run = Run::Idle;
    for child in children {
        match child {
            AstNode::Argument(payload) => {
                run.finish(&mut fragments)?;
                fragments.push(FragmentMatcher::Argument(argument_fragment(
                    &payload, types,
                )?));
            }
            AstNode::Assertion(payload) => {
                run.finish(&mut fragments)?;
                fragments.push(FragmentMatcher::Assertion(assertion_fragment(
                    &payload, assertions,
                )?));
            }
            AstNode::Negation(inner) => {
                run.finish(&mut fragments)?;
                run = negated_run(&inner)?;
            }
            node => {
                let Some(regex) = render_regex(&node) else {
                    return Err(syntax_error("node cannot be rendered to a pattern", 0, None));
                };
                let human = render_human(&node).unwrap_or_default();
                run.append(&node, &regex, &human);
            }
        }
    }
    run.finish(&mut fragments)?;

    Ok(CompiledMatcher::new(fragments))
}

/// Merge state over a run of regex-renderable siblings.
enum Run {
    Idle,
    /// Plain merged regex run.
    Plain(PendingRegex),
    /// Open negation whose tail keeps absorbing renderable siblings.
    Negated {
        veto: String,
        tail: PendingRegex,
        human: String,
    },
}

impl Run {
    fn append(&mut self, node: &AstNode, regex: &str, human: &str) {
        match self {
            Self::Idle => {
                *self = Self::Plain(PendingRegex {
                    pattern: regex.to_string(),
                    human: human.to_string(),
                });
            }
            Self::Plain(pending) | Self::Negated { tail: pending, .. } => {
                pending.merge(node, regex, human);
            }
        }
    }

    fn finish(&mut self, fragments: &mut Vec<FragmentMatcher>) -> Result<(), CompileError> {
        match std::mem::replace(self, Self::Idle) {
            Self::Idle => Ok(()),
            Self::Plain(pending) => {
                fragments.push(FragmentMatcher::Regex(RegexFragment::new(
                    &pending.pattern,
                    pending.human,
                )?));
                Ok(())
            }
            Self::Negated { veto, tail, human } => {
                let human = format!("{human}{}", tail.human);
                fragments.push(FragmentMatcher::Negation(NegationFragment::new(
                    &veto,
                    &tail.pattern,
                    human,
                )?));
                Ok(())
            }
        }
    }
}

/// Accumulates one merged run of regex text and its human-readable mirror.
struct PendingRegex {
    pattern: String,
    human: String,
}

impl PendingRegex {
    fn merge(&mut self, node: &AstNode, regex: &str, human: &str) {
        // An optional or wildcard neighbour may be absent from the input, so
        // a mandatory whitespace tail on the left loosens to optional.
        if loosens_left_boundary(node) && self.pattern.ends_with(r"\s+)") {
            let cut = self.pattern.len() - 4;
            self.pattern.truncate(cut);
            self.pattern.push_str(r"\s*)");
        }
        self.pattern.push_str(regex);
        self.human.push_str(human);
    }
}

fn loosens_left_boundary(node: &AstNode) -> bool {
    matches!(node, AstNode::Optional(_) | AstNode::Wildcard)
}

fn negated_run(inner: &AstNode) -> Result<Run, CompileError> {
    let AstNode::Literal(target) = inner else {
        return Err(syntax_error("negation target must be a literal", 0, None));
    };
    let escaped = escape_literal(target);
    let (veto, seed, human) = if target.contains(' ') {
        (
            format!(r"^({escaped})"),
            r".*".to_string(),
            format!("^[{target}]"),
        )
    } else {
        (
            format!(r"^({escaped})\b"),
            r"\S+".to_string(),
            format!("^{target}"),
        )
    };
    Ok(Run::Negated {
        veto,
        tail: PendingRegex {
            pattern: seed,
            human: String::new(),
        },
        human,
    })
}

/// Render a structural node to regex text; `None` for nodes that only exist
/// as runtime fragments.
pub(crate) fn render_regex(node: &AstNode) -> Option<String> {
    match node {
        AstNode::Literal(text) => Some(format!("({})", escape_literal(text))),
        AstNode::Wildcard => Some("(.*)".to_string()),
        AstNode::Optional(inner) => Some(format!("{}?", render_regex(inner)?)),
        AstNode::Choice(branches) => {
            let mut parts = Vec::with_capacity(branches.len());
            for branch in branches {
                parts.push(render_regex(branch)?);
            }
            Some(format!("({})", parts.join("|")))
        }
        AstNode::Sequence(children) => {
            let mut out = String::new();
            for child in children {
                out.push_str(&render_regex(child)?);
            }
            Some(out)
        }
        AstNode::Negation(_) | AstNode::Argument(_) | AstNode::Assertion(_) => None,
    }
}

/// Mirror of [`render_regex`] for diagnostics; wildcards render as a
/// placeholder marker and choices keep their regex form.
pub(crate) fn render_human(node: &AstNode) -> Option<String> {
    match node {
        AstNode::Literal(text) => Some(text.clone()),
        AstNode::Wildcard => Some("<any>".to_string()),
        AstNode::Optional(inner) => Some(format!("{}?", render_human(inner)?)),
        AstNode::Choice(_) => render_regex(node),
        AstNode::Sequence(children) => {
            let mut out = String::new();
            for child in children {
                out.push_str(&render_human(child)?);
            }
            Some(out)
        }
        AstNode::Negation(_) | AstNode::Argument(_) | AstNode::Assertion(_) => None,
    }
}

/// Escape literal text for regex inclusion, turning each blank run into a
/// mandatory whitespace class.
pub(crate) fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut first = true;
    for chunk in text.split(' ') {
        if !first {
            out.push_str(r"\s+");
        }
        out.push_str(&regex::escape(chunk));
        first = false;
    }
    out
}

fn argument_fragment(
    payload: &str,
    types: &DataTypeRegistry,
) -> Result<ArgumentFragment, CompileError> {
    let (name, type_name) = match payload.split_once(':') {
        Some((name, type_name)) => (name, type_name),
        None => (payload, payload),
    };
    let data_type = types
        .by_name(type_name)
        .ok_or_else(|| CompileError::UnknownDataType(type_name.to_string()))?;
    Ok(ArgumentFragment::new(name, Arc::clone(data_type)))
}

fn assertion_fragment(
    payload: &str,
    assertions: &AssertionRegistry,
) -> Result<AssertionFragment, CompileError> {
    let capability_name = payload
        .split_once(':')
        .map_or(payload, |(_, capability)| capability);
    let capability = assertions
        .by_name(capability_name)
        .ok_or_else(|| CompileError::UnknownCapability(capability_name.to_string()))?;
    Ok(AssertionFragment::new(Arc::clone(capability)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{builder::build, lexer::tokenize};
    use crate::test_support::{sample_assertions, sample_types};

    fn fragments(template: &str) -> Vec<FragmentMatcher> {
        let tokens = match tokenize(template) {
            Ok(tokens) => tokens,
            Err(err) => panic!("template {template:?} should tokenize: {err}"),
        };
        let ast = match build(tokens) {
            Ok(ast) => ast,
            Err(err) => panic!("template {template:?} should build: {err}"),
        };
        match compile_ast(ast, &sample_types(), &sample_assertions()) {
            Ok(matcher) => matcher.into_fragments(),
            Err(err) => panic!("template {template:?} should compile: {err}"),
        }
    }

    fn regex_text(template: &str) -> String {
        let compiled = fragments(template);
        assert_eq!(compiled.len(), 1, "expected one merged fragment");
        match compiled.into_iter().next() {
            Some(FragmentMatcher::Regex(fragment)) => fragment.pattern().to_string(),
            other => panic!("expected a regex fragment, got {other:?}"),
        }
    }

    #[test]
    fn renders_literal_with_mandatory_whitespace() {
        assert_eq!(regex_text("a b"), r"(a\s+b)");
    }

    #[test]
    fn renders_choice_as_grouped_alternation() {
        assert_eq!(regex_text("red|blue|green"), r"((red)|(blue)|(green))");
    }

    #[test]
    fn renders_leading_optional_without_boundary_correction() {
        assert_eq!(regex_text("(optional )text"), r"(optional\s+)?(text)");
    }

    #[test]
    fn loosens_mandatory_whitespace_before_an_optional() {
        assert_eq!(regex_text("text (optional)"), r"(text\s*)(optional)?");
    }

    #[test]
    fn loosens_mandatory_whitespace_before_a_wildcard() {
        assert_eq!(regex_text("text *"), r"(text\s*)(.*)");
    }

    #[test]
    fn keeps_mandatory_whitespace_between_literals() {
        assert_eq!(regex_text("a [b c] d"), r"(a\s+)(b\s+c)(\s+d)");
    }

    #[test]
    fn escapes_regex_metacharacters_in_literals() {
        assert_eq!(regex_text(r"cost: 3\* more"), r"(cost:\s+3\*\s+more)");
    }

    #[test]
    fn argument_breaks_the_merge_run() {
        let compiled = fragments("count is {n:number} now");
        assert_eq!(compiled.len(), 3);
        assert!(matches!(compiled[0], FragmentMatcher::Regex(_)));
        assert!(matches!(compiled[1], FragmentMatcher::Argument(_)));
        assert!(matches!(compiled[2], FragmentMatcher::Regex(_)));
    }

    #[test]
    fn negation_absorbs_its_renderable_tail() {
        let compiled = fragments("do not ^stop now");
        assert_eq!(compiled.len(), 2);
        assert!(matches!(compiled[0], FragmentMatcher::Regex(_)));
        let Some(FragmentMatcher::Negation(negation)) = compiled.get(1) else {
            panic!("expected a negation fragment");
        };
        assert_eq!(negation.veto_pattern(), r"^(stop)\b");
        assert_eq!(negation.tail_pattern(), r"\S+(\s+now)");
    }

    #[test]
    fn negated_phrase_uses_a_greedy_tail() {
        let compiled = fragments("^[dark blue] sky");
        assert_eq!(compiled.len(), 1);
        let Some(FragmentMatcher::Negation(negation)) = compiled.first() else {
            panic!("expected a negation fragment");
        };
        assert_eq!(negation.veto_pattern(), r"^(dark\s+blue)");
        assert_eq!(negation.tail_pattern(), r".*(\s+sky)");
        assert_eq!(negation.human_form(), "^[dark blue] sky");
    }

    #[test]
    fn argument_ends_an_open_negation_tail() {
        let compiled = fragments("^skip to {n:number}");
        assert_eq!(compiled.len(), 2);
        let Some(FragmentMatcher::Negation(negation)) = compiled.first() else {
            panic!("expected a negation fragment");
        };
        assert_eq!(negation.tail_pattern(), r"\S+(\s+to\s+)");
        assert!(matches!(compiled[1], FragmentMatcher::Argument(_)));
    }

    #[test]
    fn argument_without_a_type_reuses_its_name() {
        let compiled = fragments("{number}");
        let Some(FragmentMatcher::Argument(argument)) = compiled.first() else {
            panic!("expected an argument fragment");
        };
        assert_eq!(argument.name(), "number");
        assert_eq!(argument.data_type().name(), "number");
    }

    #[test]
    fn unknown_data_type_is_reported_by_name() {
        let tokens = match tokenize("{n:missing}") {
            Ok(tokens) => tokens,
            Err(err) => panic!("template should tokenize: {err}"),
        };
        let ast = match build(tokens) {
            Ok(ast) => ast,
            Err(err) => panic!("template should build: {err}"),
        };
        match compile_ast(ast, &sample_types(), &sample_assertions()) {
            Err(CompileError::UnknownDataType(name)) => assert_eq!(name, "missing"),
            other => panic!("expected an unknown data type error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_capability_is_reported_by_name() {
        let tokens = match tokenize("{{missing-check}}") {
            Ok(tokens) => tokens,
            Err(err) => panic!("template should tokenize: {err}"),
        };
        let ast = match build(tokens) {
            Ok(ast) => ast,
            Err(err) => panic!("template should build: {err}"),
        };
        match compile_ast(ast, &sample_types(), &sample_assertions()) {
            Err(CompileError::UnknownCapability(name)) => assert_eq!(name, "missing-check"),
            other => panic!("expected an unknown capability error, got {other:?}"),
        }
    }

    #[test]
    fn human_form_marks_wildcards() {
        let compiled = fragments("fetch * quickly");
        let Some(FragmentMatcher::Regex(fragment)) = compiled.first() else {
            panic!("expected a regex fragment");
        };
        assert_eq!(fragment.human_form(), "fetch <any> quickly");
    }
}
