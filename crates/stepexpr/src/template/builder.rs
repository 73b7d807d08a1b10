//! Token-stream to AST automaton.
//!
//! The parser is an explicit push-down automaton: a stack of [`Frame`]
//! values, each variant one automaton state owning its partially-built
//! node. Entering a bracketed construct pushes a frame; closing it pops the
//! frame and appends the finished node to the sequence beneath. The
//! automaton must end with only the root sequence on the stack, otherwise
//! the template has an unclosed construct.
//!
//! Two rules need token re-feeding and are served by the `VecDeque` queue:
//! a negated multi-word literal surrenders everything after its first word
//! back to the automaton, and a word choice ends as soon as a branch is
//! followed by more literal text.

use std::collections::VecDeque;

use crate::ast::AstNode;
use crate::errors::{CompileError, syntax_error};

use super::lexer::{Token, TokenKind};

/// Automaton state plus the node being assembled in that state.
#[derive(Debug)]
enum Frame {
    /// Top-level sequence; the only frame that accepts finished nodes.
    Sequence { children: Vec<AstNode> },
    /// After `^`, awaiting the negated word or a bracketed phrase.
    Negation { opened: usize },
    /// Inside `^[...]`, accumulating the negated phrase.
    NegationGroup { text: String, opened: usize },
    /// Inside `(...)`, accumulating literal text.
    Optional { text: String, opened: usize },
    /// Inside `(a|b...)`, accumulating branches.
    OptionalChoice {
        branches: Vec<AstNode>,
        text: String,
        opened: usize,
    },
    /// Top-level `a|b` alternation over single words.
    WordChoice {
        branches: Vec<AstNode>,
        expects_branch: bool,
        opened: usize,
    },
    /// Inside `[...]`, accumulating literal text.
    Group { text: String, opened: usize },
    /// Inside `[a|b...]`, accumulating branches.
    GroupChoice {
        branches: Vec<AstNode>,
        text: String,
        opened: usize,
    },
    /// Inside `{...}`, accumulating the argument payload.
    Argument { text: String, opened: usize },
    /// Inside `{{...}}`, accumulating the assertion payload.
    Assertion { text: String, opened: usize },
}

/// Assemble the token stream into a normalized AST.
pub(crate) fn build(tokens: Vec<Token>) -> Result<AstNode, CompileError> {
    let mut queue: VecDeque<Token> = tokens.into();
    let mut stack: Vec<Frame> = vec![Frame::Sequence {
        children: Vec::new(),
    }];

    while let Some(token) = queue.pop_front() {
        step(&mut stack, &mut queue, token)?;
    }
    finish(stack)
}

fn step(
    stack: &mut Vec<Frame>,
    queue: &mut VecDeque<Token>,
    token: Token,
) -> Result<(), CompileError> {
    let Some(frame) = stack.pop() else {
        return Err(syntax_error("automaton stack underflow", token.start, None));
    };
    match frame {
        Frame::Sequence { children } => on_sequence(stack, children, token),
        Frame::Negation { opened } => on_negation(stack, queue, opened, token),
        Frame::NegationGroup { text, opened } => on_negation_group(stack, text, opened, token),
        Frame::Optional { text, opened } => on_optional(stack, text, opened, token),
        Frame::OptionalChoice {
            branches,
            text,
            opened,
        } => on_optional_choice(stack, branches, text, opened, token),
        Frame::WordChoice {
            branches,
            expects_branch,
            opened,
        } => on_word_choice(stack, queue, branches, expects_branch, opened, token),
        Frame::Group { text, opened } => on_group(stack, text, opened, token),
        Frame::GroupChoice {
            branches,
            text,
            opened,
        } => on_group_choice(stack, branches, text, opened, token),
        Frame::Argument { text, opened } => on_argument(stack, text, opened, token),
        Frame::Assertion { text, opened } => on_assertion(stack, text, opened, token),
    }
}

/// Append a finished node to the sequence now on top of the stack.
fn append_node(stack: &mut Vec<Frame>, node: AstNode, position: usize) -> Result<(), CompileError> {
    if let Some(Frame::Sequence { children }) = stack.last_mut() {
        children.push(node);
        Ok(())
    } else {
        Err(syntax_error(
            "construct closed in an unexpected context",
            position,
            None,
        ))
    }
}

fn on_sequence(
    stack: &mut Vec<Frame>,
    mut children: Vec<AstNode>,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(text) => {
            children.push(AstNode::literal(text));
            stack.push(Frame::Sequence { children });
            Ok(())
        }
        TokenKind::Wildcard => {
            children.push(AstNode::Wildcard);
            stack.push(Frame::Sequence { children });
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            // Reinterpret the trailing word of the previous literal as the
            // first branch of a word choice.
            let Some(AstNode::Literal(previous)) = children.pop() else {
                return Err(syntax_error(
                    "choice separator has no preceding literal",
                    token.start,
                    None,
                ));
            };
            let branches = if let Some(cut) = previous.rfind(' ') {
                let word = previous[cut + 1..].to_string();
                if word.is_empty() {
                    return Err(syntax_error(
                        "choice separator must follow a word",
                        token.start,
                        None,
                    ));
                }
                children.push(AstNode::literal(&previous[..=cut]));
                vec![AstNode::literal(word)]
            } else {
                vec![AstNode::Literal(previous)]
            };
            stack.push(Frame::Sequence { children });
            stack.push(Frame::WordChoice {
                branches,
                expects_branch: true,
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::Negation => {
            stack.push(Frame::Sequence { children });
            stack.push(Frame::Negation {
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::OptionalStart => {
            stack.push(Frame::Sequence { children });
            stack.push(Frame::Optional {
                text: String::new(),
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::GroupStart => {
            stack.push(Frame::Sequence { children });
            stack.push(Frame::Group {
                text: String::new(),
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::ArgumentStart => {
            stack.push(Frame::Sequence { children });
            stack.push(Frame::Argument {
                text: String::new(),
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::AssertionStart => {
            stack.push(Frame::Sequence { children });
            stack.push(Frame::Assertion {
                text: String::new(),
                opened: token.start,
            });
            Ok(())
        }
        TokenKind::OptionalEnd => Err(syntax_error("unmatched `)`", token.start, None)),
        TokenKind::GroupEnd => Err(syntax_error("unmatched `]`", token.start, None)),
        TokenKind::ArgumentEnd => Err(syntax_error("unmatched `}`", token.start, None)),
        TokenKind::AssertionEnd => Err(syntax_error("unmatched `}}`", token.start, None)),
    }
}

fn on_negation(
    stack: &mut Vec<Frame>,
    queue: &mut VecDeque<Token>,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(text) => {
            if text.starts_with(' ') {
                return Err(syntax_error(
                    "negation must be followed immediately by a word",
                    token.start,
                    None,
                ));
            }
            if let Some(cut) = text.find(' ') {
                // Only the first word is negated; the rest re-enters the
                // automaton as leftover literal input.
                let node = AstNode::negation(AstNode::literal(&text[..cut]));
                append_node(stack, node, token.start)?;
                queue.push_front(Token {
                    kind: TokenKind::Literal(text[cut..].to_string()),
                    start: token.start + cut,
                    end: token.end,
                });
            } else {
                append_node(stack, AstNode::negation(AstNode::literal(text)), token.start)?;
            }
            Ok(())
        }
        TokenKind::GroupStart => {
            stack.push(Frame::Negation { opened });
            stack.push(Frame::NegationGroup {
                text: String::new(),
                opened: token.start,
            });
            Ok(())
        }
        _ => Err(syntax_error(
            "negation expects a word or a bracketed phrase",
            token.start,
            None,
        )),
    }
}

fn on_negation_group(
    stack: &mut Vec<Frame>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::NegationGroup { text, opened });
            Ok(())
        }
        TokenKind::GroupEnd => {
            let Some(Frame::Negation { .. }) = stack.pop() else {
                return Err(syntax_error(
                    "negated group closed outside a negation",
                    token.start,
                    None,
                ));
            };
            append_node(stack, AstNode::negation(AstNode::literal(text)), token.start)
        }
        _ => Err(syntax_error(
            "unexpected token inside a negated group",
            token.start,
            None,
        )),
    }
}

fn on_optional(
    stack: &mut Vec<Frame>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::Optional { text, opened });
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            // Text so far seeds the first branch; the optional frame stays
            // beneath so the closing symbol pops both levels.
            stack.push(Frame::Optional {
                text: String::new(),
                opened,
            });
            stack.push(Frame::OptionalChoice {
                branches: vec![AstNode::literal(text)],
                text: String::new(),
                opened,
            });
            Ok(())
        }
        TokenKind::OptionalEnd => append_node(
            stack,
            AstNode::optional(AstNode::literal(text)),
            token.start,
        ),
        _ => Err(syntax_error(
            "unexpected token inside an optional",
            token.start,
            None,
        )),
    }
}

fn on_optional_choice(
    stack: &mut Vec<Frame>,
    mut branches: Vec<AstNode>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::OptionalChoice {
                branches,
                text,
                opened,
            });
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            branches.push(AstNode::literal(std::mem::take(&mut text)));
            stack.push(Frame::OptionalChoice {
                branches,
                text,
                opened,
            });
            Ok(())
        }
        TokenKind::OptionalEnd => {
            branches.push(AstNode::literal(text));
            let Some(Frame::Optional { .. }) = stack.pop() else {
                return Err(syntax_error(
                    "optional choice closed outside an optional",
                    token.start,
                    None,
                ));
            };
            append_node(
                stack,
                AstNode::optional(AstNode::choice(branches)),
                token.start,
            )
        }
        _ => Err(syntax_error(
            "unexpected token inside an optional",
            token.start,
            None,
        )),
    }
}

fn on_word_choice(
    stack: &mut Vec<Frame>,
    queue: &mut VecDeque<Token>,
    mut branches: Vec<AstNode>,
    expects_branch: bool,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    let (start, end) = (token.start, token.end);
    match token.kind {
        TokenKind::Literal(text) if expects_branch => {
            if text.starts_with(' ') {
                return Err(syntax_error(
                    "choice branch must not start with a blank",
                    start,
                    None,
                ));
            }
            if let Some(cut) = text.find(' ') {
                // The first word completes the choice; the rest re-enters
                // the automaton as leftover literal input.
                branches.push(AstNode::literal(&text[..cut]));
                append_node(stack, AstNode::choice(branches), start)?;
                queue.push_front(Token {
                    kind: TokenKind::Literal(text[cut..].to_string()),
                    start: start + cut,
                    end,
                });
            } else {
                branches.push(AstNode::literal(text));
                stack.push(Frame::WordChoice {
                    branches,
                    expects_branch: false,
                    opened,
                });
            }
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            if expects_branch {
                return Err(syntax_error(
                    "choice separator has no preceding literal",
                    start,
                    None,
                ));
            }
            stack.push(Frame::WordChoice {
                branches,
                expects_branch: true,
                opened,
            });
            Ok(())
        }
        kind => {
            if expects_branch {
                return Err(syntax_error(
                    "choice separator must be followed by a word",
                    start,
                    None,
                ));
            }
            // Any other token ends the alternation; hand it back.
            append_node(stack, AstNode::choice(branches), start)?;
            queue.push_front(Token { kind, start, end });
            Ok(())
        }
    }
}

fn on_group(
    stack: &mut Vec<Frame>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::Group { text, opened });
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            stack.push(Frame::Group {
                text: String::new(),
                opened,
            });
            stack.push(Frame::GroupChoice {
                branches: vec![AstNode::literal(text)],
                text: String::new(),
                opened,
            });
            Ok(())
        }
        TokenKind::GroupEnd => append_node(stack, AstNode::literal(text), token.start),
        _ => Err(syntax_error(
            "unexpected token inside a group",
            token.start,
            None,
        )),
    }
}

fn on_group_choice(
    stack: &mut Vec<Frame>,
    mut branches: Vec<AstNode>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::GroupChoice {
                branches,
                text,
                opened,
            });
            Ok(())
        }
        TokenKind::ChoiceSeparator => {
            branches.push(AstNode::literal(std::mem::take(&mut text)));
            stack.push(Frame::GroupChoice {
                branches,
                text,
                opened,
            });
            Ok(())
        }
        TokenKind::GroupEnd => {
            branches.push(AstNode::literal(text));
            let Some(Frame::Group { .. }) = stack.pop() else {
                return Err(syntax_error(
                    "group choice closed outside a group",
                    token.start,
                    None,
                ));
            };
            append_node(stack, AstNode::choice(branches), token.start)
        }
        _ => Err(syntax_error(
            "unexpected token inside a group",
            token.start,
            None,
        )),
    }
}

fn on_argument(
    stack: &mut Vec<Frame>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::Argument { text, opened });
            Ok(())
        }
        TokenKind::ArgumentEnd => {
            if text.is_empty() {
                return Err(syntax_error("empty argument", token.start, None));
            }
            if text.contains(' ') {
                return Err(syntax_error(
                    "argument must be a single word",
                    opened,
                    Some(text),
                ));
            }
            append_node(stack, AstNode::Argument(text), token.start)
        }
        _ => Err(syntax_error(
            "unexpected token inside an argument",
            token.start,
            None,
        )),
    }
}

fn on_assertion(
    stack: &mut Vec<Frame>,
    mut text: String,
    opened: usize,
    token: Token,
) -> Result<(), CompileError> {
    match token.kind {
        TokenKind::Literal(chunk) => {
            text.push_str(&chunk);
            stack.push(Frame::Assertion { text, opened });
            Ok(())
        }
        TokenKind::AssertionEnd => {
            if text.is_empty() {
                return Err(syntax_error("empty assertion", token.start, None));
            }
            if text.contains(' ') {
                return Err(syntax_error(
                    "assertion must be a single word",
                    opened,
                    Some(text),
                ));
            }
            append_node(stack, AstNode::Assertion(text), token.start)
        }
        _ => Err(syntax_error(
            "unexpected token inside an assertion",
            token.start,
            None,
        )),
    }
}

fn finish(mut stack: Vec<Frame>) -> Result<AstNode, CompileError> {
    // A trailing word choice ends with the input.
    if matches!(stack.last(), Some(Frame::WordChoice { .. })) {
        if let Some(Frame::WordChoice {
            branches,
            expects_branch,
            opened,
        }) = stack.pop()
        {
            if expects_branch {
                return Err(syntax_error(
                    "choice separator has no trailing word",
                    opened,
                    None,
                ));
            }
            append_node(&mut stack, AstNode::choice(branches), opened)?;
        }
    }
    match stack.pop() {
        Some(Frame::Sequence { children }) if stack.is_empty() => Ok(AstNode::sequence(children)),
        Some(frame) => Err(unclosed_error(&frame)),
        None => Err(syntax_error("automaton ended without its root state", 0, None)),
    }
}

fn unclosed_error(frame: &Frame) -> CompileError {
    let (message, opened) = match frame {
        Frame::Negation { opened } => ("dangling negation", *opened),
        Frame::NegationGroup { opened, .. } => ("unclosed negated group", *opened),
        Frame::Optional { opened, .. } | Frame::OptionalChoice { opened, .. } => {
            ("unclosed optional", *opened)
        }
        Frame::Group { opened, .. } | Frame::GroupChoice { opened, .. } => {
            ("unclosed group", *opened)
        }
        Frame::Argument { opened, .. } => ("unclosed argument", *opened),
        Frame::Assertion { opened, .. } => ("unclosed assertion", *opened),
        Frame::WordChoice { opened, .. } => ("unterminated choice", *opened),
        Frame::Sequence { .. } => ("unexpected final state", 0),
    };
    syntax_error(message, opened, None)
}
