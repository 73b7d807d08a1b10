//! Template tokenizer converting pattern strings into typed tokens.
//!
//! The closed structural set is `^ ( ) [ ] { } | * \`. Everything else
//! accumulates into a literal buffer that is flushed whenever a structural
//! symbol is met or the input ends. Two consecutive braces form assertion
//! delimiters rather than argument delimiters, and runs of two or more
//! whitespace characters collapse to a single blank inside literal runs.

use crate::errors::{CompileError, syntax_error};

/// Structural symbols recognised by the tokenizer; `\` escapes any of them.
const STRUCTURAL: [char; 10] = ['^', '(', ')', '[', ']', '{', '}', '|', '*', '\\'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Zero-based byte offset of the token's first character.
    pub start: usize,
    /// Zero-based byte offset one past the token's last character.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Literal(String),
    Wildcard,
    Negation,
    OptionalStart,
    OptionalEnd,
    ChoiceSeparator,
    GroupStart,
    GroupEnd,
    ArgumentStart,
    ArgumentEnd,
    AssertionStart,
    AssertionEnd,
}

fn flush_literal(buffer: &mut String, start: usize, end: usize, tokens: &mut Vec<Token>) {
    if !buffer.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Literal(std::mem::take(buffer)),
            start,
            end,
        });
    }
}

/// Scan a raw template into a token sequence.
///
/// Deterministic and pure; the single failure mode is escaping a character
/// outside the structural set (or a dangling escape at the end of input).
pub(crate) fn tokenize(template: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut buffer_start = 0usize;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let symbol = match ch {
            '\\' => match chars.next() {
                Some((_, next)) if STRUCTURAL.contains(&next) => {
                    if buffer.is_empty() {
                        buffer_start = pos;
                    }
                    buffer.push(next);
                    continue;
                }
                Some((next_pos, next)) => {
                    return Err(syntax_error(
                        "cannot escape a non-structural character",
                        next_pos,
                        Some(next.to_string()),
                    ));
                }
                None => {
                    return Err(syntax_error("dangling escape at end of template", pos, None));
                }
            },
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    Token {
                        kind: TokenKind::AssertionStart,
                        start: pos,
                        end: pos + 2,
                    }
                } else {
                    Token {
                        kind: TokenKind::ArgumentStart,
                        start: pos,
                        end: pos + 1,
                    }
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    Token {
                        kind: TokenKind::AssertionEnd,
                        start: pos,
                        end: pos + 2,
                    }
                } else {
                    Token {
                        kind: TokenKind::ArgumentEnd,
                        start: pos,
                        end: pos + 1,
                    }
                }
            }
            '^' => single(TokenKind::Negation, pos),
            '(' => single(TokenKind::OptionalStart, pos),
            ')' => single(TokenKind::OptionalEnd, pos),
            '[' => single(TokenKind::GroupStart, pos),
            ']' => single(TokenKind::GroupEnd, pos),
            '|' => single(TokenKind::ChoiceSeparator, pos),
            '*' => single(TokenKind::Wildcard, pos),
            _ if ch.is_whitespace() => {
                // collapse a whitespace run to one logical blank
                while matches!(chars.peek(), Some((_, next)) if next.is_whitespace()) {
                    chars.next();
                }
                if buffer.is_empty() {
                    buffer_start = pos;
                }
                buffer.push(' ');
                continue;
            }
            _ => {
                if buffer.is_empty() {
                    buffer_start = pos;
                }
                buffer.push(ch);
                continue;
            }
        };
        flush_literal(&mut buffer, buffer_start, pos, &mut tokens);
        tokens.push(symbol);
    }

    flush_literal(&mut buffer, buffer_start, template.len(), &mut tokens);
    Ok(tokens)
}

fn single(kind: TokenKind, pos: usize) -> Token {
    Token {
        kind,
        start: pos,
        end: pos + 1,
    }
}
