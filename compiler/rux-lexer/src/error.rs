//! Lexical errors.
use std::fmt;

use rux_source::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub span: Span,
}

impl LexerError {
    pub fn new(kind: LexerErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    UnexpectedCharacter(char),
    UnterminatedString,
    UnterminatedChar,
    UnterminatedBlockComment,
    InvalidEscape(char),
    /// A digit that is not valid for the literal's radix, or a
    /// literal consisting only of a radix prefix.
    InvalidDigit { radix: u32 },
    /// An integer literal that does not fit in 64 bits, or a suffix
    /// that is not one of `i32`/`u32`/`isize`/`usize`.
    InvalidIntLiteral(String),
    /// A character literal holding zero or more than one character.
    InvalidCharLiteral,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexerErrorKind::UnexpectedCharacter(c) => {
                write!(f, "unexpected character `{c}`")
            }
            LexerErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            LexerErrorKind::UnterminatedChar => write!(f, "unterminated character literal"),
            LexerErrorKind::UnterminatedBlockComment => {
                write!(f, "unterminated block comment")
            }
            LexerErrorKind::InvalidEscape(c) => {
                write!(f, "invalid escape sequence `\\{c}`")
            }
            LexerErrorKind::InvalidDigit { radix } => {
                write!(f, "invalid digit for base {radix} literal")
            }
            LexerErrorKind::InvalidIntLiteral(text) => {
                write!(f, "invalid integer literal `{text}`")
            }
            LexerErrorKind::InvalidCharLiteral => {
                write!(f, "character literal must hold exactly one character")
            }
        }
    }
}

impl std::error::Error for LexerError {}
