//! Syntax errors.
use std::fmt;

use rux_source::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken { expected: String, found: String },
    UnexpectedEof { expected: String },
    /// `a < b < c` without parentheses.
    ChainedComparison,
    /// Call syntax applied to something that is not a path, e.g.
    /// `(f)()`.
    CallOnNonPath,
    /// A path with more than the two segments the language admits.
    PathTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                write!(f, "expected {expected}, found end of input")
            }
            ParseErrorKind::ChainedComparison => {
                write!(f, "comparison operators cannot be chained")
            }
            ParseErrorKind::CallOnNonPath => {
                write!(f, "only named functions can be called")
            }
            ParseErrorKind::PathTooLong => {
                write!(f, "paths have at most two segments")
            }
        }
    }
}

impl std::error::Error for ParseError {}
