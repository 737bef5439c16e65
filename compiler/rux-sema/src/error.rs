//! Semantic errors raised by the analysis passes.
//!
//! Each pass aborts at the first error; there is no recovery. Every
//! error carries the span of the offending construct and enough
//! payload to render a message naming it.
use std::fmt;

use rux_source::Span;

use crate::ty::Ty;

pub type SemaResult<T> = Result<T, SemanticError>;

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticErrorKind {
    /// A sibling declaration with the same name already exists.
    Redeclaration { name: String },
    UnresolvedName { name: String },
    UnresolvedType { name: String },
    TypeMismatch { expected: Ty, found: Ty },
    /// The expression cannot be assigned to or borrowed from.
    NotAPlace,
    /// The place is not behind a `mut` binding or `&mut` reference.
    NotMutable,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,
    InvalidCast { from: Ty, to: Ty },
    /// An unsuffixed integer literal that no context narrowed to a
    /// concrete type.
    AmbiguousIntegerLiteral,
    ArityMismatch { name: String, expected: usize, found: usize },
    /// `self` used outside a method, a receiver that does not satisfy
    /// the declared self parameter, or a method named without one.
    InvalidSelf { message: String },
    /// Borrow of an expression that has no address.
    NotAddressable,
    /// A type, function or trait named where a value is required.
    NotAValue { name: String },
    /// Call syntax on a symbol that is not a function.
    NotAFunction { name: String },
    /// A binding with neither annotation nor initialiser.
    CannotInfer { name: String },
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SemanticErrorKind::Redeclaration { name } => {
                write!(f, "the name `{name}` is declared twice in this scope")
            }
            SemanticErrorKind::UnresolvedName { name } => {
                write!(f, "cannot find `{name}` in this scope")
            }
            SemanticErrorKind::UnresolvedType { name } => {
                write!(f, "cannot find type `{name}`")
            }
            SemanticErrorKind::TypeMismatch { expected, found } => {
                write!(f, "mismatched types: expected `{expected}`, found `{found}`")
            }
            SemanticErrorKind::NotAPlace => {
                write!(f, "expression is not assignable")
            }
            SemanticErrorKind::NotMutable => {
                write!(f, "cannot mutate through an immutable binding or reference")
            }
            SemanticErrorKind::BreakOutsideLoop => {
                write!(f, "`break` outside of a loop")
            }
            SemanticErrorKind::ContinueOutsideLoop => {
                write!(f, "`continue` outside of a loop")
            }
            SemanticErrorKind::ReturnOutsideFunction => {
                write!(f, "`return` outside of a function")
            }
            SemanticErrorKind::InvalidCast { from, to } => {
                write!(f, "invalid cast from `{from}` to `{to}`")
            }
            SemanticErrorKind::AmbiguousIntegerLiteral => {
                write!(f, "cannot determine the type of this integer literal")
            }
            SemanticErrorKind::ArityMismatch { name, expected, found } => {
                write!(
                    f,
                    "`{name}` takes {expected} argument{} but {found} {} supplied",
                    if *expected == 1 { "" } else { "s" },
                    if *found == 1 { "was" } else { "were" },
                )
            }
            SemanticErrorKind::InvalidSelf { message } => write!(f, "{message}"),
            SemanticErrorKind::NotAddressable => {
                write!(f, "cannot borrow an expression that has no address")
            }
            SemanticErrorKind::NotAValue { name } => {
                write!(f, "`{name}` cannot be used as a value")
            }
            SemanticErrorKind::NotAFunction { name } => {
                write!(f, "`{name}` is not a function")
            }
            SemanticErrorKind::CannotInfer { name } => {
                write!(f, "cannot infer the type of `{name}`; a type annotation is needed")
            }
        }
    }
}

impl std::error::Error for SemanticError {}
