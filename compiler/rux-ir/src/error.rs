//! Fatal IR-construction errors.
//!
//! Any invariant violation while building IR aborts the compilation;
//! there is no recovery and no partial module.
use std::fmt;

pub type IrResult<T> = Result<T, IrError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    /// A symbol the lowerer expected to exist has no IR counterpart.
    MissingSymbol(String),
    /// A constant whose value is not a compile-time integer.
    NonIntegerConstant(String),
    /// Structural invariant violation: mismatched operand types, a
    /// PHI width mismatch, a missing insertion point, a second
    /// terminator.
    InvalidIr(String),
    /// A construct the lowering stage does not support.
    UnsupportedFeature(String),
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::MissingSymbol(name) => write!(f, "missing symbol `{name}`"),
            IrError::NonIntegerConstant(name) => {
                write!(f, "constant `{name}` does not have a compile-time integer value")
            }
            IrError::InvalidIr(message) => write!(f, "invalid IR: {message}"),
            IrError::UnsupportedFeature(what) => {
                write!(f, "unsupported construct: {what}")
            }
        }
    }
}

impl std::error::Error for IrError {}
