//! The Rux intermediate representation: a typed, SSA-form subset of
//! LLVM IR with opaque pointers.
//!
//! [ir::IrCtx] owns the uniquing tables for types and constants and
//! the arenas for values, blocks and functions; [builder::Builder]
//! is the stateful cursor that appends type-checked instructions;
//! [write::ModuleWriter] renders the textual form.
pub mod builder;
pub mod error;
pub mod ir;
pub mod ty;
pub mod write;

pub use builder::{Builder, MEMCPY};
pub use error::{IrError, IrResult};
pub use ir::{
    BasicBlockData, BinOp, BlockId, ConstKind, FuncId, Function, ICmpCond, Inst, IrCtx, Module,
    ValueData, ValueId, ValueKind,
};
pub use ty::{IrTy, StructId, StructTy, TyId, TyStore};
pub use write::ModuleWriter;
