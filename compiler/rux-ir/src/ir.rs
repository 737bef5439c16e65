//! The IR object model: values, instructions, basic blocks,
//! functions, globals and the [IrCtx] arena that owns them all.
//!
//! Every value is referred to by [ValueId]; creating an instruction
//! registers the new value in each operand's `users` list, so
//! use-def edges are available without reference cycles.
use std::collections::HashMap;

use index_vec::IndexVec;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    error::{IrError, IrResult},
    ty::{IrTy, TyId, TyStore},
};

index_vec::define_index_type! {
    pub struct ValueId = u32;
}

index_vec::define_index_type! {
    pub struct BlockId = u32;
}

index_vec::define_index_type! {
    pub struct FuncId = u32;
}

/// Integer binary opcodes; `s`/`u` variants are chosen by the lowerer
/// from the source-level signedness.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    AShr,
    LShr,
}

impl BinOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::UDiv => "udiv",
            BinOp::SRem => "srem",
            BinOp::URem => "urem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::AShr => "ashr",
            BinOp::LShr => "lshr",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ICmpCond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl ICmpCond {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ICmpCond::Eq => "eq",
            ICmpCond::Ne => "ne",
            ICmpCond::Slt => "slt",
            ICmpCond::Sle => "sle",
            ICmpCond::Sgt => "sgt",
            ICmpCond::Sge => "sge",
            ICmpCond::Ult => "ult",
            ICmpCond::Ule => "ule",
            ICmpCond::Ugt => "ugt",
            ICmpCond::Uge => "uge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstKind {
    Int(u64),
    Null,
    Struct(Vec<ValueId>),
    Array(Vec<ValueId>),
}

#[derive(Debug, Clone)]
pub enum Inst {
    Binary { op: BinOp, lhs: ValueId, rhs: ValueId },
    ICmp { cond: ICmpCond, lhs: ValueId, rhs: ValueId },
    /// Result is a pointer to a fresh stack slot of `allocated`.
    Alloca { allocated: TyId },
    /// Result type is the value's own type; the pointee type printed
    /// on the instruction.
    Load { ptr: ValueId },
    Store { value: ValueId, ptr: ValueId },
    Br { target: BlockId },
    CondBr { cond: ValueId, then_target: BlockId, else_target: BlockId },
    Ret { value: Option<ValueId> },
    Phi { incomings: Vec<(ValueId, BlockId)> },
    Call { callee: FuncId, args: Vec<ValueId> },
    /// Offset computation; `base_ty` is the type the indices walk.
    Gep { base_ty: TyId, ptr: ValueId, indices: Vec<ValueId> },
    PtrToInt { ptr: ValueId },
    Zext { value: ValueId },
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. })
    }

    /// The value operands, for use-def registration.
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            Inst::Binary { lhs, rhs, .. } | Inst::ICmp { lhs, rhs, .. } => {
                SmallVec::from_slice(&[*lhs, *rhs])
            }
            Inst::Alloca { .. } => SmallVec::new(),
            Inst::Load { ptr } | Inst::PtrToInt { ptr } => SmallVec::from_slice(&[*ptr]),
            Inst::Store { value, ptr } => SmallVec::from_slice(&[*value, *ptr]),
            Inst::Br { .. } => SmallVec::new(),
            Inst::CondBr { cond, .. } => SmallVec::from_slice(&[*cond]),
            Inst::Ret { value } => value.iter().copied().collect(),
            Inst::Phi { incomings } => incomings.iter().map(|(value, _)| *value).collect(),
            Inst::Call { args, .. } => args.iter().copied().collect(),
            Inst::Gep { ptr, indices, .. } => {
                let mut operands = SmallVec::from_slice(&[*ptr]);
                operands.extend(indices.iter().copied());
                operands
            }
            Inst::Zext { value } => SmallVec::from_slice(&[*value]),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Constant(ConstKind),
    Argument { func: FuncId, index: usize },
    Global { is_const: bool, init: Option<ValueId> },
    Inst(Inst),
}

#[derive(Debug, Clone)]
pub struct ValueData {
    pub ty: TyId,
    /// SSA name without the sigil; `None` for void-typed results and
    /// constants.
    pub name: Option<String>,
    pub kind: ValueKind,
    /// Reverse use-def edges: every value that has this one as an
    /// operand.
    pub users: Vec<ValueId>,
}

impl ValueData {
    pub fn as_const_int(&self) -> Option<u64> {
        match &self.kind {
            ValueKind::Constant(ConstKind::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant(_))
    }
}

#[derive(Debug)]
pub struct BasicBlockData {
    pub label: String,
    pub insts: Vec<ValueId>,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    /// The [IrTy::Fn] type of the function.
    pub ty: TyId,
    pub args: Vec<ValueId>,
    pub blocks: Vec<BlockId>,
    /// `declare` rather than `define`.
    pub is_declaration: bool,
}

/// A compiled module: named functions and globals, in emission order.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub functions: IndexMap<String, FuncId>,
    pub globals: IndexMap<String, ValueId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: IndexMap::new(), globals: IndexMap::new() }
    }

    pub fn function(&self, name: &str) -> Option<FuncId> {
        self.functions.get(name).copied()
    }
}

/// Owns every type, value, block and function of a compilation. The
/// uniquing tables for types and constants live here; the pipeline is
/// single-threaded, so no locking is involved.
#[derive(Debug)]
pub struct IrCtx {
    pub tys: TyStore,
    values: IndexVec<ValueId, ValueData>,
    blocks: IndexVec<BlockId, BasicBlockData>,
    functions: IndexVec<FuncId, Function>,
    const_lookup: HashMap<(TyId, ConstKind), ValueId>,
}

impl IrCtx {
    pub fn new() -> Self {
        Self {
            tys: TyStore::new(),
            values: IndexVec::new(),
            blocks: IndexVec::new(),
            functions: IndexVec::new(),
            const_lookup: HashMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id]
    }

    pub fn value_ty(&self, id: ValueId) -> TyId {
        self.values[id].ty
    }

    pub(crate) fn push_value(&mut self, data: ValueData) -> ValueId {
        self.values.push(data)
    }

    pub(crate) fn add_user(&mut self, operand: ValueId, user: ValueId) {
        self.values[operand].users.push(user);
    }

    // -------------------------------------------------------------------------
    // Constants (uniqued)
    // -------------------------------------------------------------------------

    fn intern_const(&mut self, ty: TyId, kind: ConstKind) -> ValueId {
        if let Some(id) = self.const_lookup.get(&(ty, kind.clone())) {
            return *id;
        }
        let id = self.values.push(ValueData {
            ty,
            name: None,
            kind: ValueKind::Constant(kind.clone()),
            users: Vec::new(),
        });
        self.const_lookup.insert((ty, kind), id);
        id
    }

    pub fn const_int(&mut self, ty: TyId, value: u64) -> IrResult<ValueId> {
        if !self.tys.is_integer(ty) {
            return Err(IrError::InvalidIr("integer constant of non-integer type".into()));
        }
        // Values are stored truncated to the type's width so that
        // uniquing sees one representation.
        let width = self.tys.get(ty).int_width().unwrap();
        let masked = if width == 64 { value } else { value & ((1u64 << width) - 1) };
        Ok(self.intern_const(ty, ConstKind::Int(masked)))
    }

    pub fn const_null(&mut self) -> ValueId {
        let ptr = self.tys.ptr;
        self.intern_const(ptr, ConstKind::Null)
    }

    pub fn const_struct(&mut self, ty: TyId, fields: Vec<ValueId>) -> ValueId {
        self.intern_const(ty, ConstKind::Struct(fields))
    }

    pub fn const_array(&mut self, ty: TyId, elements: Vec<ValueId>) -> ValueId {
        self.intern_const(ty, ConstKind::Array(elements))
    }

    // -------------------------------------------------------------------------
    // Globals
    // -------------------------------------------------------------------------

    pub fn new_global(
        &mut self,
        name: &str,
        ty: TyId,
        init: Option<ValueId>,
        is_const: bool,
    ) -> ValueId {
        self.values.push(ValueData {
            ty,
            name: Some(name.to_string()),
            kind: ValueKind::Global { is_const, init },
            users: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Functions and blocks
    // -------------------------------------------------------------------------

    /// Create a function with one argument value per parameter type.
    /// `arg_names` must match the parameter count.
    pub fn new_function(
        &mut self,
        name: &str,
        ty: TyId,
        arg_names: &[String],
        is_declaration: bool,
    ) -> IrResult<FuncId> {
        let IrTy::Fn { params, .. } = self.tys.get(ty).clone() else {
            return Err(IrError::InvalidIr(format!("`{name}` created with a non-function type")));
        };
        if params.len() != arg_names.len() {
            return Err(IrError::InvalidIr(format!(
                "`{name}` has {} parameters but {} names",
                params.len(),
                arg_names.len()
            )));
        }

        let func = self.functions.push(Function {
            name: name.to_string(),
            ty,
            args: Vec::new(),
            blocks: Vec::new(),
            is_declaration,
        });

        let args: Vec<ValueId> = params
            .iter()
            .zip(arg_names)
            .enumerate()
            .map(|(index, (param_ty, arg_name))| {
                self.values.push(ValueData {
                    ty: *param_ty,
                    name: Some(arg_name.clone()),
                    kind: ValueKind::Argument { func, index },
                    users: Vec::new(),
                })
            })
            .collect();
        self.functions[func].args = args;

        Ok(func)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id]
    }

    /// The declared return type of a function.
    pub fn fn_ret_ty(&self, id: FuncId) -> TyId {
        match self.tys.get(self.functions[id].ty) {
            IrTy::Fn { ret, .. } => *ret,
            _ => unreachable!("functions have function types"),
        }
    }

    pub fn fn_param_tys(&self, id: FuncId) -> Vec<TyId> {
        match self.tys.get(self.functions[id].ty) {
            IrTy::Fn { params, .. } => params.clone(),
            _ => unreachable!("functions have function types"),
        }
    }

    /// Append a fresh basic block to the function.
    pub fn new_block(&mut self, func: FuncId, label: impl Into<String>) -> BlockId {
        let block = self.blocks.push(BasicBlockData { label: label.into(), insts: Vec::new() });
        self.functions[func].blocks.push(block);
        block
    }

    pub fn block(&self, id: BlockId) -> &BasicBlockData {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlockData {
        &mut self.blocks[id]
    }

    /// The terminator of a block, if it has one.
    pub fn terminator_of(&self, id: BlockId) -> Option<ValueId> {
        let last = *self.blocks[id].insts.last()?;
        match &self.values[last].kind {
            ValueKind::Inst(inst) if inst.is_terminator() => Some(last),
            _ => None,
        }
    }

    pub fn is_terminated(&self, id: BlockId) -> bool {
        self.terminator_of(id).is_some()
    }
}

impl Default for IrCtx {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_uniqued() {
        let mut ctx = IrCtx::new();
        let i32_ty = ctx.tys.i32;

        let a = ctx.const_int(i32_ty, 42).unwrap();
        let b = ctx.const_int(i32_ty, 42).unwrap();
        assert_eq!(a, b);

        let c = ctx.const_int(i32_ty, 7).unwrap();
        assert_ne!(a, c);

        let i1_ty = ctx.tys.i1;
        let d = ctx.const_int(i1_ty, 1).unwrap();
        assert_ne!(a, d);

        assert_eq!(ctx.const_null(), ctx.const_null());
    }

    #[test]
    fn int_constants_truncate_to_width() {
        let mut ctx = IrCtx::new();
        let i1_ty = ctx.tys.i1;

        let a = ctx.const_int(i1_ty, 1).unwrap();
        let b = ctx.const_int(i1_ty, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_integer_constants_are_rejected() {
        let mut ctx = IrCtx::new();
        let ptr = ctx.tys.ptr;
        assert!(ctx.const_int(ptr, 0).is_err());
    }
}
