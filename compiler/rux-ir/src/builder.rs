//! The instruction builder: a stateful cursor that appends typed
//! instructions to a basic block.
//!
//! Every `create_*` verifies its operands against the type rules,
//! mints a fresh SSA name where the result is non-void, registers the
//! instruction with the current block, and returns the resulting
//! value. Appending to a block that already ends in a terminator
//! splices the instruction in front of the terminator; appending a
//! second terminator is an error.
use crate::{
    error::{IrError, IrResult},
    ir::{BinOp, BlockId, ConstKind, FuncId, ICmpCond, Inst, IrCtx, Module, ValueData, ValueId, ValueKind},
    ty::{IrTy, TyId},
};

/// The name of the aggregate-copy intrinsic the lowerer relies on.
pub const MEMCPY: &str = "llvm.memcpy.p0.p0.i32";

pub struct Builder<'ctx> {
    ctx: &'ctx mut IrCtx,
    block: Option<BlockId>,
    next_tmp: u32,
}

impl<'ctx> Builder<'ctx> {
    pub fn new(ctx: &'ctx mut IrCtx) -> Self {
        Self { ctx, block: None, next_tmp: 0 }
    }

    pub fn ctx(&self) -> &IrCtx {
        self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut IrCtx {
        self.ctx
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.block = Some(block);
    }

    pub fn insert_block(&mut self) -> Option<BlockId> {
        self.block
    }

    /// Mint a fresh SSA value name.
    fn fresh_name(&mut self) -> String {
        let name = format!("tmp.{}", self.next_tmp);
        self.next_tmp += 1;
        name
    }

    fn current_block(&self) -> IrResult<BlockId> {
        self.block.ok_or_else(|| IrError::InvalidIr("no insertion point".into()))
    }

    /// Core insertion: build the value, wire use-def edges, splice
    /// into the block.
    fn insert(&mut self, inst: Inst, ty: TyId) -> IrResult<ValueId> {
        let block = self.current_block()?;

        if inst.is_terminator() && self.ctx.is_terminated(block) {
            return Err(IrError::InvalidIr(format!(
                "block `{}` already has a terminator",
                self.ctx.block(block).label
            )));
        }

        let named = ty != self.ctx.tys.void;
        let name = named.then(|| self.fresh_name());
        let operands = inst.operands();

        let value = self.ctx.push_value(ValueData {
            ty,
            name,
            kind: ValueKind::Inst(inst),
            users: Vec::new(),
        });
        for operand in operands {
            self.ctx.add_user(operand, value);
        }

        let terminated = self.ctx.is_terminated(block);
        let insts = &mut self.ctx.block_mut(block).insts;
        if terminated {
            insts.insert(insts.len() - 1, value);
        } else {
            insts.push(value);
        }
        Ok(value)
    }

    fn expect_same_int(&self, lhs: ValueId, rhs: ValueId, what: &str) -> IrResult<TyId> {
        let lhs_ty = self.ctx.value_ty(lhs);
        let rhs_ty = self.ctx.value_ty(rhs);
        if lhs_ty != rhs_ty {
            return Err(IrError::InvalidIr(format!("{what} operands differ in type")));
        }
        if !self.ctx.tys.is_integer(lhs_ty) {
            return Err(IrError::InvalidIr(format!("{what} operands are not integers")));
        }
        Ok(lhs_ty)
    }

    fn expect_ptr(&self, value: ValueId, what: &str) -> IrResult<()> {
        if !self.ctx.tys.get(self.ctx.value_ty(value)).is_pointer() {
            return Err(IrError::InvalidIr(format!("{what} operand is not a pointer")));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Arithmetic and comparisons
    // -------------------------------------------------------------------------

    pub fn create_binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> IrResult<ValueId> {
        let ty = self.expect_same_int(lhs, rhs, op.mnemonic())?;
        self.insert(Inst::Binary { op, lhs, rhs }, ty)
    }

    pub fn create_icmp(&mut self, cond: ICmpCond, lhs: ValueId, rhs: ValueId) -> IrResult<ValueId> {
        self.expect_same_int(lhs, rhs, "icmp")?;
        let i1 = self.ctx.tys.i1;
        self.insert(Inst::ICmp { cond, lhs, rhs }, i1)
    }

    // -------------------------------------------------------------------------
    // Memory
    // -------------------------------------------------------------------------

    pub fn create_alloca(&mut self, allocated: TyId) -> IrResult<ValueId> {
        let ptr = self.ctx.tys.ptr;
        self.insert(Inst::Alloca { allocated }, ptr)
    }

    pub fn create_load(&mut self, ty: TyId, ptr: ValueId) -> IrResult<ValueId> {
        self.expect_ptr(ptr, "load")?;
        self.insert(Inst::Load { ptr }, ty)
    }

    pub fn create_store(&mut self, value: ValueId, ptr: ValueId) -> IrResult<ValueId> {
        self.expect_ptr(ptr, "store")?;
        let void = self.ctx.tys.void;
        self.insert(Inst::Store { value, ptr }, void)
    }

    // -------------------------------------------------------------------------
    // Control flow
    // -------------------------------------------------------------------------

    pub fn create_br(&mut self, target: BlockId) -> IrResult<ValueId> {
        let void = self.ctx.tys.void;
        self.insert(Inst::Br { target }, void)
    }

    pub fn create_cond_br(
        &mut self,
        cond: ValueId,
        then_target: BlockId,
        else_target: BlockId,
    ) -> IrResult<ValueId> {
        if self.ctx.value_ty(cond) != self.ctx.tys.i1 {
            return Err(IrError::InvalidIr("conditional branch on a non-i1 value".into()));
        }
        let void = self.ctx.tys.void;
        self.insert(Inst::CondBr { cond, then_target, else_target }, void)
    }

    pub fn create_ret(&mut self, value: Option<ValueId>) -> IrResult<ValueId> {
        let void = self.ctx.tys.void;
        self.insert(Inst::Ret { value }, void)
    }

    /// A PHI must sit at the head of its block, before any
    /// non-PHI instruction, and all incomings must share its type.
    pub fn create_phi(
        &mut self,
        ty: TyId,
        incomings: Vec<(ValueId, BlockId)>,
    ) -> IrResult<ValueId> {
        for (value, _) in &incomings {
            if self.ctx.value_ty(*value) != ty {
                return Err(IrError::InvalidIr("phi incoming differs from the phi type".into()));
            }
        }

        let block = self.current_block()?;
        let all_phis = self.ctx.block(block).insts.iter().all(|inst| {
            matches!(&self.ctx.value(*inst).kind, ValueKind::Inst(Inst::Phi { .. }))
        });
        if !all_phis {
            return Err(IrError::InvalidIr(
                "phi inserted after a non-phi instruction".into(),
            ));
        }

        self.insert(Inst::Phi { incomings }, ty)
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    pub fn create_call(&mut self, callee: FuncId, args: Vec<ValueId>) -> IrResult<ValueId> {
        let params = self.ctx.fn_param_tys(callee);
        if params.len() != args.len() {
            return Err(IrError::InvalidIr(format!(
                "call to `{}` with {} arguments, expected {}",
                self.ctx.function(callee).name,
                args.len(),
                params.len()
            )));
        }
        for (arg, param) in args.iter().zip(&params) {
            if self.ctx.value_ty(*arg) != *param {
                return Err(IrError::InvalidIr(format!(
                    "call to `{}` with a mis-typed argument",
                    self.ctx.function(callee).name
                )));
            }
        }

        let ret = self.ctx.fn_ret_ty(callee);
        self.insert(Inst::Call { callee, args }, ret)
    }

    /// Look up, or declare on first use, the
    /// `llvm.memcpy.p0.p0.i32` intrinsic.
    pub fn memcpy_fn(&mut self, module: &mut Module) -> IrResult<FuncId> {
        if let Some(func) = module.function(MEMCPY) {
            return Ok(func);
        }

        let (ptr, i32_ty, i1, void) =
            (self.ctx.tys.ptr, self.ctx.tys.i32, self.ctx.tys.i1, self.ctx.tys.void);
        let ty = self.ctx.tys.fn_ty(vec![ptr, ptr, i32_ty, i1], void);
        let names: Vec<String> =
            ["dst", "src", "len", "volatile"].iter().map(|s| s.to_string()).collect();
        let func = self.ctx.new_function(MEMCPY, ty, &names, true)?;
        module.functions.insert(MEMCPY.to_string(), func);
        Ok(func)
    }

    /// Emit a `memcpy(dst, src, size, false)` call.
    pub fn create_memcpy(
        &mut self,
        module: &mut Module,
        dst: ValueId,
        src: ValueId,
        size: ValueId,
    ) -> IrResult<ValueId> {
        self.expect_ptr(dst, "memcpy")?;
        self.expect_ptr(src, "memcpy")?;

        let memcpy = self.memcpy_fn(module)?;
        let i1 = self.ctx.tys.i1;
        let not_volatile = self.ctx.const_int(i1, 0)?;
        self.create_call(memcpy, vec![dst, src, size, not_volatile])
    }

    // -------------------------------------------------------------------------
    // Pointer arithmetic and casts
    // -------------------------------------------------------------------------

    /// `getelementptr base_ty, ptr, indices…` — the index chain must
    /// walk valid struct and array offsets of `base_ty`.
    pub fn create_gep(
        &mut self,
        base_ty: TyId,
        ptr: ValueId,
        indices: Vec<ValueId>,
    ) -> IrResult<ValueId> {
        self.expect_ptr(ptr, "getelementptr")?;
        if indices.is_empty() {
            return Err(IrError::InvalidIr("getelementptr with no indices".into()));
        }

        // The first index steps over whole `base_ty` elements; the
        // rest walk into the aggregate.
        let mut walked = base_ty;
        for index in &indices[1..] {
            let index_value = self.ctx.value(*index).as_const_int();
            walked = match self.ctx.tys.get(walked).clone() {
                IrTy::Struct(id) => {
                    let fields = &self.ctx.tys.struct_data(id).fields;
                    let Some(field) = index_value else {
                        return Err(IrError::InvalidIr(
                            "struct field index is not a constant".into(),
                        ));
                    };
                    match fields.get(field as usize) {
                        Some(field_ty) => *field_ty,
                        None => {
                            return Err(IrError::InvalidIr(format!(
                                "field index {field} out of bounds for `%struct.{}`",
                                self.ctx.tys.struct_data(id).name
                            )))
                        }
                    }
                }
                IrTy::Array { element, length } => {
                    // Constant indices are bounds-checked; dynamic
                    // ones must at least be i32-typed.
                    match index_value {
                        Some(value) if value >= length as u64 => {
                            return Err(IrError::InvalidIr(format!(
                                "index {value} out of bounds for [{length} x _]"
                            )))
                        }
                        Some(_) => {}
                        None => {
                            if self.ctx.value_ty(*index) != self.ctx.tys.i32 {
                                return Err(IrError::InvalidIr(
                                    "dynamic array index is not i32".into(),
                                ));
                            }
                        }
                    }
                    element
                }
                _ => {
                    return Err(IrError::InvalidIr(
                        "getelementptr walks into a non-aggregate".into(),
                    ))
                }
            };
        }

        let ptr_ty = self.ctx.tys.ptr;
        self.insert(Inst::Gep { base_ty, ptr, indices }, ptr_ty)
    }

    pub fn create_ptr_to_int(&mut self, ptr: ValueId, to: TyId) -> IrResult<ValueId> {
        self.expect_ptr(ptr, "ptrtoint")?;
        if !self.ctx.tys.is_integer(to) {
            return Err(IrError::InvalidIr("ptrtoint to a non-integer type".into()));
        }
        self.insert(Inst::PtrToInt { ptr }, to)
    }

    /// Zero-extend to a strictly wider integer type.
    pub fn create_zext(&mut self, value: ValueId, to: TyId) -> IrResult<ValueId> {
        let from_ty = self.ctx.value_ty(value);
        let (from_width, to_width) = match (
            self.ctx.tys.get(from_ty).int_width(),
            self.ctx.tys.get(to).int_width(),
        ) {
            (Some(from), Some(to)) => (from, to),
            _ => return Err(IrError::InvalidIr("zext between non-integer types".into())),
        };
        if from_width >= to_width {
            return Err(IrError::InvalidIr("zext to a type that is not wider".into()));
        }
        self.insert(Inst::Zext { value }, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_block_fn(ctx: &mut IrCtx) -> (FuncId, BlockId) {
        let i32_ty = ctx.tys.i32;
        let fn_ty = ctx.tys.fn_ty(vec![], i32_ty);
        let func = ctx.new_function("main", fn_ty, &[], false).unwrap();
        let entry = ctx.new_block(func, "entry");
        (func, entry)
    }

    #[test]
    fn appends_splice_before_the_terminator() {
        let mut ctx = IrCtx::new();
        let (_, entry) = one_block_fn(&mut ctx);
        let i32_ty = ctx.tys.i32;
        let zero = ctx.const_int(i32_ty, 0).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        builder.create_ret(Some(zero)).unwrap();

        // A later append lands in front of the `ret`.
        let slot = builder.create_alloca(i32_ty).unwrap();

        let insts = &ctx.block(entry).insts;
        assert_eq!(insts.len(), 2);
        assert_eq!(insts[0], slot);
        assert!(ctx.is_terminated(entry));
    }

    #[test]
    fn second_terminator_is_rejected() {
        let mut ctx = IrCtx::new();
        let (_, entry) = one_block_fn(&mut ctx);
        let i32_ty = ctx.tys.i32;
        let zero = ctx.const_int(i32_ty, 0).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        builder.create_ret(Some(zero)).unwrap();
        assert!(builder.create_ret(Some(zero)).is_err());
    }

    #[test]
    fn binary_operands_must_share_a_type() {
        let mut ctx = IrCtx::new();
        let (_, entry) = one_block_fn(&mut ctx);
        let (i32_ty, i1_ty) = (ctx.tys.i32, ctx.tys.i1);
        let a = ctx.const_int(i32_ty, 1).unwrap();
        let b = ctx.const_int(i1_ty, 1).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        assert!(builder.create_binary(BinOp::Add, a, b).is_err());

        let c = ctx.const_int(i32_ty, 2).unwrap();
        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        let sum = builder.create_binary(BinOp::Add, a, c).unwrap();
        assert_eq!(ctx.value_ty(sum), i32_ty);
    }

    #[test]
    fn phi_incomings_share_the_phi_type() {
        let mut ctx = IrCtx::new();
        let (func, entry) = one_block_fn(&mut ctx);
        let merge = ctx.new_block(func, "merge");
        let (i32_ty, i1_ty) = (ctx.tys.i32, ctx.tys.i1);
        let int = ctx.const_int(i32_ty, 1).unwrap();
        let flag = ctx.const_int(i1_ty, 1).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(merge);
        assert!(builder.create_phi(i32_ty, vec![(flag, entry)]).is_err());
        builder.create_phi(i32_ty, vec![(int, entry)]).unwrap();

        // Once a non-phi exists, further phis are rejected.
        let _slot = builder.create_alloca(i32_ty).unwrap();
        assert!(builder.create_phi(i32_ty, vec![(int, entry)]).is_err());
    }

    #[test]
    fn gep_checks_the_index_chain() {
        let mut ctx = IrCtx::new();
        let (_, entry) = one_block_fn(&mut ctx);

        let struct_ty = ctx.tys.struct_ty("P");
        let IrTy::Struct(id) = *ctx.tys.get(struct_ty) else { unreachable!() };
        let i32_ty = ctx.tys.i32;
        ctx.tys.set_struct_fields(id, vec![i32_ty, i32_ty]);

        let zero = ctx.const_int(i32_ty, 0).unwrap();
        let two = ctx.const_int(i32_ty, 2).unwrap();
        let null = ctx.const_null();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        builder.create_gep(struct_ty, null, vec![zero, zero]).unwrap();
        // Field 2 of a two-field struct is out of bounds.
        assert!(builder.create_gep(struct_ty, null, vec![zero, two]).is_err());
    }

    #[test]
    fn zext_must_widen() {
        let mut ctx = IrCtx::new();
        let (_, entry) = one_block_fn(&mut ctx);
        let (i1_ty, i32_ty) = (ctx.tys.i1, ctx.tys.i32);
        let flag = ctx.const_int(i1_ty, 1).unwrap();
        let int = ctx.const_int(i32_ty, 5).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        builder.create_zext(flag, i32_ty).unwrap();
        assert!(builder.create_zext(int, i32_ty).is_err());
    }
}
