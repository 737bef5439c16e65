//! Lowering of function bodies: the per-function state (return
//! plumbing, loop-context stack, label minting) and the statement
//! walk. Expression lowering lives in [expr].
mod expr;

use rux_ast::{AstNode, Block, Stmt};
use rux_ir::{BlockId, Builder, FuncId, IrCtx, IrError, IrResult, Module, ValueId};
use rux_sema::{Analysis, SymbolId, Ty};

use crate::{
    collect::FnItem,
    ty::{is_aggregate, lower_ty, scalar_size},
    LowerMaps,
};

/// What lowering an expression yields: the value produced (for
/// aggregates, the address holding it) and the l-value address when
/// the expression is a place.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Lowered {
    pub value: Option<ValueId>,
    pub addr: Option<ValueId>,
}

impl Lowered {
    /// Unit and diverging expressions produce nothing.
    pub const NONE: Lowered = Lowered { value: None, addr: None };

    pub fn value(value: ValueId) -> Lowered {
        Lowered { value: Some(value), addr: None }
    }

    pub fn place(value: ValueId, addr: ValueId) -> Lowered {
        Lowered { value: Some(value), addr: Some(addr) }
    }
}

/// An active loop during lowering. `break`/`continue` consult the top
/// of the stack; `break value` records a PHI incoming.
pub(crate) struct LoopFrame {
    /// Present for `while`; `continue` re-tests the condition.
    pub cond_bb: Option<BlockId>,
    pub body_bb: BlockId,
    pub after_bb: BlockId,
    /// `(value, originating block)` pairs collected from `break`.
    pub incomings: Vec<(Option<ValueId>, BlockId)>,
}

pub(crate) struct BodyLowerer<'a, 'ctx> {
    pub analysis: &'a Analysis,
    pub maps: &'a mut LowerMaps,
    pub module: &'a mut Module,
    pub builder: Builder<'ctx>,
    /// The function being lowered into.
    pub(crate) func: FuncId,
    /// The caller-provided return buffer (absent in `main`).
    ret_ptr: Option<ValueId>,
    /// `main`'s local return slot (absent elsewhere).
    ret_slot: Option<ValueId>,
    ret_ty: Ty,
    is_main: bool,
    epilogue: BlockId,
    loops: Vec<LoopFrame>,
    next_label: u32,
}

/// Lower one function body into its predeclared IR function.
pub(crate) fn lower_fn(
    analysis: &Analysis,
    maps: &mut LowerMaps,
    module: &mut Module,
    ctx: &mut IrCtx,
    item: &FnItem<'_>,
) -> IrResult<()> {
    let symbol = analysis.tables.decl_symbol[item.item_id];
    let func = *maps
        .functions
        .get(&symbol)
        .ok_or_else(|| IrError::MissingSymbol(item.mangled_name()))?;
    let function = analysis.symbols.as_function(symbol).expect("function symbol");
    let ret_ty = function.ret_ty.clone();
    let body = item.def.body.as_ref().expect("lowered functions have bodies");

    let entry = ctx.new_block(func, "entry");
    let epilogue = ctx.new_block(func, "return");

    let mut builder = Builder::new(ctx);
    builder.set_insert_point(entry);

    let mut lowerer = BodyLowerer {
        analysis,
        maps,
        module,
        builder,
        func,
        ret_ptr: None,
        ret_slot: None,
        ret_ty: ret_ty.clone(),
        is_main: item.is_main(),
        epilogue,
        loops: Vec::new(),
        next_label: 0,
    };

    lowerer.bind_arguments(func, item)?;

    let result = lowerer.lower_block(body)?;
    if !lowerer.is_terminated() {
        lowerer.store_return(result)?;
        lowerer.builder.create_br(epilogue)?;
    }

    lowerer.emit_epilogue()?;

    // The epilogue prints last, after every block the body created.
    let blocks = &mut ctx.function_mut(func).blocks;
    blocks.retain(|block| *block != epilogue);
    blocks.push(epilogue);

    Ok(())
}

impl<'a, 'ctx> BodyLowerer<'a, 'ctx> {
    fn bind_arguments(&mut self, func: FuncId, item: &FnItem<'_>) -> IrResult<()> {
        let args = self.builder.ctx().function(func).args.clone();
        let mut next = 0usize;

        if !self.is_main {
            self.ret_ptr = Some(args[next]);
            next += 1;
        }

        if let Some(self_param) = &item.def.self_param {
            let self_arg = args[next];
            next += 1;

            let symbol = self.analysis.tables.decl_symbol[self_param.id()];
            let self_ty =
                self.analysis.symbols.value_ty(symbol).expect("self parameter").clone();

            let slot = match &self_ty {
                Ty::Ref { .. } => {
                    let ptr = self.builder.ctx().tys.ptr;
                    let slot = self.builder.create_alloca(ptr)?;
                    self.builder.create_store(self_arg, slot)?;
                    slot
                }
                // Owned `self` is copied in; the callee owns its own
                // bytes.
                _ => {
                    let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &self_ty)?;
                    let slot = self.builder.create_alloca(lowered)?;
                    self.copy_aggregate(slot, self_arg, &self_ty)?;
                    slot
                }
            };
            self.maps.slots.insert(symbol, slot);
        }

        for param in &item.def.params {
            let arg = args[next];
            next += 1;

            let symbol = self.analysis.tables.decl_symbol[param.id()];
            let ty = self.analysis.symbols.value_ty(symbol).expect("parameter").clone();
            let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
            let slot = self.builder.create_alloca(lowered)?;

            if is_aggregate(self.analysis, &ty) {
                self.copy_aggregate(slot, arg, &ty)?;
            } else {
                self.builder.create_store(arg, slot)?;
            }
            self.maps.slots.insert(symbol, slot);
        }

        if self.is_main && !self.ret_ty.is_unit() {
            let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &self.ret_ty.clone())?;
            self.ret_slot = Some(self.builder.create_alloca(lowered)?);
        }

        Ok(())
    }

    fn emit_epilogue(&mut self) -> IrResult<()> {
        self.builder.set_insert_point(self.epilogue);

        if self.is_main {
            match self.ret_slot {
                Some(slot) => {
                    let ty =
                        lower_ty(self.builder.ctx_mut(), self.analysis, &self.ret_ty.clone())?;
                    let value = self.builder.create_load(ty, slot)?;
                    self.builder.create_ret(Some(value))?;
                }
                None => {
                    self.builder.create_ret(None)?;
                }
            }
        } else {
            self.builder.create_ret(None)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Shared helpers
    // -------------------------------------------------------------------------

    pub(crate) fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{prefix}.{}", self.next_label);
        self.next_label += 1;
        label
    }

    pub(crate) fn is_terminated(&mut self) -> bool {
        match self.builder.insert_block() {
            Some(block) => self.builder.ctx().is_terminated(block),
            None => true,
        }
    }

    /// The byte size of a type as an `i32` value: a `S.size` call for
    /// structs, a constant for everything of statically known layout.
    pub(crate) fn size_of(&mut self, ty: &Ty) -> IrResult<ValueId> {
        let i32_ty = self.builder.ctx().tys.i32;

        match ty {
            Ty::Named { symbol, name } if self.analysis.symbols.as_struct(*symbol).is_some() => {
                let size_fn = *self
                    .maps
                    .size_fns
                    .get(symbol)
                    .ok_or_else(|| IrError::MissingSymbol(format!("{name}.size")))?;
                self.builder.create_call(size_fn, vec![])
            }
            Ty::Array { element, length } => {
                let length = *length as u64;
                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, element)?;
                match scalar_size(self.builder.ctx(), lowered) {
                    Some(element_size) => {
                        self.builder.ctx_mut().const_int(i32_ty, element_size * length)
                    }
                    None => {
                        let element_size = self.size_of(element)?;
                        let length = self.builder.ctx_mut().const_int(i32_ty, length)?;
                        self.builder.create_binary(rux_ir::BinOp::Mul, element_size, length)
                    }
                }
            }
            other => {
                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, other)?;
                let size = scalar_size(self.builder.ctx(), lowered)
                    .ok_or_else(|| IrError::InvalidIr(format!("`{other}` has no scalar size")))?;
                self.builder.ctx_mut().const_int(i32_ty, size)
            }
        }
    }

    /// Value-semantic aggregate copy via `llvm.memcpy`.
    pub(crate) fn copy_aggregate(
        &mut self,
        dst: ValueId,
        src: ValueId,
        ty: &Ty,
    ) -> IrResult<ValueId> {
        let size = self.size_of(ty)?;
        self.builder.create_memcpy(self.module, dst, src, size)
    }

    /// Store an expression result into a destination slot according
    /// to its source type: `memcpy` for aggregates, `store` for
    /// scalars, `i8 0` for unit.
    pub(crate) fn store_value(
        &mut self,
        result: Lowered,
        dst: ValueId,
        ty: &Ty,
    ) -> IrResult<()> {
        if is_aggregate(self.analysis, ty) {
            let src = result
                .value
                .ok_or_else(|| IrError::InvalidIr("aggregate value has no address".into()))?;
            self.copy_aggregate(dst, src, ty)?;
            return Ok(());
        }

        match result.value {
            Some(value) => {
                self.builder.create_store(value, dst)?;
            }
            None if ty.is_unit() => {
                let i8_ty = self.builder.ctx().tys.i8;
                let zero = self.builder.ctx_mut().const_int(i8_ty, 0)?;
                self.builder.create_store(zero, dst)?;
            }
            // A diverged operand left nothing to store; the branch to
            // the epilogue is unreachable anyway.
            None => {}
        }
        Ok(())
    }

    /// Write a function result into the return buffer (or `main`'s
    /// slot).
    pub(crate) fn store_return(&mut self, result: Lowered) -> IrResult<()> {
        let ret_ty = self.ret_ty.clone();

        if self.is_main {
            match self.ret_slot {
                Some(slot) => self.store_value(result, slot, &ret_ty),
                None => Ok(()),
            }
        } else {
            let dst = self
                .ret_ptr
                .ok_or_else(|| IrError::InvalidIr("function has no return buffer".into()))?;
            if ret_ty.is_unit() || ret_ty.is_never() {
                let unit = Ty::Unit;
                self.store_value(Lowered::NONE, dst, &unit)
            } else {
                self.store_value(result, dst, &ret_ty)
            }
        }
    }

    pub(crate) fn epilogue(&self) -> BlockId {
        self.epilogue
    }

    pub(crate) fn loops_mut(&mut self) -> &mut Vec<LoopFrame> {
        &mut self.loops
    }

    pub(crate) fn slot_of(&self, symbol: SymbolId) -> IrResult<ValueId> {
        self.maps.slots.get(&symbol).copied().ok_or_else(|| {
            IrError::MissingSymbol(self.analysis.symbols.name(symbol).to_string())
        })
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub(crate) fn lower_block(&mut self, node: &AstNode<Block>) -> IrResult<Lowered> {
        for stmt in &node.body().stmts {
            // Everything after a `return`/`break`/`continue` is
            // unreachable; stop emitting.
            if self.is_terminated() {
                return Ok(Lowered::NONE);
            }
            self.lower_stmt(stmt)?;
        }

        match &node.body().tail {
            Some(tail) if !self.is_terminated() => self.lower_expr(tail),
            _ => Ok(Lowered::NONE),
        }
    }

    fn lower_stmt(&mut self, node: &AstNode<Stmt>) -> IrResult<()> {
        match node.body() {
            Stmt::Let(let_stmt) => {
                let symbol = self.analysis.tables.decl_symbol[node.id()];
                let ty = self.analysis.symbols.value_ty(symbol).expect("let binding").clone();

                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
                let slot = self.builder.create_alloca(lowered)?;
                self.maps.slots.insert(symbol, slot);

                if let Some(init) = &let_stmt.init {
                    let result = self.lower_expr(init)?;
                    if !self.is_terminated() {
                        self.store_value(result, slot, &ty)?;
                    }
                }
                Ok(())
            }
            Stmt::Expr { expr, .. } => {
                self.lower_expr(expr)?;
                Ok(())
            }
        }
    }
}
