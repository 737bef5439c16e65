//! Expression lowering: one match arm per construct, emitting
//! instructions through the builder per the contracts of the
//! aggregate-return ABI, with short-circuit control flow and PHI
//! nodes for valued `if`/`loop` expressions.
use rux_ast::{AstNode, BinOp as AstBinOp, Expr, Lit, LogicalOp, UnOp};
use rux_ir::{BinOp, ICmpCond, IrError, IrResult, ValueId};
use rux_sema::{SymbolId, SymbolKind, Ty};

use super::{BodyLowerer, Lowered, LoopFrame};
use crate::ty::{is_aggregate, lower_ty, value_ty};

/// Signedness for instruction selection, decided by the source type.
/// `bool`, `char` and enum discriminants compare unsigned.
fn is_signed(ty: &Ty) -> bool {
    matches!(ty, Ty::Prim(prim) if prim.is_signed_integer())
}

fn arith_op(op: AstBinOp, signed: bool) -> BinOp {
    match op {
        AstBinOp::Add => BinOp::Add,
        AstBinOp::Sub => BinOp::Sub,
        AstBinOp::Mul => BinOp::Mul,
        AstBinOp::Div if signed => BinOp::SDiv,
        AstBinOp::Div => BinOp::UDiv,
        AstBinOp::Rem if signed => BinOp::SRem,
        AstBinOp::Rem => BinOp::URem,
        AstBinOp::BitAnd => BinOp::And,
        AstBinOp::BitOr => BinOp::Or,
        AstBinOp::BitXor => BinOp::Xor,
        AstBinOp::Shl => BinOp::Shl,
        AstBinOp::Shr if signed => BinOp::AShr,
        AstBinOp::Shr => BinOp::LShr,
        _ => unreachable!("comparisons lower to icmp"),
    }
}

fn cmp_cond(op: AstBinOp, signed: bool) -> ICmpCond {
    match op {
        AstBinOp::Eq => ICmpCond::Eq,
        AstBinOp::NotEq => ICmpCond::Ne,
        AstBinOp::Lt if signed => ICmpCond::Slt,
        AstBinOp::Lt => ICmpCond::Ult,
        AstBinOp::LtEq if signed => ICmpCond::Sle,
        AstBinOp::LtEq => ICmpCond::Ule,
        AstBinOp::Gt if signed => ICmpCond::Sgt,
        AstBinOp::Gt => ICmpCond::Ugt,
        AstBinOp::GtEq if signed => ICmpCond::Sge,
        AstBinOp::GtEq => ICmpCond::Uge,
        _ => unreachable!("not a comparison"),
    }
}

impl BodyLowerer<'_, '_> {
    fn ty_of(&self, node: &AstNode<Expr>) -> &Ty {
        &self.analysis.tables.resolved_ty[node.id()]
    }

    /// Lower an operand and yield its value, or `None` when the
    /// operand diverged (the caller gives up on the whole
    /// expression).
    fn operand(&mut self, node: &AstNode<Expr>) -> IrResult<Option<ValueId>> {
        Ok(self.lower_expr(node)?.value)
    }

    pub(crate) fn lower_expr(&mut self, node: &AstNode<Expr>) -> IrResult<Lowered> {
        match node.body() {
            Expr::Lit(lit) => self.lower_lit(node, lit),

            Expr::Path(_) => {
                let symbol = self.analysis.tables.node_symbol[node.id()];
                self.lower_path_value(symbol)
            }

            Expr::Unary(unary) => {
                let Some(value) = self.operand(&unary.operand)? else {
                    return Ok(Lowered::NONE);
                };
                let operand_ty = self.ty_of(&unary.operand).clone();
                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &operand_ty)?;

                let result = match unary.op {
                    // `-e` is `sub 0, e`.
                    UnOp::Neg => {
                        let zero = self.builder.ctx_mut().const_int(lowered, 0)?;
                        self.builder.create_binary(BinOp::Sub, zero, value)?
                    }
                    // `!e` is `xor 1, e` on i1 and `xor -1, e` on
                    // integers.
                    UnOp::Not => {
                        let mask = if operand_ty.is_bool() {
                            self.builder.ctx_mut().const_int(lowered, 1)?
                        } else {
                            self.builder.ctx_mut().const_int(lowered, u64::MAX)?
                        };
                        self.builder.create_binary(BinOp::Xor, mask, value)?
                    }
                };
                Ok(Lowered::value(result))
            }

            Expr::Ref(ref_expr) => {
                let lowered = self.lower_expr(&ref_expr.operand)?;
                match lowered.addr {
                    Some(addr) => Ok(Lowered::value(addr)),
                    None => Err(IrError::InvalidIr(
                        "borrow of an expression with no address".into(),
                    )),
                }
            }

            Expr::Deref(deref) => {
                let Some(ptr) = self.operand(&deref.operand)? else {
                    return Ok(Lowered::NONE);
                };
                let target_ty = self.ty_of(node).clone();
                if is_aggregate(self.analysis, &target_ty) {
                    Ok(Lowered::place(ptr, ptr))
                } else {
                    let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &target_ty)?;
                    let value = self.builder.create_load(lowered, ptr)?;
                    Ok(Lowered::place(value, ptr))
                }
            }

            Expr::Binary(binary) => {
                let Some(lhs) = self.operand(&binary.lhs)? else {
                    return Ok(Lowered::NONE);
                };
                let Some(rhs) = self.operand(&binary.rhs)? else {
                    return Ok(Lowered::NONE);
                };

                let signed = is_signed(self.ty_of(&binary.lhs));
                let result = if binary.op.is_comparison() {
                    self.builder.create_icmp(cmp_cond(binary.op, signed), lhs, rhs)?
                } else {
                    self.builder.create_binary(arith_op(binary.op, signed), lhs, rhs)?
                };
                Ok(Lowered::value(result))
            }

            Expr::Logical(logical) => self.lower_logical(logical),

            Expr::Assign(assign) => {
                let place = self.lower_expr(&assign.lhs)?;
                let dst = place.addr.ok_or_else(|| {
                    IrError::InvalidIr("assignment to an expression with no address".into())
                })?;

                let result = self.lower_expr(&assign.rhs)?;
                if !self.is_terminated() {
                    let lhs_ty = self.ty_of(&assign.lhs).clone();
                    self.store_value(result, dst, &lhs_ty)?;
                }
                Ok(Lowered::NONE)
            }

            Expr::AssignOp(assign) => {
                // Scalar only; the place lowering already produced
                // the current value, so reuse that load.
                let place = self.lower_expr(&assign.lhs)?;
                let dst = place.addr.ok_or_else(|| {
                    IrError::InvalidIr("assignment to an expression with no address".into())
                })?;
                let Some(current) = place.value else {
                    return Ok(Lowered::NONE);
                };
                let Some(rhs) = self.operand(&assign.rhs)? else {
                    return Ok(Lowered::NONE);
                };

                let signed = is_signed(self.ty_of(&assign.lhs));
                let result =
                    self.builder.create_binary(arith_op(assign.op, signed), current, rhs)?;
                self.builder.create_store(result, dst)?;
                Ok(Lowered::NONE)
            }

            Expr::Cast(cast) => {
                let Some(value) = self.operand(&cast.operand)? else {
                    return Ok(Lowered::NONE);
                };
                let from = self.ty_of(&cast.operand).clone();
                let to = self.ty_of(node).clone();

                if from.is_bool() {
                    let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &to)?;
                    let value = self.builder.create_zext(value, lowered)?;
                    Ok(Lowered::value(value))
                } else {
                    // Integer to integer is width-preserving on this
                    // target: the identity at the value level.
                    Ok(Lowered::value(value))
                }
            }

            Expr::Call(call) => {
                let symbol = self.analysis.tables.node_symbol[call.callee.id()];
                let function = self.analysis.symbols.as_function(symbol).expect("callee");

                if function.is_external {
                    self.lower_native_call(symbol, &call.args)
                } else {
                    let ret_ty = function.ret_ty.clone();
                    self.lower_abi_call(symbol, None, &call.args, &ret_ty)
                }
            }

            Expr::MethodCall(call) => {
                let receiver = self.lower_expr(&call.receiver)?;
                let receiver_ty = self.ty_of(&call.receiver).clone();

                // A reference receiver already is the self pointer;
                // otherwise take the place's address (aggregate
                // values carry theirs as the value).
                let self_ptr = match receiver_ty {
                    Ty::Ref { .. } => receiver.value,
                    _ => receiver.addr.or(receiver.value),
                };
                let self_ptr = self_ptr.ok_or_else(|| {
                    IrError::InvalidIr("method receiver has no address".into())
                })?;

                let symbol = self.analysis.tables.node_symbol[call.method.id()];
                let ret_ty = self.ty_of(node).clone();
                self.lower_abi_call(symbol, Some(self_ptr), &call.args, &ret_ty)
            }

            Expr::Field(field) => {
                let receiver = self.lower_expr(&field.receiver)?;
                let receiver_ty = self.ty_of(&field.receiver).clone();

                // One implicit auto-deref: a reference receiver's
                // value already is the base pointer.
                let base_ptr = if receiver_ty.as_ref_ty().is_some() {
                    receiver.value
                } else {
                    receiver.addr.or(receiver.value)
                };
                let Some(base_ptr) = base_ptr else {
                    return Ok(Lowered::NONE);
                };

                let base = receiver_ty.auto_deref();
                let Ty::Named { symbol, .. } = base else {
                    return Err(IrError::InvalidIr("field access on a non-struct".into()));
                };
                let struct_def = self.analysis.symbols.as_struct(*symbol).expect("struct");
                let index = struct_def
                    .field_index(field.field.body())
                    .ok_or_else(|| IrError::MissingSymbol(field.field.body().clone()))?;

                let base_ir_ty = lower_ty(self.builder.ctx_mut(), self.analysis, base)?;
                let i32_ty = self.builder.ctx().tys.i32;
                let zero = self.builder.ctx_mut().const_int(i32_ty, 0)?;
                let field_index = self.builder.ctx_mut().const_int(i32_ty, index as u64)?;
                let addr =
                    self.builder.create_gep(base_ir_ty, base_ptr, vec![zero, field_index])?;

                let field_ty = self.ty_of(node).clone();
                self.project(addr, &field_ty)
            }

            Expr::Index(index) => {
                let receiver = self.lower_expr(&index.receiver)?;
                let receiver_ty = self.ty_of(&index.receiver).clone();

                let base_ptr = if receiver_ty.as_ref_ty().is_some() {
                    receiver.value
                } else {
                    receiver.addr.or(receiver.value)
                };
                let Some(base_ptr) = base_ptr else {
                    return Ok(Lowered::NONE);
                };
                let Some(index_value) = self.operand(&index.index)? else {
                    return Ok(Lowered::NONE);
                };

                let base = receiver_ty.auto_deref().clone();
                let base_ir_ty = lower_ty(self.builder.ctx_mut(), self.analysis, &base)?;
                let i32_ty = self.builder.ctx().tys.i32;
                let zero = self.builder.ctx_mut().const_int(i32_ty, 0)?;
                let addr =
                    self.builder.create_gep(base_ir_ty, base_ptr, vec![zero, index_value])?;

                let element_ty = self.ty_of(node).clone();
                self.project(addr, &element_ty)
            }

            Expr::StructLit(lit) => {
                let struct_symbol = self.analysis.tables.node_symbol[lit.path.id()];
                let struct_ty = self.ty_of(node).clone();
                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &struct_ty)?;
                let slot = self.builder.create_alloca(lowered)?;

                let struct_def =
                    self.analysis.symbols.as_struct(struct_symbol).expect("struct");
                let fields = struct_def.fields.clone();

                let i32_ty = self.builder.ctx().tys.i32;
                let zero = self.builder.ctx_mut().const_int(i32_ty, 0)?;

                for field in &lit.fields {
                    let name = field.body().name.body();
                    let (index, _, field_ty) =
                        fields.get_full(name).expect("checked struct literal field");
                    let field_ty = field_ty.clone();

                    let result = self.lower_expr(&field.body().value)?;
                    if self.is_terminated() {
                        return Ok(Lowered::NONE);
                    }

                    let field_index = self.builder.ctx_mut().const_int(i32_ty, index as u64)?;
                    let addr =
                        self.builder.create_gep(lowered, slot, vec![zero, field_index])?;
                    self.store_value(result, addr, &field_ty)?;
                }

                Ok(Lowered::value(slot))
            }

            Expr::ArrayLit(lit) => {
                let array_ty = self.ty_of(node).clone();
                let Ty::Array { element, .. } = &array_ty else {
                    unreachable!("array literal has an array type");
                };
                let element_ty = element.as_ref().clone();

                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &array_ty)?;
                let slot = self.builder.create_alloca(lowered)?;
                let i32_ty = self.builder.ctx().tys.i32;
                let zero = self.builder.ctx_mut().const_int(i32_ty, 0)?;

                for (index, item) in lit.elements.iter().enumerate() {
                    let result = self.lower_expr(item)?;
                    if self.is_terminated() {
                        return Ok(Lowered::NONE);
                    }

                    let index = self.builder.ctx_mut().const_int(i32_ty, index as u64)?;
                    let addr = self.builder.create_gep(lowered, slot, vec![zero, index])?;
                    self.store_value(result, addr, &element_ty)?;
                }

                Ok(Lowered::value(slot))
            }

            Expr::ArrayRepeat(repeat) => {
                let array_ty = self.ty_of(node).clone();
                let Ty::Array { element, length } = &array_ty else {
                    unreachable!("repeat expression has an array type");
                };
                let (element_ty, length) = (element.as_ref().clone(), *length as u64);

                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &array_ty)?;
                let slot = self.builder.create_alloca(lowered)?;

                // The element is evaluated once; each slot gets a
                // copy.
                let source = self.lower_expr(&repeat.element)?;
                if self.is_terminated() {
                    return Ok(Lowered::NONE);
                }

                let i32_ty = self.builder.ctx().tys.i32;
                let zero = self.builder.ctx_mut().const_int(i32_ty, 0)?;
                for index in 0..length {
                    let index = self.builder.ctx_mut().const_int(i32_ty, index)?;
                    let addr = self.builder.create_gep(lowered, slot, vec![zero, index])?;
                    self.store_value(source, addr, &element_ty)?;
                }

                Ok(Lowered::value(slot))
            }

            Expr::Block(block) => self.lower_block(&block.block),

            Expr::If(if_expr) => self.lower_if(node, if_expr),
            Expr::While(while_expr) => self.lower_while(while_expr),
            Expr::Loop(loop_expr) => self.lower_loop(node, loop_expr),

            Expr::Break(break_expr) => {
                let value = match &break_expr.value {
                    Some(value) => self.lower_expr(value)?.value,
                    None => None,
                };
                if !self.is_terminated() {
                    let block = self.builder.insert_block().expect("insertion point");
                    let frame = self.loops_mut().last_mut().expect("checked loop nesting");
                    frame.incomings.push((value, block));
                    let after = frame.after_bb;
                    self.builder.create_br(after)?;
                }
                Ok(Lowered::NONE)
            }

            Expr::Continue => {
                let frame = self.loops_mut().last_mut().expect("checked loop nesting");
                let target = frame.cond_bb.unwrap_or(frame.body_bb);
                self.builder.create_br(target)?;
                Ok(Lowered::NONE)
            }

            Expr::Return(return_expr) => {
                let result = match &return_expr.value {
                    Some(value) => self.lower_expr(value)?,
                    None => Lowered::NONE,
                };
                if !self.is_terminated() {
                    self.store_return(result)?;
                    let epilogue = self.epilogue();
                    self.builder.create_br(epilogue)?;
                }
                Ok(Lowered::NONE)
            }
        }
    }

    fn lower_lit(&mut self, node: &AstNode<Expr>, lit: &Lit) -> IrResult<Lowered> {
        let value = match lit {
            Lit::Int(int) => {
                let ty = self.ty_of(node).clone();
                let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
                self.builder.ctx_mut().const_int(lowered, int.value)?
            }
            Lit::Bool(value) => {
                let i1 = self.builder.ctx().tys.i1;
                self.builder.ctx_mut().const_int(i1, *value as u64)?
            }
            Lit::Char(value) => {
                let i8_ty = self.builder.ctx().tys.i8;
                self.builder.ctx_mut().const_int(i8_ty, *value as u64)?
            }
            Lit::Str(_) => {
                return Err(IrError::UnsupportedFeature("string literal".into()));
            }
        };
        Ok(Lowered::value(value))
    }

    /// A path in value position: variables load from their slot (or
    /// yield it, for aggregates), constants load from their global,
    /// enum variants are their discriminant.
    fn lower_path_value(&mut self, symbol: SymbolId) -> IrResult<Lowered> {
        match &self.analysis.symbols.get(symbol).kind {
            SymbolKind::Variable { ty, .. } => {
                let ty = ty.clone();
                let slot = self.slot_of(symbol)?;
                if is_aggregate(self.analysis, &ty) {
                    Ok(Lowered::place(slot, slot))
                } else {
                    let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
                    let value = self.builder.create_load(lowered, slot)?;
                    Ok(Lowered::place(value, slot))
                }
            }
            SymbolKind::Constant { .. } => {
                let global = *self.maps.globals.get(&symbol).ok_or_else(|| {
                    IrError::MissingSymbol(self.analysis.symbols.name(symbol).to_string())
                })?;
                let i32_ty = self.builder.ctx().tys.i32;
                let value = self.builder.create_load(i32_ty, global)?;
                Ok(Lowered::value(value))
            }
            SymbolKind::Variant { index, .. } => {
                let i32_ty = self.builder.ctx().tys.i32;
                let value = self.builder.ctx_mut().const_int(i32_ty, *index as u64)?;
                Ok(Lowered::value(value))
            }
            _ => Err(IrError::InvalidIr(format!(
                "`{}` has no value",
                self.analysis.symbols.name(symbol)
            ))),
        }
    }

    /// A field or index projection result: aggregates propagate the
    /// address as the value, scalars load from it.
    fn project(&mut self, addr: ValueId, ty: &Ty) -> IrResult<Lowered> {
        if is_aggregate(self.analysis, ty) {
            Ok(Lowered::place(addr, addr))
        } else {
            let lowered = lower_ty(self.builder.ctx_mut(), self.analysis, ty)?;
            let value = self.builder.create_load(lowered, addr)?;
            Ok(Lowered::place(value, addr))
        }
    }

    /// Short-circuit `&&`/`||`:
    ///
    /// ```text
    ///   cur:   %c = eval(lhs)
    ///          and: br %c, rhs, merge     or: br %c, merge, rhs
    ///   rhs:   %v = eval(rhs)
    ///          br merge
    ///   merge: %r = phi i1 [ short, cur ], [ %v, rhs_end ]
    /// ```
    ///
    /// The right-hand side only ever runs on the non-short-circuit
    /// path.
    fn lower_logical(&mut self, logical: &rux_ast::LogicalExpr) -> IrResult<Lowered> {
        let Some(lhs) = self.operand(&logical.lhs)? else {
            return Ok(Lowered::NONE);
        };
        let lhs_end = self.builder.insert_block().expect("insertion point");

        let func = self.func;
        let rhs_label = self.fresh_label("rhs");
        let merge_label = self.fresh_label("merge");
        let rhs_bb = self.builder.ctx_mut().new_block(func, rhs_label);
        let merge_bb = self.builder.ctx_mut().new_block(func, merge_label);

        let i1 = self.builder.ctx().tys.i1;
        let short_const = match logical.op {
            LogicalOp::And => {
                self.builder.create_cond_br(lhs, rhs_bb, merge_bb)?;
                self.builder.ctx_mut().const_int(i1, 0)?
            }
            LogicalOp::Or => {
                self.builder.create_cond_br(lhs, merge_bb, rhs_bb)?;
                self.builder.ctx_mut().const_int(i1, 1)?
            }
        };

        self.builder.set_insert_point(rhs_bb);
        let rhs = self.operand(&logical.rhs)?;
        let rhs_end = self.builder.insert_block().expect("insertion point");
        let rhs_reaches_merge = !self.is_terminated();
        if rhs_reaches_merge {
            self.builder.create_br(merge_bb)?;
        }

        self.builder.set_insert_point(merge_bb);
        let mut incomings = vec![(short_const, lhs_end)];
        if rhs_reaches_merge {
            let rhs = rhs.ok_or_else(|| {
                IrError::InvalidIr("boolean operand produced no value".into())
            })?;
            incomings.push((rhs, rhs_end));
        }
        let result = self.builder.create_phi(i1, incomings)?;
        Ok(Lowered::value(result))
    }

    fn lower_if(&mut self, node: &AstNode<Expr>, if_expr: &rux_ast::IfExpr) -> IrResult<Lowered> {
        let Some(cond) = self.operand(&if_expr.condition)? else {
            return Ok(Lowered::NONE);
        };

        let func = self.func;
        let then_label = self.fresh_label("then");
        let then_bb = self.builder.ctx_mut().new_block(func, then_label);
        let else_bb = if_expr.else_branch.as_ref().map(|_| {
            let label = self.fresh_label("else");
            self.builder.ctx_mut().new_block(func, label)
        });
        let merge_label = self.fresh_label("merge");
        let merge_bb = self.builder.ctx_mut().new_block(func, merge_label);

        self.builder.create_cond_br(cond, then_bb, else_bb.unwrap_or(merge_bb))?;

        // Branch ends contribute a PHI incoming only when they fall
        // through to the merge; a branch that returned or broke has
        // no edge here.
        let mut incomings: Vec<(Option<ValueId>, rux_ir::BlockId)> = Vec::new();

        self.builder.set_insert_point(then_bb);
        let then_result = self.lower_block(&if_expr.then_block)?;
        if !self.is_terminated() {
            let end = self.builder.insert_block().expect("insertion point");
            incomings.push((then_result.value, end));
            self.builder.create_br(merge_bb)?;
        }

        if let (Some(else_branch), Some(else_bb)) = (&if_expr.else_branch, else_bb) {
            self.builder.set_insert_point(else_bb);
            let else_result = self.lower_expr(else_branch)?;
            if !self.is_terminated() {
                let end = self.builder.insert_block().expect("insertion point");
                incomings.push((else_result.value, end));
                self.builder.create_br(merge_bb)?;
            }
        }

        self.builder.set_insert_point(merge_bb);

        let ty = self.ty_of(node).clone();
        if ty.is_unit() || ty.is_never() {
            return Ok(Lowered::NONE);
        }

        let values: Vec<(ValueId, rux_ir::BlockId)> = incomings
            .into_iter()
            .filter_map(|(value, block)| value.map(|value| (value, block)))
            .collect();
        if values.is_empty() {
            return Ok(Lowered::NONE);
        }

        let phi_ty = value_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
        let result = self.builder.create_phi(phi_ty, values)?;
        Ok(Lowered::value(result))
    }

    /// `while`: `cond_bb → body_bb | after_bb`; `continue` re-tests
    /// the condition, `break` jumps past the loop.
    fn lower_while(&mut self, while_expr: &rux_ast::WhileExpr) -> IrResult<Lowered> {
        let func = self.func;
        let cond_label = self.fresh_label("cond");
        let body_label = self.fresh_label("body");
        let after_label = self.fresh_label("after");
        let cond_bb = self.builder.ctx_mut().new_block(func, cond_label);
        let body_bb = self.builder.ctx_mut().new_block(func, body_label);
        let after_bb = self.builder.ctx_mut().new_block(func, after_label);

        self.builder.create_br(cond_bb)?;

        self.builder.set_insert_point(cond_bb);
        let Some(cond) = self.operand(&while_expr.condition)? else {
            self.builder.set_insert_point(after_bb);
            return Ok(Lowered::NONE);
        };
        self.builder.create_cond_br(cond, body_bb, after_bb)?;

        self.loops_mut().push(LoopFrame {
            cond_bb: Some(cond_bb),
            body_bb,
            after_bb,
            incomings: Vec::new(),
        });

        self.builder.set_insert_point(body_bb);
        let body = self.lower_block(&while_expr.body);
        if body.is_ok() && !self.is_terminated() {
            self.builder.create_br(cond_bb)?;
        }
        self.loops_mut().pop();
        body?;

        self.builder.set_insert_point(after_bb);
        Ok(Lowered::NONE)
    }

    /// `loop`: the body branches back to itself; `break value`
    /// collects PHI incomings at the after-block.
    fn lower_loop(
        &mut self,
        node: &AstNode<Expr>,
        loop_expr: &rux_ast::LoopExpr,
    ) -> IrResult<Lowered> {
        let func = self.func;
        let body_label = self.fresh_label("body");
        let after_label = self.fresh_label("after");
        let body_bb = self.builder.ctx_mut().new_block(func, body_label);
        let after_bb = self.builder.ctx_mut().new_block(func, after_label);

        self.builder.create_br(body_bb)?;

        self.loops_mut().push(LoopFrame {
            cond_bb: None,
            body_bb,
            after_bb,
            incomings: Vec::new(),
        });

        self.builder.set_insert_point(body_bb);
        let body = self.lower_block(&loop_expr.body);
        if body.is_ok() && !self.is_terminated() {
            self.builder.create_br(body_bb)?;
        }
        let frame = self.loops_mut().pop().expect("frame pushed above");
        body?;

        self.builder.set_insert_point(after_bb);

        let ty = self.ty_of(node).clone();
        if ty.is_unit() || ty.is_never() {
            return Ok(Lowered::NONE);
        }

        let values: Vec<(ValueId, rux_ir::BlockId)> = frame
            .incomings
            .into_iter()
            .filter_map(|(value, block)| value.map(|value| (value, block)))
            .collect();
        if values.is_empty() {
            return Ok(Lowered::NONE);
        }

        let phi_ty = value_ty(self.builder.ctx_mut(), self.analysis, &ty)?;
        let result = self.builder.create_phi(phi_ty, values)?;
        Ok(Lowered::value(result))
    }

    /// A call to a runtime extern with its native C signature.
    fn lower_native_call(
        &mut self,
        symbol: SymbolId,
        args: &[AstNode<Expr>],
    ) -> IrResult<Lowered> {
        let func = *self.maps.functions.get(&symbol).ok_or_else(|| {
            IrError::MissingSymbol(self.analysis.symbols.name(symbol).to_string())
        })?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let Some(value) = self.operand(arg)? else {
                return Ok(Lowered::NONE);
            };
            values.push(value);
        }

        let result = self.builder.create_call(func, values)?;
        let ret = self.builder.ctx().fn_ret_ty(func);
        if ret == self.builder.ctx().tys.void {
            Ok(Lowered::NONE)
        } else {
            Ok(Lowered::value(result))
        }
    }

    /// A call under the aggregate-return ABI: allocate the return
    /// buffer, pass it first (then the self pointer for methods),
    /// pass aggregates by address, and read the result back out of
    /// the buffer.
    fn lower_abi_call(
        &mut self,
        symbol: SymbolId,
        self_ptr: Option<ValueId>,
        args: &[AstNode<Expr>],
        ret_ty: &Ty,
    ) -> IrResult<Lowered> {
        let func = *self.maps.functions.get(&symbol).ok_or_else(|| {
            IrError::MissingSymbol(self.analysis.symbols.name(symbol).to_string())
        })?;

        let buf_ty = lower_ty(self.builder.ctx_mut(), self.analysis, ret_ty)?;
        let buf = self.builder.create_alloca(buf_ty)?;

        let mut values = vec![buf];
        values.extend(self_ptr);

        for arg in args {
            let lowered = self.lower_expr(arg)?;
            let arg_ty = self.ty_of(arg).clone();

            let value = if is_aggregate(self.analysis, &arg_ty) {
                lowered.value
            } else if arg_ty.is_unit() {
                let i8_ty = self.builder.ctx().tys.i8;
                Some(self.builder.ctx_mut().const_int(i8_ty, 0)?)
            } else {
                lowered.value
            };
            let Some(value) = value else {
                return Ok(Lowered::NONE);
            };
            values.push(value);
        }

        self.builder.create_call(func, values)?;

        if is_aggregate(self.analysis, ret_ty) {
            Ok(Lowered::value(buf))
        } else if ret_ty.is_unit() || ret_ty.is_never() {
            Ok(Lowered::NONE)
        } else {
            let value = self.builder.create_load(buf_ty, buf)?;
            Ok(Lowered::value(value))
        }
    }
}
