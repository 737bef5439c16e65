//! The integer-type confirmer.
//!
//! A final top-down push over every body: given the types inference
//! settled on, the concrete type of each context is pushed through
//! operands so that every integer-literal-typed leaf ends with a
//! concrete `i32`/`u32`/`isize`/`usize`. An expression whose type is
//! still a placeholder once its context has been applied is an
//! ambiguity error; there is no silent default.
use rux_ast::{AstNode, AstNodeId, Block, Expr, Item, Module, Stmt};

use super::err;
use crate::{
    error::{SemaResult, SemanticErrorKind},
    symbol::SymbolKind,
    ty::{unify, Ty},
    Analysis,
};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    let mut pass = ConfirmPass { analysis, loop_tys: Vec::new(), ret_ty: Ty::Unit };

    for item in &module.items {
        match item.body() {
            Item::Fn(def) => pass.fn_body(item.id(), def)?,
            Item::Const(def) => pass.const_def(item.id(), def)?,
            Item::Impl(block) => {
                for member in &block.items {
                    match member.body() {
                        Item::Fn(def) => pass.fn_body(member.id(), def)?,
                        Item::Const(def) => pass.const_def(member.id(), def)?,
                        _ => {}
                    }
                }
            }
            Item::Trait(_) | Item::Struct(_) | Item::Enum(_) => {}
        }
    }
    Ok(())
}

struct ConfirmPass<'a> {
    analysis: &'a mut Analysis,
    /// Final types of the enclosing loops, innermost last; the
    /// context for `break` values.
    loop_tys: Vec<Ty>,
    /// Return type of the function being confirmed; the context for
    /// `return` values.
    ret_ty: Ty,
}

impl ConfirmPass<'_> {
    fn const_def(&mut self, item_id: AstNodeId, def: &rux_ast::ConstDef) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];
        let declared = self.analysis.symbols.value_ty(symbol).expect("constant symbol").clone();
        self.expr(&def.value, &declared)?;
        Ok(())
    }

    fn fn_body(&mut self, item_id: AstNodeId, def: &rux_ast::FnDef) -> SemaResult<()> {
        let Some(body) = &def.body else {
            return Ok(());
        };

        let symbol = self.analysis.tables.decl_symbol[item_id];
        self.ret_ty = self
            .analysis
            .symbols
            .as_function(symbol)
            .expect("function symbol")
            .ret_ty
            .clone();

        self.block(body, &self.ret_ty.clone())
    }

    fn block(&mut self, node: &AstNode<Block>, ctx: &Ty) -> SemaResult<()> {
        for stmt in &node.body().stmts {
            match stmt.body() {
                Stmt::Let(let_stmt) => {
                    let symbol = self.analysis.tables.decl_symbol[stmt.id()];
                    let var_ty =
                        self.analysis.symbols.value_ty(symbol).expect("let binding").clone();

                    if let Some(init) = &let_stmt.init {
                        let confirmed = self.expr(init, &var_ty)?;

                        // An unannotated binding takes the confirmed
                        // type so the lowering stage sees no
                        // placeholders.
                        if var_ty.is_placeholder_integer() {
                            let SymbolKind::Variable { ty, .. } =
                                &mut self.analysis.symbols.get_mut(symbol).kind
                            else {
                                unreachable!();
                            };
                            *ty = confirmed;
                        }
                    } else if var_ty.is_placeholder_integer() {
                        return err(
                            SemanticErrorKind::AmbiguousIntegerLiteral,
                            let_stmt.name.span(),
                        );
                    }
                }
                Stmt::Expr { expr, .. } => {
                    let own = self.own_ty(expr);
                    self.expr(expr, &own)?;
                }
            }
        }

        match &node.body().tail {
            Some(tail) => {
                self.expr(tail, ctx)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn own_ty(&self, node: &AstNode<Expr>) -> Ty {
        self.analysis.tables.resolved_ty[node.id()].clone()
    }

    /// Push `ctx` onto the expression, finalise its recorded type,
    /// and recurse with each operand's own context.
    fn expr(&mut self, node: &AstNode<Expr>, ctx: &Ty) -> SemaResult<Ty> {
        let id = node.id();
        let own = self.own_ty(node);

        // `!` stays `!`; everything else narrows towards the context
        // where unification allows, and otherwise keeps what
        // inference found.
        let finalised = if own.is_never() {
            own
        } else {
            unify(&own, ctx).unwrap_or(own)
        };

        if finalised.is_placeholder_integer() {
            return err(SemanticErrorKind::AmbiguousIntegerLiteral, node.span());
        }
        self.analysis.tables.resolved_ty.insert(id, finalised.clone());

        match node.body() {
            Expr::Lit(_) | Expr::Path(_) | Expr::Continue => {}

            Expr::Unary(unary) => {
                self.expr(&unary.operand, &finalised)?;
            }

            Expr::Ref(ref_expr) => {
                let inner = match &finalised {
                    Ty::Ref { inner, .. } => inner.as_ref().clone(),
                    _ => self.own_ty(&ref_expr.operand),
                };
                self.expr(&ref_expr.operand, &inner)?;
            }
            Expr::Deref(deref) => {
                let operand_ty = self.own_ty(&deref.operand);
                self.expr(&deref.operand, &operand_ty)?;
            }

            Expr::Binary(binary) => {
                if binary.op.is_comparison() {
                    let lhs = self.own_ty(&binary.lhs);
                    let rhs = self.own_ty(&binary.rhs);
                    let common = unify(&lhs, &rhs).unwrap_or(lhs);
                    self.expr(&binary.lhs, &common)?;
                    self.expr(&binary.rhs, &common)?;
                } else if binary.op.is_shift() {
                    // Only the left operand takes the result type;
                    // the shift amount falls back to `i32`.
                    self.expr(&binary.lhs, &finalised)?;
                    self.expr(&binary.rhs, &Ty::I32)?;
                } else {
                    self.expr(&binary.lhs, &finalised)?;
                    self.expr(&binary.rhs, &finalised)?;
                }
            }

            Expr::Logical(logical) => {
                self.expr(&logical.lhs, &Ty::BOOL)?;
                self.expr(&logical.rhs, &Ty::BOOL)?;
            }

            Expr::Assign(assign) => {
                let lhs_ty = self.own_ty(&assign.lhs);
                let lhs = self.expr(&assign.lhs, &lhs_ty)?;
                self.expr(&assign.rhs, &lhs)?;
            }
            Expr::AssignOp(assign) => {
                let lhs_ty = self.own_ty(&assign.lhs);
                let lhs = self.expr(&assign.lhs, &lhs_ty)?;
                if assign.op.is_shift() {
                    self.expr(&assign.rhs, &Ty::I32)?;
                } else {
                    self.expr(&assign.rhs, &lhs)?;
                }
            }

            Expr::Cast(cast) => {
                // The destination type is what the operand's literal
                // leaves should settle on.
                self.expr(&cast.operand, &finalised)?;
            }

            Expr::Call(call) => {
                let symbol = self.analysis.tables.node_symbol[call.callee.id()];
                self.args_with_formals(symbol, &call.args)?;
            }
            Expr::MethodCall(call) => {
                let receiver_ty = self.own_ty(&call.receiver);
                self.expr(&call.receiver, &receiver_ty)?;
                let symbol = self.analysis.tables.node_symbol[call.method.id()];
                self.args_with_formals(symbol, &call.args)?;
            }

            Expr::Field(field) => {
                let receiver_ty = self.own_ty(&field.receiver);
                self.expr(&field.receiver, &receiver_ty)?;
            }
            Expr::Index(index) => {
                let receiver_ty = self.own_ty(&index.receiver);
                self.expr(&index.receiver, &receiver_ty)?;
                self.expr(&index.index, &Ty::USIZE)?;
            }

            Expr::StructLit(lit) => {
                let struct_symbol = self.analysis.tables.node_symbol[lit.path.id()];
                let fields = self
                    .analysis
                    .symbols
                    .as_struct(struct_symbol)
                    .expect("struct literal target")
                    .fields
                    .clone();
                for field in &lit.fields {
                    let formal = fields[field.body().name.body()].clone();
                    self.expr(&field.body().value, &formal)?;
                }
            }

            Expr::ArrayLit(lit) => {
                let element = match &finalised {
                    Ty::Array { element, .. } => element.as_ref().clone(),
                    _ => Ty::Unknown,
                };
                for item in &lit.elements {
                    self.expr(item, &element)?;
                }
            }
            Expr::ArrayRepeat(repeat) => {
                let element = match &finalised {
                    Ty::Array { element, .. } => element.as_ref().clone(),
                    _ => Ty::Unknown,
                };
                self.expr(&repeat.element, &element)?;
                self.expr(&repeat.length, &Ty::USIZE)?;
            }

            Expr::Block(block) => {
                self.block(&block.block, &finalised)?;
            }

            Expr::If(if_expr) => {
                self.expr(&if_expr.condition, &Ty::BOOL)?;
                self.block(&if_expr.then_block, &finalised)?;
                if let Some(else_branch) = &if_expr.else_branch {
                    self.expr(else_branch, &finalised)?;
                }
            }

            Expr::While(while_expr) => {
                self.loop_tys.push(Ty::Unit);
                let result = (|| {
                    self.expr(&while_expr.condition, &Ty::BOOL)?;
                    self.block(&while_expr.body, &Ty::Unit)
                })();
                self.loop_tys.pop();
                result?;
            }
            Expr::Loop(loop_expr) => {
                self.loop_tys.push(finalised.clone());
                let result = self.block(&loop_expr.body, &Ty::Unit);
                self.loop_tys.pop();
                result?;
            }

            Expr::Break(break_expr) => {
                if let Some(value) = &break_expr.value {
                    let ctx = self.loop_tys.last().cloned().unwrap_or(Ty::Unit);
                    self.expr(value, &ctx)?;
                }
            }
            Expr::Return(return_expr) => {
                if let Some(value) = &return_expr.value {
                    let ctx = self.ret_ty.clone();
                    self.expr(value, &ctx)?;
                }
            }
        }

        Ok(finalised)
    }

    fn args_with_formals(
        &mut self,
        symbol: crate::SymbolId,
        args: &[AstNode<Expr>],
    ) -> SemaResult<()> {
        let formals: Vec<Ty> = {
            let function = self.analysis.symbols.as_function(symbol).expect("callee");
            function
                .params
                .iter()
                .map(|param| self.analysis.symbols.value_ty(*param).expect("parameter").clone())
                .collect()
        };

        for (arg, formal) in args.iter().zip(formals) {
            self.expr(arg, &formal)?;
        }
        Ok(())
    }
}
