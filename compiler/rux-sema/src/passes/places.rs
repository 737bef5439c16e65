//! Pass 4: place and mutability checks.
//!
//! Pass 3 assigned every expression a category; this pass walks the
//! bodies again and enforces that assignments and `&mut` borrows land
//! on mutable places, that plain borrows land on places at all, and
//! that method receivers satisfy the declared `self` parameter.
use rux_ast::{AstNode, Block, Expr, Item, Module, SelfParam, Stmt};

use super::err;
use crate::{
    error::{SemaResult, SemanticErrorKind},
    ty::Ty,
    Analysis, ExprCategory,
};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    let pass = PlacesPass { analysis };

    for item in &module.items {
        match item.body() {
            Item::Fn(def) => pass.fn_body(def)?,
            Item::Const(def) => pass.expr(&def.value)?,
            Item::Impl(block) => {
                for member in &block.items {
                    match member.body() {
                        Item::Fn(def) => pass.fn_body(def)?,
                        Item::Const(def) => pass.expr(&def.value)?,
                        _ => {}
                    }
                }
            }
            Item::Trait(_) | Item::Struct(_) | Item::Enum(_) => {}
        }
    }
    Ok(())
}

struct PlacesPass<'a> {
    analysis: &'a Analysis,
}

impl PlacesPass<'_> {
    fn fn_body(&self, def: &rux_ast::FnDef) -> SemaResult<()> {
        match &def.body {
            Some(body) => self.block(body),
            None => Ok(()),
        }
    }

    fn category(&self, node: &AstNode<Expr>) -> ExprCategory {
        self.analysis.tables.expr_category.get_copied(node.id()).unwrap_or(ExprCategory::Value)
    }

    /// The target of an assignment or `&mut` borrow must be a mutable
    /// place.
    fn require_mut_place(&self, node: &AstNode<Expr>, borrowing: bool) -> SemaResult<()> {
        match self.category(node) {
            ExprCategory::MutPlace => Ok(()),
            ExprCategory::Place => err(SemanticErrorKind::NotMutable, node.span()),
            ExprCategory::Value if borrowing => {
                err(SemanticErrorKind::NotAddressable, node.span())
            }
            ExprCategory::Value => err(SemanticErrorKind::NotAPlace, node.span()),
        }
    }

    fn block(&self, node: &AstNode<Block>) -> SemaResult<()> {
        for stmt in &node.body().stmts {
            match stmt.body() {
                Stmt::Let(let_stmt) => {
                    if let Some(init) = &let_stmt.init {
                        self.expr(init)?;
                    }
                }
                Stmt::Expr { expr, .. } => self.expr(expr)?,
            }
        }
        match &node.body().tail {
            Some(tail) => self.expr(tail),
            None => Ok(()),
        }
    }

    fn expr(&self, node: &AstNode<Expr>) -> SemaResult<()> {
        match node.body() {
            Expr::Lit(_) | Expr::Path(_) | Expr::Continue => Ok(()),

            Expr::Assign(assign) => {
                self.expr(&assign.lhs)?;
                self.expr(&assign.rhs)?;
                self.require_mut_place(&assign.lhs, false)
            }
            Expr::AssignOp(assign) => {
                self.expr(&assign.lhs)?;
                self.expr(&assign.rhs)?;
                self.require_mut_place(&assign.lhs, false)
            }

            Expr::Ref(ref_expr) => {
                self.expr(&ref_expr.operand)?;
                if ref_expr.mutable {
                    self.require_mut_place(&ref_expr.operand, true)
                } else if self.category(&ref_expr.operand) == ExprCategory::Value {
                    err(SemanticErrorKind::NotAddressable, ref_expr.operand.span())
                } else {
                    Ok(())
                }
            }

            Expr::MethodCall(call) => {
                self.expr(&call.receiver)?;
                call.args.iter().try_for_each(|arg| self.expr(arg))?;
                self.check_receiver(call)
            }

            Expr::Unary(unary) => self.expr(&unary.operand),
            Expr::Deref(deref) => self.expr(&deref.operand),
            Expr::Cast(cast) => self.expr(&cast.operand),

            Expr::Binary(binary) => {
                self.expr(&binary.lhs)?;
                self.expr(&binary.rhs)
            }
            Expr::Logical(logical) => {
                self.expr(&logical.lhs)?;
                self.expr(&logical.rhs)
            }

            Expr::Call(call) => call.args.iter().try_for_each(|arg| self.expr(arg)),

            Expr::Field(field) => self.expr(&field.receiver),
            Expr::Index(index) => {
                self.expr(&index.receiver)?;
                self.expr(&index.index)
            }

            Expr::StructLit(lit) => {
                lit.fields.iter().try_for_each(|field| self.expr(&field.body().value))
            }
            Expr::ArrayLit(lit) => lit.elements.iter().try_for_each(|element| self.expr(element)),
            Expr::ArrayRepeat(repeat) => {
                self.expr(&repeat.element)?;
                self.expr(&repeat.length)
            }

            Expr::Block(block) => self.block(&block.block),
            Expr::If(if_expr) => {
                self.expr(&if_expr.condition)?;
                self.block(&if_expr.then_block)?;
                match &if_expr.else_branch {
                    Some(else_branch) => self.expr(else_branch),
                    None => Ok(()),
                }
            }
            Expr::While(while_expr) => {
                self.expr(&while_expr.condition)?;
                self.block(&while_expr.body)
            }
            Expr::Loop(loop_expr) => self.block(&loop_expr.body),

            Expr::Break(break_expr) => match &break_expr.value {
                Some(value) => self.expr(value),
                None => Ok(()),
            },
            Expr::Return(return_expr) => match &return_expr.value {
                Some(value) => self.expr(value),
                None => Ok(()),
            },
        }
    }

    /// A `&mut self` method needs a receiver it may mutate through:
    /// either a mutable place or a `&mut` reference value.
    fn check_receiver(&self, call: &rux_ast::MethodCallExpr) -> SemaResult<()> {
        let method = self.analysis.tables.node_symbol[call.method.id()];
        let function = self.analysis.symbols.as_function(method).expect("resolved method");

        if function.self_param != Some(SelfParam::RefMut) {
            return Ok(());
        }

        let receiver_ty = &self.analysis.tables.resolved_ty[call.receiver.id()];
        match receiver_ty {
            Ty::Ref { mutable: true, .. } => Ok(()),
            Ty::Ref { mutable: false, .. } => err(
                SemanticErrorKind::InvalidSelf {
                    message: format!(
                        "method `{}` mutates its receiver, which is behind a `&` reference",
                        call.method.body()
                    ),
                },
                call.receiver.span(),
            ),
            _ if self.category(&call.receiver) == ExprCategory::MutPlace => Ok(()),
            _ => err(
                SemanticErrorKind::InvalidSelf {
                    message: format!(
                        "method `{}` mutates its receiver, which is not a mutable place",
                        call.method.body()
                    ),
                },
                call.receiver.span(),
            ),
        }
    }
}
