//! Pass 5: path finalisation.
//!
//! Re-resolves every path expression (including callees) with the
//! complete symbol tables and binds the result into the `node_symbol`
//! table, which is what the lowering stage reads. Pass 3 already
//! bound most paths while typing them; this pass guarantees a binding
//! exists for all of them and that it is derived from the final state
//! of the member dictionaries.
use rux_ast::{AstNode, Block, Expr, Item, Module, Stmt};

use super::resolve_path;
use crate::{error::SemaResult, Analysis};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    let mut pass = PathsPass { analysis };

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

struct PathsPass<'a> {
    analysis: &'a mut Analysis,
}

impl PathsPass<'_> {
    fn fn_body(&mut self, def: &rux_ast::FnDef) -> SemaResult<()> {
        match &def.body {
            Some(body) => self.block(body),
            None => Ok(()),
        }
    }

    fn block(&mut self, node: &AstNode<Block>) -> SemaResult<()> {
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

    fn expr(&mut self, node: &AstNode<Expr>) -> SemaResult<()> {
        match node.body() {
            Expr::Path(path) => {
                resolve_path(self.analysis, node.id(), path, node.span())?;
                Ok(())
            }

            Expr::Call(call) => {
                resolve_path(
                    self.analysis,
                    call.callee.id(),
                    call.callee.body(),
                    call.callee.span(),
                )?;
                call.args.iter().try_for_each(|arg| self.expr(arg))
            }

            Expr::Lit(_) | Expr::Continue => Ok(()),

            Expr::Unary(unary) => self.expr(&unary.operand),
            Expr::Ref(ref_expr) => self.expr(&ref_expr.operand),
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
            Expr::Assign(assign) => {
                self.expr(&assign.lhs)?;
                self.expr(&assign.rhs)
            }
            Expr::AssignOp(assign) => {
                self.expr(&assign.lhs)?;
                self.expr(&assign.rhs)
            }

            Expr::MethodCall(call) => {
                self.expr(&call.receiver)?;
                call.args.iter().try_for_each(|arg| self.expr(arg))
            }
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
}
