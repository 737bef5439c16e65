//! Pass 3: expression type inference.
//!
//! Walks every function body and constant initialiser, assigning a
//! resolved type and an expression category to every expression.
//! Unsuffixed integer literals get placeholder types which later
//! narrow through unification; the confirmer pass pushes the final
//! concrete types back down.
use rux_ast::{
    AstNode, AstNodeId, BinOp, Block, Expr, FnDef, Item, Lit, Module, Stmt, UnOp,
};

use super::{err, eval_const_expr, resolve_path, resolve_ty_node};
use crate::{
    error::{SemaResult, SemanticErrorKind},
    scope::{ScopeId, ScopeKind},
    symbol::{SymbolId, SymbolKind},
    ty::{unify, PrimTy, Ty},
    Analysis, ExprCategory,
};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    let mut pass = TypecheckPass { analysis };

    for item in &module.items {
        match item.body() {
            Item::Fn(def) => pass.check_fn(item.id(), def)?,
            Item::Const(def) => pass.check_const(item.id(), def)?,
            Item::Impl(block) => {
                for member in &block.items {
                    match member.body() {
                        Item::Fn(def) => pass.check_fn(member.id(), def)?,
                        Item::Const(def) => pass.check_const(member.id(), def)?,
                        _ => {}
                    }
                }
            }
            // Trait items are signatures; bodies are checked where
            // they are implemented.
            Item::Trait(_) | Item::Struct(_) | Item::Enum(_) => {}
        }
    }
    Ok(())
}

struct TypecheckPass<'a> {
    analysis: &'a mut Analysis,
}

impl TypecheckPass<'_> {
    /// Reposition the scope cursor for the duration of `f`,
    /// restoring it on every path out.
    fn in_scope<R>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> SemaResult<R>,
    ) -> SemaResult<R> {
        let saved = self.analysis.scopes.current();
        self.analysis.scopes.set_current(scope);
        let result = f(self);
        self.analysis.scopes.set_current(saved);
        result
    }

    /// Record an expression's type and category.
    fn finish(&mut self, id: AstNodeId, ty: Ty, category: ExprCategory) -> Ty {
        self.analysis.tables.resolved_ty.insert(id, ty.clone());
        self.analysis.tables.expr_category.insert(id, category);
        ty
    }

    fn category_of(&self, id: AstNodeId) -> ExprCategory {
        self.analysis.tables.expr_category.get_copied(id).unwrap_or(ExprCategory::Value)
    }

    fn check_const(&mut self, item_id: AstNodeId, def: &rux_ast::ConstDef) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];
        let declared = self.analysis.symbols.value_ty(symbol).expect("constant symbol").clone();

        let found = self.check_expr(&def.value)?;
        if unify(&found, &declared).is_none() {
            return err(
                SemanticErrorKind::TypeMismatch { expected: declared, found },
                def.value.span(),
            );
        }
        Ok(())
    }

    fn check_fn(&mut self, item_id: AstNodeId, def: &FnDef) -> SemaResult<()> {
        let Some(body) = &def.body else {
            return Ok(());
        };

        let fn_scope = self.analysis.tables.owned_scope[item_id];
        let ScopeKind::Function { ret_ty, .. } = &self.analysis.scopes.get(fn_scope).kind else {
            unreachable!("pass 1 created a function scope");
        };
        let ret_ty = ret_ty.clone();

        let body_ty = self.in_scope(fn_scope, |this| this.check_block(body))?;
        if unify(&body_ty, &ret_ty).is_none() {
            return err(
                SemanticErrorKind::TypeMismatch { expected: ret_ty, found: body_ty },
                body.span(),
            );
        }
        Ok(())
    }

    fn check_block(&mut self, node: &AstNode<Block>) -> SemaResult<Ty> {
        let scope = self.analysis.tables.owned_scope[node.id()];
        self.in_scope(scope, |this| {
            let mut diverges = false;

            for stmt in &node.body().stmts {
                match stmt.body() {
                    Stmt::Let(let_stmt) => {
                        let annotated = match &let_stmt.ty {
                            Some(ty) => Some(resolve_ty_node(this.analysis, ty)?),
                            None => None,
                        };
                        let inferred = match &let_stmt.init {
                            Some(init) => Some(this.check_expr(init)?),
                            None => None,
                        };

                        if matches!(&inferred, Some(ty) if ty.is_never()) {
                            diverges = true;
                        }

                        let var_ty = match (annotated, inferred) {
                            (Some(declared), Some(found)) => match unify(&found, &declared) {
                                Some(ty) => ty,
                                None => {
                                    return err(
                                        SemanticErrorKind::TypeMismatch {
                                            expected: declared,
                                            found,
                                        },
                                        let_stmt.init.as_ref().unwrap().span(),
                                    )
                                }
                            },
                            (Some(declared), None) => declared,
                            (None, Some(found)) => found,
                            (None, None) => {
                                return err(
                                    SemanticErrorKind::CannotInfer {
                                        name: let_stmt.name.body().clone(),
                                    },
                                    let_stmt.name.span(),
                                )
                            }
                        };

                        let symbol = this.analysis.symbols.alloc(
                            let_stmt.name.body().clone(),
                            SymbolKind::Variable { ty: var_ty, mutable: let_stmt.mutable },
                        );
                        this.analysis.tables.decl_symbol.insert(stmt.id(), symbol);

                        let declared = this.analysis.scopes.declare_local(
                            let_stmt.name.body(),
                            symbol,
                            &this.analysis.symbols,
                        );
                        if !declared {
                            return err(
                                SemanticErrorKind::Redeclaration {
                                    name: let_stmt.name.body().clone(),
                                },
                                let_stmt.name.span(),
                            );
                        }
                    }
                    Stmt::Expr { expr, .. } => {
                        if this.check_expr(expr)?.is_never() {
                            diverges = true;
                        }
                    }
                }
            }

            match &node.body().tail {
                Some(tail) => {
                    let tail_ty = this.check_expr(tail)?;
                    Ok(if diverges { Ty::Never } else { tail_ty })
                }
                None => Ok(if diverges { Ty::Never } else { Ty::Unit }),
            }
        })
    }

    fn check_expr(&mut self, node: &AstNode<Expr>) -> SemaResult<Ty> {
        let id = node.id();
        let span = node.span();

        let ty = match node.body() {
            Expr::Lit(lit) => {
                let ty = match lit {
                    Lit::Int(int) => match int.suffix {
                        Some(suffix) => Ty::Prim(suffix_prim(suffix)),
                        None => Ty::INT,
                    },
                    Lit::Bool(_) => Ty::BOOL,
                    Lit::Char(_) => Ty::CHAR,
                    Lit::Str(_) => Ty::Prim(PrimTy::Str),
                };
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::Path(path) => {
                let symbol = resolve_path(self.analysis, id, path, span)?;
                let (ty, category) = self.path_value(symbol, span)?;
                self.finish(id, ty, category)
            }

            Expr::Unary(unary) => {
                let operand = self.check_expr(&unary.operand)?;
                let ty = match unary.op {
                    UnOp::Neg => match unify(&operand, &Ty::Prim(PrimTy::SignedInt)) {
                        Some(ty) => ty,
                        None => {
                            return err(
                                SemanticErrorKind::TypeMismatch {
                                    expected: Ty::Prim(PrimTy::SignedInt),
                                    found: operand,
                                },
                                unary.operand.span(),
                            )
                        }
                    },
                    UnOp::Not if operand.is_bool() || operand.is_integer() => operand,
                    UnOp::Not => {
                        return err(
                            SemanticErrorKind::TypeMismatch {
                                expected: Ty::BOOL,
                                found: operand,
                            },
                            unary.operand.span(),
                        )
                    }
                };
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::Ref(ref_expr) => {
                let inner = self.check_expr(&ref_expr.operand)?;
                self.finish(id, Ty::reference(inner, ref_expr.mutable), ExprCategory::Value)
            }

            Expr::Deref(deref) => {
                let operand = self.check_expr(&deref.operand)?;
                match operand.as_ref_ty() {
                    Some((inner, mutable)) => {
                        let category =
                            if mutable { ExprCategory::MutPlace } else { ExprCategory::Place };
                        let inner = inner.clone();
                        self.finish(id, inner, category)
                    }
                    None => {
                        return err(
                            SemanticErrorKind::TypeMismatch {
                                expected: Ty::reference(Ty::Unknown, false),
                                found: operand,
                            },
                            deref.operand.span(),
                        )
                    }
                }
            }

            Expr::Binary(binary) => {
                let lhs = self.check_expr(&binary.lhs)?;
                let rhs = self.check_expr(&binary.rhs)?;
                let ty = self.binary_ty(binary.op, lhs, rhs, node)?;
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::Logical(logical) => {
                for side in [&logical.lhs, &logical.rhs] {
                    let ty = self.check_expr(side)?;
                    if unify(&ty, &Ty::BOOL).is_none() {
                        return err(
                            SemanticErrorKind::TypeMismatch { expected: Ty::BOOL, found: ty },
                            side.span(),
                        );
                    }
                }
                self.finish(id, Ty::BOOL, ExprCategory::Value)
            }

            Expr::Assign(assign) => {
                let lhs = self.check_expr(&assign.lhs)?;
                let rhs = self.check_expr(&assign.rhs)?;
                if unify(&rhs, &lhs).is_none() {
                    return err(
                        SemanticErrorKind::TypeMismatch { expected: lhs, found: rhs },
                        assign.rhs.span(),
                    );
                }
                self.finish(id, Ty::Unit, ExprCategory::Value)
            }

            Expr::AssignOp(assign) => {
                let lhs = self.check_expr(&assign.lhs)?;
                let rhs = self.check_expr(&assign.rhs)?;
                self.binary_ty(assign.op, lhs, rhs, node)?;
                self.finish(id, Ty::Unit, ExprCategory::Value)
            }

            Expr::Cast(cast) => {
                let from = self.check_expr(&cast.operand)?;
                let to = resolve_ty_node(self.analysis, &cast.ty)?;

                let permitted = (from.is_integer() && to.is_integer())
                    || (from.is_bool() && to.is_integer());
                if !permitted {
                    return err(SemanticErrorKind::InvalidCast { from, to }, span);
                }
                self.finish(id, to, ExprCategory::Value)
            }

            Expr::Call(call) => {
                let symbol =
                    resolve_path(self.analysis, call.callee.id(), call.callee.body(), span)?;
                let name = call.callee.body().segments.last().unwrap();

                let function = match self.analysis.symbols.as_function(symbol) {
                    Some(function) => function,
                    None => {
                        return err(
                            SemanticErrorKind::NotAFunction { name: name.body().clone() },
                            name.span(),
                        )
                    }
                };
                if function.is_method {
                    return err(
                        SemanticErrorKind::InvalidSelf {
                            message: format!(
                                "method `{}` needs a receiver; call it with `.` syntax",
                                name.body()
                            ),
                        },
                        name.span(),
                    );
                }

                let ret_ty = function.ret_ty.clone();
                let params = function.params.clone();
                self.check_args(name.body(), &params, &call.args, span)?;
                self.finish(id, ret_ty, ExprCategory::Value)
            }

            Expr::MethodCall(call) => {
                let receiver_ty = self.check_expr(&call.receiver)?;
                let base = receiver_ty.auto_deref().clone();

                let Ty::Named { symbol: struct_symbol, .. } = &base else {
                    return err(
                        SemanticErrorKind::UnresolvedName { name: call.method.body().clone() },
                        call.method.span(),
                    );
                };
                let method = self
                    .analysis
                    .symbols
                    .as_struct(*struct_symbol)
                    .and_then(|def| def.methods.get(call.method.body()).copied());
                let Some(method) = method else {
                    return err(
                        SemanticErrorKind::UnresolvedName { name: call.method.body().clone() },
                        call.method.span(),
                    );
                };
                self.analysis.tables.node_symbol.insert(call.method.id(), method);

                let function = self.analysis.symbols.as_function(method).unwrap();
                let ret_ty = match &function.ret_ty {
                    Ty::SelfTy => base.clone(),
                    other => other.clone(),
                };
                let params = function.params.clone();
                self.check_args(call.method.body(), &params, &call.args, span)?;
                self.finish(id, ret_ty, ExprCategory::Value)
            }

            Expr::Field(field) => {
                let receiver_ty = self.check_expr(&field.receiver)?;
                let base = receiver_ty.auto_deref();

                let field_ty = match base {
                    Ty::Named { symbol, .. } => self
                        .analysis
                        .symbols
                        .as_struct(*symbol)
                        .and_then(|def| def.fields.get(field.field.body()).cloned()),
                    _ => None,
                };
                let Some(field_ty) = field_ty else {
                    return err(
                        SemanticErrorKind::UnresolvedName { name: field.field.body().clone() },
                        field.field.span(),
                    );
                };

                let category = self.projected_category(&receiver_ty, &field.receiver);
                self.finish(id, field_ty, category)
            }

            Expr::Index(index) => {
                let receiver_ty = self.check_expr(&index.receiver)?;
                let element = match receiver_ty.auto_deref() {
                    Ty::Array { element, .. } => element.as_ref().clone(),
                    other => {
                        return err(
                            SemanticErrorKind::TypeMismatch {
                                expected: Ty::Array { element: Box::new(Ty::Unknown), length: -1 },
                                found: other.clone(),
                            },
                            index.receiver.span(),
                        )
                    }
                };

                let index_ty = self.check_expr(&index.index)?;
                if unify(&index_ty, &Ty::USIZE).is_none() {
                    return err(
                        SemanticErrorKind::TypeMismatch {
                            expected: Ty::USIZE,
                            found: index_ty,
                        },
                        index.index.span(),
                    );
                }

                let category = self.projected_category(&receiver_ty, &index.receiver);
                self.finish(id, element, category)
            }

            Expr::StructLit(lit) => {
                let ty = self.check_struct_lit(lit, span)?;
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::ArrayLit(lit) => {
                let mut element = Ty::Unknown;
                for item in &lit.elements {
                    let item_ty = self.check_expr(item)?;
                    element = match unify(&element, &item_ty) {
                        Some(ty) => ty,
                        None => {
                            return err(
                                SemanticErrorKind::TypeMismatch {
                                    expected: element,
                                    found: item_ty,
                                },
                                item.span(),
                            )
                        }
                    };
                }

                let ty = Ty::Array {
                    element: Box::new(element),
                    length: lit.elements.len() as i64,
                };
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::ArrayRepeat(repeat) => {
                let element = self.check_expr(&repeat.element)?;

                let length_ty = self.check_expr(&repeat.length)?;
                if unify(&length_ty, &Ty::USIZE).is_none() {
                    return err(
                        SemanticErrorKind::TypeMismatch {
                            expected: Ty::USIZE,
                            found: length_ty,
                        },
                        repeat.length.span(),
                    );
                }
                let length = match eval_const_expr(self.analysis, &repeat.length) {
                    Some(length) if length >= 0 => length,
                    _ => {
                        return err(
                            SemanticErrorKind::UnresolvedType {
                                name: "array length".to_string(),
                            },
                            repeat.length.span(),
                        )
                    }
                };

                let ty = Ty::Array { element: Box::new(element), length };
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::Block(block) => {
                let ty = self.check_block(&block.block)?;
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::If(if_expr) => {
                let cond = self.check_expr(&if_expr.condition)?;
                if unify(&cond, &Ty::BOOL).is_none() {
                    return err(
                        SemanticErrorKind::TypeMismatch { expected: Ty::BOOL, found: cond },
                        if_expr.condition.span(),
                    );
                }

                let then_ty = self.check_block(&if_expr.then_block)?;
                let ty = match &if_expr.else_branch {
                    Some(else_branch) => {
                        let else_ty = self.check_expr(else_branch)?;
                        match unify(&then_ty, &else_ty) {
                            Some(ty) => ty,
                            None => {
                                return err(
                                    SemanticErrorKind::TypeMismatch {
                                        expected: then_ty,
                                        found: else_ty,
                                    },
                                    else_branch.span(),
                                )
                            }
                        }
                    }
                    None => match unify(&then_ty, &Ty::Unit) {
                        Some(_) => Ty::Unit,
                        None => {
                            return err(
                                SemanticErrorKind::TypeMismatch {
                                    expected: Ty::Unit,
                                    found: then_ty,
                                },
                                if_expr.then_block.span(),
                            )
                        }
                    },
                };
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::While(while_expr) => {
                let scope = self.analysis.tables.owned_scope[id];

                // A `while` always breaks with unit.
                let ScopeKind::Loop { break_ty, .. } = &mut self.analysis.scopes.get_mut(scope).kind
                else {
                    unreachable!("pass 1 created a loop scope");
                };
                *break_ty = Some(Ty::Unit);

                self.in_scope(scope, |this| {
                    let cond = this.check_expr(&while_expr.condition)?;
                    if unify(&cond, &Ty::BOOL).is_none() {
                        return err(
                            SemanticErrorKind::TypeMismatch { expected: Ty::BOOL, found: cond },
                            while_expr.condition.span(),
                        );
                    }

                    let body_ty = this.check_block(&while_expr.body)?;
                    if unify(&body_ty, &Ty::Unit).is_none() {
                        return err(
                            SemanticErrorKind::TypeMismatch {
                                expected: Ty::Unit,
                                found: body_ty,
                            },
                            while_expr.body.span(),
                        );
                    }
                    Ok(())
                })?;

                self.finish(id, Ty::Unit, ExprCategory::Value)
            }

            Expr::Loop(loop_expr) => {
                let scope = self.analysis.tables.owned_scope[id];

                self.in_scope(scope, |this| {
                    let body_ty = this.check_block(&loop_expr.body)?;
                    if unify(&body_ty, &Ty::Unit).is_none() {
                        return err(
                            SemanticErrorKind::TypeMismatch {
                                expected: Ty::Unit,
                                found: body_ty,
                            },
                            loop_expr.body.span(),
                        );
                    }
                    Ok(())
                })?;

                // If no `break` ran, the loop never produces a value.
                let ScopeKind::Loop { break_ty, .. } = &self.analysis.scopes.get(scope).kind
                else {
                    unreachable!();
                };
                let ty = break_ty.clone().unwrap_or(Ty::Never);
                self.finish(id, ty, ExprCategory::Value)
            }

            Expr::Break(break_expr) => {
                let position = self.analysis.tables.node_position[id];
                let Some(loop_scope) = self.analysis.scopes.enclosing_loop(position.scope) else {
                    return err(SemanticErrorKind::BreakOutsideLoop, span);
                };

                let value_ty = match &break_expr.value {
                    Some(value) => self.check_expr(value)?,
                    None => Ty::Unit,
                };

                let ScopeKind::Loop { break_ty, .. } =
                    &mut self.analysis.scopes.get_mut(loop_scope).kind
                else {
                    unreachable!();
                };

                let combined = match &*break_ty {
                    None => value_ty,
                    Some(existing) => match unify(existing, &value_ty) {
                        Some(ty) => ty,
                        None => {
                            let expected = existing.clone();
                            return err(
                                SemanticErrorKind::TypeMismatch { expected, found: value_ty },
                                span,
                            );
                        }
                    },
                };
                *break_ty = Some(combined);

                self.finish(id, Ty::Never, ExprCategory::Value)
            }

            Expr::Continue => {
                let position = self.analysis.tables.node_position[id];
                if self.analysis.scopes.enclosing_loop(position.scope).is_none() {
                    return err(SemanticErrorKind::ContinueOutsideLoop, span);
                }
                self.finish(id, Ty::Never, ExprCategory::Value)
            }

            Expr::Return(return_expr) => {
                let position = self.analysis.tables.node_position[id];
                let Some(fn_scope) = self.analysis.scopes.enclosing_function(position.scope)
                else {
                    return err(SemanticErrorKind::ReturnOutsideFunction, span);
                };
                let ScopeKind::Function { ret_ty, .. } = &self.analysis.scopes.get(fn_scope).kind
                else {
                    unreachable!();
                };
                let ret_ty = ret_ty.clone();

                let value_ty = match &return_expr.value {
                    Some(value) => self.check_expr(value)?,
                    None => Ty::Unit,
                };
                if unify(&value_ty, &ret_ty).is_none() {
                    return err(
                        SemanticErrorKind::TypeMismatch { expected: ret_ty, found: value_ty },
                        span,
                    );
                }

                self.finish(id, Ty::Never, ExprCategory::Value)
            }
        };

        Ok(ty)
    }

    /// Type and category of a path used in value position.
    fn path_value(
        &mut self,
        symbol: SymbolId,
        span: rux_source::Span,
    ) -> SemaResult<(Ty, ExprCategory)> {
        let symbol_data = self.analysis.symbols.get(symbol);
        match &symbol_data.kind {
            SymbolKind::Variable { ty, mutable } => {
                let category =
                    if *mutable { ExprCategory::MutPlace } else { ExprCategory::Place };
                Ok((ty.clone(), category))
            }
            SymbolKind::Constant { ty, .. } => Ok((ty.clone(), ExprCategory::Value)),
            SymbolKind::Variant { owner, .. } => {
                let name = self.analysis.symbols.name(*owner).to_string();
                Ok((Ty::Named { name, symbol: *owner }, ExprCategory::Value))
            }
            SymbolKind::Function(_)
            | SymbolKind::Struct(_)
            | SymbolKind::Enum(_)
            | SymbolKind::Trait(_) => err(
                SemanticErrorKind::NotAValue { name: symbol_data.name.clone() },
                span,
            ),
        }
    }

    /// The result type of a strict binary operator, enforcing the
    /// operand rules.
    fn binary_ty(
        &mut self,
        op: BinOp,
        lhs: Ty,
        rhs: Ty,
        node: &AstNode<Expr>,
    ) -> SemaResult<Ty> {
        if op.is_comparison() {
            let unified = match unify(&lhs, &rhs) {
                Some(ty) => ty,
                None => {
                    return err(
                        SemanticErrorKind::TypeMismatch { expected: lhs, found: rhs },
                        node.span(),
                    )
                }
            };
            if !is_comparable(&unified, &self.analysis.symbols) {
                return err(
                    SemanticErrorKind::TypeMismatch { expected: Ty::INT, found: unified },
                    node.span(),
                );
            }
            return Ok(Ty::BOOL);
        }

        if op.is_shift() {
            // The result takes the left operand's type; the right
            // only needs to be an integer.
            for ty in [&lhs, &rhs] {
                if !ty.is_integer() && !ty.is_never() {
                    return err(
                        SemanticErrorKind::TypeMismatch {
                            expected: Ty::INT,
                            found: (*ty).clone(),
                        },
                        node.span(),
                    );
                }
            }
            return Ok(unify(&lhs, &Ty::INT).unwrap_or(lhs));
        }

        let unified = match unify(&lhs, &rhs) {
            Some(ty) => ty,
            None => {
                return err(
                    SemanticErrorKind::TypeMismatch { expected: lhs, found: rhs },
                    node.span(),
                )
            }
        };
        if !unified.is_integer() && !unified.is_never() {
            return err(
                SemanticErrorKind::TypeMismatch { expected: Ty::INT, found: unified },
                node.span(),
            );
        }
        Ok(unified)
    }

    fn check_struct_lit(
        &mut self,
        lit: &rux_ast::StructLitExpr,
        span: rux_source::Span,
    ) -> SemaResult<Ty> {
        let position = self.analysis.tables.node_position[lit.path.id()];

        let struct_symbol = if lit.path.body() == "Self" {
            match self.analysis.scopes.enclosing_self_ty(position.scope) {
                Some(Ty::Named { symbol, .. }) => symbol,
                _ => {
                    return err(
                        SemanticErrorKind::InvalidSelf {
                            message: "`Self` outside of an `impl` block".to_string(),
                        },
                        lit.path.span(),
                    )
                }
            }
        } else {
            match self.analysis.scopes.lookup(position, lit.path.body()) {
                Some(symbol)
                    if matches!(self.analysis.symbols.get(symbol).kind, SymbolKind::Struct(_)) =>
                {
                    symbol
                }
                _ => {
                    return err(
                        SemanticErrorKind::UnresolvedType { name: lit.path.body().clone() },
                        lit.path.span(),
                    )
                }
            }
        };
        self.analysis.tables.node_symbol.insert(lit.path.id(), struct_symbol);

        let struct_def = self.analysis.symbols.as_struct(struct_symbol).unwrap();
        let expected_fields = struct_def.fields.clone();
        let struct_name = self.analysis.symbols.name(struct_symbol).to_string();

        if lit.fields.len() != expected_fields.len() {
            return err(
                SemanticErrorKind::ArityMismatch {
                    name: struct_name,
                    expected: expected_fields.len(),
                    found: lit.fields.len(),
                },
                span,
            );
        }

        let mut seen = Vec::new();
        for field in &lit.fields {
            let name = field.body().name.body();
            if seen.contains(name) {
                return err(
                    SemanticErrorKind::Redeclaration { name: name.clone() },
                    field.body().name.span(),
                );
            }
            seen.push(name.clone());

            let Some(expected) = expected_fields.get(name) else {
                return err(
                    SemanticErrorKind::UnresolvedName { name: name.clone() },
                    field.body().name.span(),
                );
            };

            let found = self.check_expr(&field.body().value)?;
            if unify(&found, expected).is_none() {
                return err(
                    SemanticErrorKind::TypeMismatch { expected: expected.clone(), found },
                    field.body().value.span(),
                );
            }
        }

        Ok(Ty::Named { name: struct_name, symbol: struct_symbol })
    }

    fn check_args(
        &mut self,
        name: &str,
        params: &[SymbolId],
        args: &[AstNode<Expr>],
        span: rux_source::Span,
    ) -> SemaResult<()> {
        if params.len() != args.len() {
            return err(
                SemanticErrorKind::ArityMismatch {
                    name: name.to_string(),
                    expected: params.len(),
                    found: args.len(),
                },
                span,
            );
        }

        for (param, arg) in params.iter().zip(args) {
            let expected = self.analysis.symbols.value_ty(*param).expect("parameter").clone();
            let found = self.check_expr(arg)?;
            if unify(&found, &expected).is_none() {
                return err(
                    SemanticErrorKind::TypeMismatch { expected, found },
                    arg.span(),
                );
            }
        }
        Ok(())
    }

    /// Category of a field or index projection: `&mut` upgrades to a
    /// mutable place, `&` pins to read-only, and a plain receiver
    /// passes its own category through.
    fn projected_category(
        &self,
        receiver_ty: &Ty,
        receiver: &AstNode<Expr>,
    ) -> ExprCategory {
        match receiver_ty {
            Ty::Ref { mutable: true, .. } => ExprCategory::MutPlace,
            Ty::Ref { mutable: false, .. } => ExprCategory::Place,
            _ => self.category_of(receiver.id()),
        }
    }
}

fn suffix_prim(suffix: rux_ast::IntSuffix) -> PrimTy {
    match suffix {
        rux_ast::IntSuffix::I32 => PrimTy::I32,
        rux_ast::IntSuffix::U32 => PrimTy::U32,
        rux_ast::IntSuffix::ISize => PrimTy::ISize,
        rux_ast::IntSuffix::USize => PrimTy::USize,
    }
}

/// Types an `icmp` can order: integers, `bool`, `char` and fieldless
/// enums (which lower to their discriminant).
fn is_comparable(ty: &Ty, symbols: &crate::SymbolArena) -> bool {
    match ty {
        _ if ty.is_integer() => true,
        Ty::Prim(PrimTy::Bool | PrimTy::Char) => true,
        Ty::Named { symbol, .. } => symbols.as_enum(*symbol).is_some(),
        Ty::Never => true,
        _ => false,
    }
}
