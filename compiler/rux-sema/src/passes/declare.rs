//! Pass 1: item declaration.
//!
//! One traversal that creates the scope tree (crate, functions,
//! blocks, loops, impls, traits), records every node's scope
//! position, and declares top-level symbol shells. Member
//! dictionaries stay empty; pass 2 fills them.
use rux_ast::{
    AstNode, AstNodeId, Block, Expr, FnDef, Item, Module, Stmt, Ty as TyNode,
};

use super::err;
use crate::{
    error::{SemaResult, SemanticErrorKind},
    scope::ScopeKind,
    symbol::{EnumSymbol, FunctionSymbol, StructSymbol, SymbolKind, TraitSymbol},
    ty::Ty,
    Analysis,
};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    declare_runtime(analysis);

    let mut pass = DeclarePass { analysis };
    for item in &module.items {
        pass.item(item)?;
    }
    Ok(())
}

/// Declare the functions provided by the linked C runtime. They are
/// called with their native signatures and never lowered.
fn declare_runtime(analysis: &mut Analysis) {
    let externs: [(&str, &[Ty], Ty); 3] = [
        ("printInt", &[Ty::I32], Ty::Unit),
        ("printlnInt", &[Ty::I32], Ty::Unit),
        ("getInt", &[], Ty::I32),
    ];

    for (name, params, ret_ty) in externs {
        let params = params
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                analysis.symbols.alloc(
                    format!("arg{index}"),
                    SymbolKind::Variable { ty: ty.clone(), mutable: false },
                )
            })
            .collect();

        let symbol = analysis.symbols.alloc(
            name,
            SymbolKind::Function(FunctionSymbol {
                params,
                ret_ty,
                is_external: true,
                ..FunctionSymbol::new()
            }),
        );
        analysis.scopes.declare_item(name, symbol);
    }
}

struct DeclarePass<'a> {
    analysis: &'a mut Analysis,
}

impl DeclarePass<'_> {
    /// Record the cursor position on a node; every node gets one.
    fn record(&mut self, id: AstNodeId) {
        let position = self.analysis.scopes.position();
        self.analysis.tables.node_position.insert(id, position);
    }

    fn declare_item(&mut self, name: &AstNode<String>, symbol_id: crate::SymbolId) -> SemaResult<()> {
        if !self.analysis.scopes.declare_item(name.body(), symbol_id) {
            return err(
                SemanticErrorKind::Redeclaration { name: name.body().clone() },
                name.span(),
            );
        }
        Ok(())
    }

    fn item(&mut self, node: &AstNode<Item>) -> SemaResult<()> {
        self.record(node.id());

        match node.body() {
            Item::Fn(def) => self.fn_def(node.id(), def),

            Item::Struct(def) => {
                self.record(def.name.id());
                let symbol = self
                    .analysis
                    .symbols
                    .alloc(def.name.body().clone(), SymbolKind::Struct(StructSymbol::default()));
                self.declare_item(&def.name, symbol)?;
                self.analysis.tables.decl_symbol.insert(node.id(), symbol);

                for field in &def.fields {
                    self.record(field.id());
                    self.record(field.body().name.id());
                    self.ty_node(&field.body().ty)?;
                }
                Ok(())
            }

            Item::Enum(def) => {
                self.record(def.name.id());
                let symbol = self
                    .analysis
                    .symbols
                    .alloc(def.name.body().clone(), SymbolKind::Enum(EnumSymbol::default()));
                self.declare_item(&def.name, symbol)?;
                self.analysis.tables.decl_symbol.insert(node.id(), symbol);

                for variant in &def.variants {
                    self.record(variant.id());
                }
                Ok(())
            }

            Item::Trait(def) => {
                self.record(def.name.id());
                let symbol = self
                    .analysis
                    .symbols
                    .alloc(def.name.body().clone(), SymbolKind::Trait(TraitSymbol::default()));
                self.declare_item(&def.name, symbol)?;
                self.analysis.tables.decl_symbol.insert(node.id(), symbol);

                let scope = self.analysis.scopes.enter(ScopeKind::Trait { symbol });
                self.analysis.tables.owned_scope.insert(node.id(), scope);
                let result = def.items.iter().try_for_each(|item| self.item(item));
                self.analysis.scopes.exit();
                result
            }

            Item::Impl(block) => {
                if let Some(trait_name) = &block.trait_name {
                    self.record(trait_name.id());
                }

                let scope = self.analysis.scopes.enter(ScopeKind::Impl { self_ty: Ty::Unknown });
                self.analysis.tables.owned_scope.insert(node.id(), scope);
                let result = (|| {
                    self.ty_node(&block.self_ty)?;
                    block.items.iter().try_for_each(|item| self.item(item))
                })();
                self.analysis.scopes.exit();
                result
            }

            Item::Const(def) => {
                self.record(def.name.id());
                let symbol = self.analysis.symbols.alloc(
                    def.name.body().clone(),
                    SymbolKind::Constant { ty: Ty::Unknown, value: None },
                );
                self.declare_item(&def.name, symbol)?;
                self.analysis.tables.decl_symbol.insert(node.id(), symbol);

                self.ty_node(&def.ty)?;
                self.expr(&def.value)
            }
        }
    }

    fn fn_def(&mut self, item_id: AstNodeId, def: &FnDef) -> SemaResult<()> {
        self.record(def.name.id());

        let symbol = self
            .analysis
            .symbols
            .alloc(def.name.body().clone(), SymbolKind::Function(FunctionSymbol::new()));
        self.declare_item(&def.name, symbol)?;
        self.analysis.tables.decl_symbol.insert(item_id, symbol);

        let scope =
            self.analysis.scopes.enter(ScopeKind::Function { symbol, ret_ty: Ty::Unknown });
        self.analysis.tables.owned_scope.insert(item_id, scope);

        let result = (|| {
            if let Some(self_param) = &def.self_param {
                self.record(self_param.id());
            }
            for param in &def.params {
                self.record(param.id());
                self.record(param.body().name.id());
                self.ty_node(&param.body().ty)?;
            }
            if let Some(ret_ty) = &def.ret_ty {
                self.ty_node(ret_ty)?;
            }
            if let Some(body) = &def.body {
                self.block(body)?;
            }
            Ok(())
        })();

        self.analysis.scopes.exit();
        result
    }

    fn ty_node(&mut self, node: &AstNode<TyNode>) -> SemaResult<()> {
        self.record(node.id());
        match node.body() {
            TyNode::Ref { inner, .. } => self.ty_node(inner),
            TyNode::Array { element, length } => {
                self.ty_node(element)?;
                self.expr(length)
            }
            TyNode::Path(_) | TyNode::Unit | TyNode::SelfTy => Ok(()),
        }
    }

    fn block(&mut self, node: &AstNode<Block>) -> SemaResult<()> {
        self.record(node.id());

        let scope = self.analysis.scopes.enter(ScopeKind::Block);
        self.analysis.tables.owned_scope.insert(node.id(), scope);

        let result = (|| {
            for stmt in &node.body().stmts {
                self.stmt(stmt)?;
            }
            if let Some(tail) = &node.body().tail {
                self.expr(tail)?;
            }
            Ok(())
        })();

        self.analysis.scopes.exit();
        result
    }

    fn stmt(&mut self, node: &AstNode<Stmt>) -> SemaResult<()> {
        self.record(node.id());

        match node.body() {
            Stmt::Let(stmt) => {
                self.record(stmt.name.id());
                if let Some(ty) = &stmt.ty {
                    self.ty_node(ty)?;
                }
                if let Some(init) = &stmt.init {
                    self.expr(init)?;
                }
                // The binding becomes visible only after its own
                // initialiser.
                self.analysis.scopes.advance_decl_cursor();
                Ok(())
            }
            Stmt::Expr { expr, .. } => self.expr(expr),
        }
    }

    fn expr(&mut self, node: &AstNode<Expr>) -> SemaResult<()> {
        self.record(node.id());

        match node.body() {
            Expr::Lit(_) | Expr::Continue => Ok(()),

            Expr::Path(path) => {
                for segment in &path.segments {
                    self.record(segment.id());
                }
                Ok(())
            }

            Expr::Unary(unary) => self.expr(&unary.operand),
            Expr::Ref(ref_expr) => self.expr(&ref_expr.operand),
            Expr::Deref(deref) => self.expr(&deref.operand),

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

            Expr::Cast(cast) => {
                self.expr(&cast.operand)?;
                self.ty_node(&cast.ty)
            }

            Expr::Call(call) => {
                self.record(call.callee.id());
                for segment in &call.callee.body().segments {
                    self.record(segment.id());
                }
                call.args.iter().try_for_each(|arg| self.expr(arg))
            }
            Expr::MethodCall(call) => {
                self.record(call.method.id());
                self.expr(&call.receiver)?;
                call.args.iter().try_for_each(|arg| self.expr(arg))
            }

            Expr::Field(field) => {
                self.record(field.field.id());
                self.expr(&field.receiver)
            }
            Expr::Index(index) => {
                self.expr(&index.receiver)?;
                self.expr(&index.index)
            }

            Expr::StructLit(lit) => {
                self.record(lit.path.id());
                for field in &lit.fields {
                    self.record(field.id());
                    self.record(field.body().name.id());
                    self.expr(&field.body().value)?;
                }
                Ok(())
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
                if let Some(else_branch) = &if_expr.else_branch {
                    self.expr(else_branch)?;
                }
                Ok(())
            }

            Expr::While(while_expr) => {
                let scope = self
                    .analysis
                    .scopes
                    .enter(ScopeKind::Loop { break_ty: None, is_while: true });
                self.analysis.tables.owned_scope.insert(node.id(), scope);
                let result = (|| {
                    self.expr(&while_expr.condition)?;
                    self.block(&while_expr.body)
                })();
                self.analysis.scopes.exit();
                result
            }
            Expr::Loop(loop_expr) => {
                let scope = self
                    .analysis
                    .scopes
                    .enter(ScopeKind::Loop { break_ty: None, is_while: false });
                self.analysis.tables.owned_scope.insert(node.id(), scope);
                let result = self.block(&loop_expr.body);
                self.analysis.scopes.exit();
                result
            }

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
