//! Pass 2: type resolution on declarations.
//!
//! Fills in struct field types, enum variant tables, constant types
//! and values, function signatures, and trait/impl member
//! dictionaries. Bodies are untouched; pass 3 handles them.
//!
//! Constants are resolved before anything else so that array lengths
//! in field and parameter types can refer to them; enums and structs
//! come next so signatures can name them.
use rux_ast::{AstNode, AstNodeId, ConstDef, FnDef, Item, Module, SelfParam};

use super::{err, eval_const_expr, resolve_ty_node};
use crate::{
    error::{SemaResult, SemanticErrorKind},
    scope::{ScopeId, ScopeKind},
    symbol::{SymbolId, SymbolKind},
    ty::Ty,
    Analysis,
};

pub fn run(module: &Module, analysis: &mut Analysis) -> SemaResult<()> {
    let mut pass = ResolvePass { analysis };

    for item in &module.items {
        if let Item::Const(def) = item.body() {
            pass.const_def(item.id(), def)?;
        }
    }
    for item in &module.items {
        if let Item::Enum(def) = item.body() {
            pass.enum_def(item.id(), def)?;
        }
    }
    for item in &module.items {
        if let Item::Struct(def) = item.body() {
            pass.struct_def(item.id(), def)?;
        }
    }
    for item in &module.items {
        if let Item::Trait(def) = item.body() {
            pass.trait_def(item.id(), def)?;
        }
    }
    for item in &module.items {
        if let Item::Impl(block) = item.body() {
            pass.impl_block(item.id(), block)?;
        }
    }
    for item in &module.items {
        if let Item::Fn(def) = item.body() {
            pass.fn_signature(item.id(), def, Owner::Module)?;
        }
    }

    Ok(())
}

/// Where a function item lives; decides how `self` resolves and which
/// flags the symbol gets.
#[derive(Copy, Clone)]
enum Owner {
    Module,
    Impl,
    Trait,
}

struct ResolvePass<'a> {
    analysis: &'a mut Analysis,
}

impl ResolvePass<'_> {
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

    fn const_def(&mut self, item_id: AstNodeId, def: &ConstDef) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];
        let ty = resolve_ty_node(self.analysis, &def.ty)?;
        let value = eval_const_expr(self.analysis, &def.value);

        let SymbolKind::Constant { ty: slot, value: value_slot } =
            &mut self.analysis.symbols.get_mut(symbol).kind
        else {
            unreachable!("pass 1 allocated a constant symbol");
        };
        *slot = ty;
        *value_slot = value;
        Ok(())
    }

    fn enum_def(&mut self, item_id: AstNodeId, def: &rux_ast::EnumDef) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];

        for (index, variant) in def.variants.iter().enumerate() {
            let variant_symbol = self.analysis.symbols.alloc(
                variant.body().clone(),
                SymbolKind::Variant { owner: symbol, index: index as u32 },
            );

            let SymbolKind::Enum(enum_def) = &mut self.analysis.symbols.get_mut(symbol).kind
            else {
                unreachable!("pass 1 allocated an enum symbol");
            };
            if enum_def.variants.insert(variant.body().clone(), variant_symbol).is_some() {
                return err(
                    SemanticErrorKind::Redeclaration { name: variant.body().clone() },
                    variant.span(),
                );
            }
        }
        Ok(())
    }

    fn struct_def(&mut self, item_id: AstNodeId, def: &rux_ast::StructDef) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];

        for field in &def.fields {
            let ty = resolve_ty_node(self.analysis, &field.body().ty)?;
            let name = field.body().name.body().clone();

            let SymbolKind::Struct(struct_def) = &mut self.analysis.symbols.get_mut(symbol).kind
            else {
                unreachable!("pass 1 allocated a struct symbol");
            };
            if struct_def.fields.insert(name.clone(), ty).is_some() {
                return err(
                    SemanticErrorKind::Redeclaration { name },
                    field.body().name.span(),
                );
            }
        }
        Ok(())
    }

    fn trait_def(&mut self, item_id: AstNodeId, def: &rux_ast::TraitDef) -> SemaResult<()> {
        let trait_symbol = self.analysis.tables.decl_symbol[item_id];

        for item in &def.items {
            let member = match item.body() {
                Item::Fn(fn_def) => {
                    self.fn_signature(item.id(), fn_def, Owner::Trait)?;
                    (&fn_def.name, self.analysis.tables.decl_symbol[item.id()])
                }
                Item::Const(const_def) => {
                    self.const_def(item.id(), const_def)?;
                    (&const_def.name, self.analysis.tables.decl_symbol[item.id()])
                }
                other => unreachable!("parser rejects {other:?} in traits"),
            };

            let (name, symbol) = member;
            let SymbolKind::Trait(trait_def) =
                &mut self.analysis.symbols.get_mut(trait_symbol).kind
            else {
                unreachable!("pass 1 allocated a trait symbol");
            };
            if trait_def.items.insert(name.body().clone(), symbol).is_some() {
                return err(
                    SemanticErrorKind::Redeclaration { name: name.body().clone() },
                    name.span(),
                );
            }
        }
        Ok(())
    }

    fn impl_block(&mut self, item_id: AstNodeId, block: &rux_ast::ImplBlock) -> SemaResult<()> {
        let scope = self.analysis.tables.owned_scope[item_id];

        // Resolve the implementing type and pin it on the impl scope
        // before the member signatures (which may name `Self`) are
        // resolved.
        let self_ty = resolve_ty_node(self.analysis, &block.self_ty)?;
        let struct_symbol = match &self_ty {
            Ty::Named { symbol, .. }
                if matches!(self.analysis.symbols.get(*symbol).kind, SymbolKind::Struct(_)) =>
            {
                *symbol
            }
            other => {
                return err(
                    SemanticErrorKind::UnresolvedType { name: format!("{other}") },
                    block.self_ty.span(),
                )
            }
        };

        let ScopeKind::Impl { self_ty: slot } = &mut self.analysis.scopes.get_mut(scope).kind
        else {
            unreachable!("pass 1 created an impl scope");
        };
        *slot = self_ty;

        for item in &block.items {
            let (name, member) = match item.body() {
                Item::Fn(fn_def) => {
                    self.fn_signature(item.id(), fn_def, Owner::Impl)?;
                    (&fn_def.name, self.analysis.tables.decl_symbol[item.id()])
                }
                Item::Const(const_def) => {
                    self.const_def(item.id(), const_def)?;
                    (&const_def.name, self.analysis.tables.decl_symbol[item.id()])
                }
                other => unreachable!("parser rejects {other:?} in impls"),
            };

            self.attach_member(struct_symbol, name, member)?;
        }

        if let Some(trait_name) = &block.trait_name {
            self.check_trait_conformance(item_id, trait_name, struct_symbol)?;
        }
        Ok(())
    }

    /// Insert an impl member into the struct's associated-item
    /// dictionaries, rejecting duplicates across all of them.
    fn attach_member(
        &mut self,
        struct_symbol: SymbolId,
        name: &AstNode<String>,
        member: SymbolId,
    ) -> SemaResult<()> {
        let is_method = match &self.analysis.symbols.get(member).kind {
            SymbolKind::Function(function) => Some(function.is_method),
            SymbolKind::Constant { .. } => None,
            _ => unreachable!(),
        };

        let SymbolKind::Struct(struct_def) =
            &mut self.analysis.symbols.get_mut(struct_symbol).kind
        else {
            unreachable!("impl target is a struct");
        };

        let key = name.body();
        if struct_def.consts.contains_key(key)
            || struct_def.functions.contains_key(key)
            || struct_def.methods.contains_key(key)
        {
            return err(SemanticErrorKind::Redeclaration { name: key.clone() }, name.span());
        }

        match is_method {
            Some(true) => struct_def.methods.insert(key.clone(), member),
            Some(false) => struct_def.functions.insert(key.clone(), member),
            None => struct_def.consts.insert(key.clone(), member),
        };
        Ok(())
    }

    /// Every item the trait requires must be provided by the impl.
    fn check_trait_conformance(
        &mut self,
        impl_id: AstNodeId,
        trait_name: &AstNode<String>,
        struct_symbol: SymbolId,
    ) -> SemaResult<()> {
        let position = self.analysis.tables.node_position[impl_id];
        let trait_symbol = match self.analysis.scopes.lookup(position, trait_name.body()) {
            Some(symbol)
                if matches!(self.analysis.symbols.get(symbol).kind, SymbolKind::Trait(_)) =>
            {
                symbol
            }
            _ => {
                return err(
                    SemanticErrorKind::UnresolvedName { name: trait_name.body().clone() },
                    trait_name.span(),
                )
            }
        };

        let SymbolKind::Trait(trait_def) = &self.analysis.symbols.get(trait_symbol).kind else {
            unreachable!();
        };
        let SymbolKind::Struct(struct_def) = &self.analysis.symbols.get(struct_symbol).kind
        else {
            unreachable!();
        };

        for required in trait_def.items.keys() {
            if !struct_def.consts.contains_key(required)
                && !struct_def.functions.contains_key(required)
                && !struct_def.methods.contains_key(required)
            {
                return err(
                    SemanticErrorKind::UnresolvedName { name: required.clone() },
                    trait_name.span(),
                );
            }
        }
        Ok(())
    }

    fn fn_signature(&mut self, item_id: AstNodeId, def: &FnDef, owner: Owner) -> SemaResult<()> {
        let symbol = self.analysis.tables.decl_symbol[item_id];
        let fn_scope = self.analysis.tables.owned_scope[item_id];

        // `self` resolves against the enclosing impl or trait.
        let self_param = match &def.self_param {
            None => None,
            Some(node) => {
                let base = match owner {
                    Owner::Impl => {
                        let position = self.analysis.tables.node_position[item_id];
                        self.analysis
                            .scopes
                            .enclosing_self_ty(position.scope)
                            .expect("impl scope carries a self type")
                    }
                    Owner::Trait => Ty::SelfTy,
                    Owner::Module => {
                        return err(
                            SemanticErrorKind::InvalidSelf {
                                message: "`self` parameter outside of an `impl` or `trait`"
                                    .to_string(),
                            },
                            node.span(),
                        )
                    }
                };

                let self_ty = match node.body() {
                    SelfParam::Owned => base,
                    SelfParam::Ref => Ty::reference(base, false),
                    SelfParam::RefMut => Ty::reference(base, true),
                };

                let self_symbol = self
                    .analysis
                    .symbols
                    .alloc("self", SymbolKind::Variable { ty: self_ty, mutable: false });
                self.analysis.tables.decl_symbol.insert(node.id(), self_symbol);

                self.in_scope(fn_scope, |this| {
                    if !this.analysis.scopes.declare_item("self", self_symbol) {
                        unreachable!("`self` is declared once per function");
                    }
                    Ok(())
                })?;

                Some(*node.body())
            }
        };

        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let ty = resolve_ty_node(self.analysis, &param.body().ty)?;
            let name = &param.body().name;

            let param_symbol = self
                .analysis
                .symbols
                .alloc(name.body().clone(), SymbolKind::Variable { ty, mutable: false });
            self.analysis.tables.decl_symbol.insert(param.id(), param_symbol);

            self.in_scope(fn_scope, |this| {
                if !this.analysis.scopes.declare_item(name.body(), param_symbol) {
                    return err(
                        SemanticErrorKind::Redeclaration { name: name.body().clone() },
                        name.span(),
                    );
                }
                Ok(())
            })?;

            params.push(param_symbol);
        }

        let ret_ty = match &def.ret_ty {
            Some(node) => resolve_ty_node(self.analysis, node)?,
            None => Ty::Unit,
        };

        let SymbolKind::Function(function) = &mut self.analysis.symbols.get_mut(symbol).kind
        else {
            unreachable!("pass 1 allocated a function symbol");
        };
        function.self_param = self_param;
        function.params = params;
        function.ret_ty = ret_ty.clone();
        function.is_method = matches!(owner, Owner::Impl | Owner::Trait) && self_param.is_some();
        function.is_associated =
            matches!(owner, Owner::Impl | Owner::Trait) && self_param.is_none();

        let ScopeKind::Function { ret_ty: slot, .. } =
            &mut self.analysis.scopes.get_mut(fn_scope).kind
        else {
            unreachable!("pass 1 created a function scope");
        };
        *slot = ret_ty;

        Ok(())
    }
}
