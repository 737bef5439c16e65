//! Flattened views over the items the lowering stage cares about:
//! every function with a body and every constant, top-level or
//! impl-attached, with the owning type's name for mangling.
use rux_ast::{AstNodeId, ConstDef, FnDef, Item, Module as AstModule};
use rux_sema::{Analysis, Ty};

pub(crate) struct FnItem<'ast> {
    pub item_id: AstNodeId,
    pub def: &'ast FnDef,
    /// The implementing type's name for impl members.
    pub owner: Option<String>,
}

impl FnItem<'_> {
    /// Impl members emit as `@Owner.name`.
    pub fn mangled_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.def.name.body()),
            None => self.def.name.body().clone(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.owner.is_none() && self.def.name.body() == "main"
    }
}

pub(crate) struct ConstItem<'ast> {
    pub item_id: AstNodeId,
    pub def: &'ast ConstDef,
    pub owner: Option<String>,
}

impl ConstItem<'_> {
    pub fn mangled_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.def.name.body()),
            None => self.def.name.body().clone(),
        }
    }
}

/// The name of the type an impl block implements, read from the
/// resolved type of its `self_ty` node.
fn impl_owner(analysis: &Analysis, block: &rux_ast::ImplBlock) -> String {
    match &analysis.tables.resolved_ty[block.self_ty.id()] {
        Ty::Named { name, .. } => name.clone(),
        other => unreachable!("impl target `{other}` is not a named type"),
    }
}

/// Every function that gets a body lowered, in declaration order.
/// Trait blocks contribute nothing; their signatures are lowered
/// through the impls that provide them.
pub(crate) fn collect_fns<'ast>(
    ast: &'ast AstModule,
    analysis: &Analysis,
) -> Vec<FnItem<'ast>> {
    let mut fns = Vec::new();

    for item in &ast.items {
        match item.body() {
            Item::Fn(def) => {
                fns.push(FnItem { item_id: item.id(), def, owner: None });
            }
            Item::Impl(block) => {
                let owner = impl_owner(analysis, block);
                for member in &block.items {
                    if let Item::Fn(def) = member.body() {
                        fns.push(FnItem {
                            item_id: member.id(),
                            def,
                            owner: Some(owner.clone()),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    fns
}

pub(crate) fn collect_consts<'ast>(
    ast: &'ast AstModule,
    analysis: &Analysis,
) -> Vec<ConstItem<'ast>> {
    let mut consts = Vec::new();

    for item in &ast.items {
        match item.body() {
            Item::Const(def) => {
                consts.push(ConstItem { item_id: item.id(), def, owner: None });
            }
            Item::Impl(block) => {
                let owner = impl_owner(analysis, block);
                for member in &block.items {
                    if let Item::Const(def) = member.body() {
                        consts.push(ConstItem {
                            item_id: member.id(),
                            def,
                            owner: Some(owner.clone()),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    consts
}
