//! The lexical scope tree.
//!
//! Scopes form a tree rooted at the crate scope. Each scope owns two
//! symbol tables: `items`, for declarations visible throughout the
//! scope (functions, types, constants, parameters, `self`), and
//! `locals`, for order-sensitive `let` bindings. Name lookup from a
//! node is bounded by the node's [ScopePosition] so that a binding is
//! only visible after its declaration, in every pass that runs after
//! the bindings exist.
use index_vec::IndexVec;
use indexmap::IndexMap;
use rux_source::Identifier;

use crate::{
    symbol::{SymbolArena, SymbolId, SymbolKind},
    ty::Ty,
};

index_vec::define_index_type! {
    pub struct ScopeId = u32;
}

#[derive(Debug, Clone)]
pub enum ScopeKind {
    Crate,
    Block,
    /// Records the owning function symbol and its (pass-2 resolved)
    /// return type.
    Function { symbol: SymbolId, ret_ty: Ty },
    /// Records the break type inferred from `break` expressions.
    /// `is_while` loops always break with unit.
    Loop { break_ty: Option<Ty>, is_while: bool },
    /// Records the implementing type once pass 2 has resolved it.
    Impl { self_ty: Ty },
    Trait { symbol: SymbolId },
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Declarations visible from any position within the scope.
    items: IndexMap<Identifier, SymbolId>,
    /// `let` bindings in declaration order.
    locals: Vec<(Identifier, SymbolId)>,
    /// The parent's local count when this scope was created; bounds
    /// lookups that continue into the parent.
    parent_position: u32,
    /// Locals counted so far by pass 1; the position recorded on
    /// nodes as they are visited.
    decl_cursor: u32,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, parent_position: u32) -> Self {
        Self {
            kind,
            parent,
            items: IndexMap::new(),
            locals: Vec::new(),
            parent_position,
            decl_cursor: 0,
        }
    }

    pub fn item(&self, name: &str) -> Option<SymbolId> {
        self.items.get(name).copied()
    }

    pub fn items(&self) -> impl Iterator<Item = (&Identifier, SymbolId)> {
        self.items.iter().map(|(name, id)| (name, *id))
    }
}

/// A stable address for "this point in this scope": the scope plus
/// how many `let` bindings precede the point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScopePosition {
    pub scope: ScopeId,
    pub index: u32,
}

/// The scope tree and its cursor. Passes reposition the cursor to
/// each node's recorded position on entry and restore it on exit.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    current: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope::new(ScopeKind::Crate, None, 0));
        Self { scopes, current: root }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::from_raw(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn set_current(&mut self, scope: ScopeId) {
        self.current = scope;
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    /// Create a child of the current scope and move the cursor into
    /// it.
    pub fn enter(&mut self, kind: ScopeKind) -> ScopeId {
        let parent = self.current;
        let parent_position = self.scopes[parent].decl_cursor;
        let id = self.scopes.push(Scope::new(kind, Some(parent), parent_position));
        self.current = id;
        id
    }

    /// Move the cursor back to the parent of the current scope.
    pub fn exit(&mut self) {
        let parent = self.scopes[self.current].parent.expect("exited the crate scope");
        self.current = parent;
    }

    /// The position of the cursor, for recording onto nodes.
    pub fn position(&self) -> ScopePosition {
        ScopePosition { scope: self.current, index: self.scopes[self.current].decl_cursor }
    }

    /// Count a `let` binding during pass 1 so later siblings record a
    /// position past it.
    pub fn advance_decl_cursor(&mut self) {
        self.scopes[self.current].decl_cursor += 1;
    }

    /// Declare an item in the current scope. Returns `false` when a
    /// sibling item already has the name.
    pub fn declare_item(&mut self, name: &str, symbol: SymbolId) -> bool {
        let scope = &mut self.scopes[self.current];
        if scope.items.contains_key(name) {
            return false;
        }
        scope.items.insert(name.to_string(), symbol);
        true
    }

    /// Declare a `let` binding in the current scope. Returns `false`
    /// when the name collides with another binding or a constant in
    /// the same scope; shadowing across scopes is fine.
    pub fn declare_local(
        &mut self,
        name: &str,
        symbol: SymbolId,
        symbols: &SymbolArena,
    ) -> bool {
        let scope = &mut self.scopes[self.current];

        if scope.locals.iter().any(|(local, _)| local == name) {
            return false;
        }
        if let Some(item) = scope.items.get(name) {
            if matches!(symbols.get(*item).kind, SymbolKind::Constant { .. }) {
                return false;
            }
        }

        scope.locals.push((name.to_string(), symbol));
        true
    }

    /// Look a name up from the given position, walking parent links.
    pub fn lookup(&self, position: ScopePosition, name: &str) -> Option<SymbolId> {
        let mut scope_id = position.scope;
        let mut bound = position.index as usize;

        loop {
            let scope = &self.scopes[scope_id];

            let visible = &scope.locals[..bound.min(scope.locals.len())];
            if let Some((_, symbol)) = visible.iter().rev().find(|(local, _)| local == name) {
                return Some(*symbol);
            }
            if let Some(symbol) = scope.items.get(name) {
                return Some(*symbol);
            }

            bound = scope.parent_position as usize;
            scope_id = scope.parent?;
        }
    }

    /// Walk outwards from `scope` until `test` accepts a scope.
    /// Stops after testing the crate scope.
    pub fn find_enclosing(
        &self,
        scope: ScopeId,
        mut test: impl FnMut(&Scope) -> bool,
    ) -> Option<ScopeId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if test(&self.scopes[id]) {
                return Some(id);
            }
            cursor = self.scopes[id].parent;
        }
        None
    }

    /// The nearest enclosing loop scope, not crossing a function
    /// boundary.
    pub fn enclosing_loop(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            match self.scopes[id].kind {
                ScopeKind::Loop { .. } => return Some(id),
                ScopeKind::Function { .. } | ScopeKind::Crate => return None,
                _ => cursor = self.scopes[id].parent,
            }
        }
        None
    }

    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ScopeId> {
        self.find_enclosing(scope, |s| matches!(s.kind, ScopeKind::Function { .. }))
    }

    /// The implementing type of the nearest enclosing `impl` scope.
    pub fn enclosing_self_ty(&self, scope: ScopeId) -> Option<Ty> {
        let id = self.find_enclosing(scope, |s| {
            matches!(s.kind, ScopeKind::Impl { .. } | ScopeKind::Trait { .. })
        })?;
        match &self.scopes[id].kind {
            ScopeKind::Impl { self_ty } => Some(self_ty.clone()),
            ScopeKind::Trait { .. } => Some(Ty::SelfTy),
            _ => unreachable!(),
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_position_bounded() {
        let mut symbols = SymbolArena::new();
        let outer = symbols.alloc("x", SymbolKind::Variable { ty: Ty::I32, mutable: false });
        let inner = symbols.alloc("x", SymbolKind::Variable { ty: Ty::BOOL, mutable: false });

        let mut tree = ScopeTree::new();
        assert!(tree.declare_local("x", outer, &symbols));
        tree.advance_decl_cursor();

        let block = tree.enter(ScopeKind::Block);
        // Before the inner `let x`, the outer binding is visible.
        let before = tree.position();
        tree.advance_decl_cursor();
        let after = tree.position();

        assert!(tree.declare_local("x", inner, &symbols));

        assert_eq!(tree.lookup(before, "x"), Some(outer));
        assert_eq!(tree.lookup(after, "x"), Some(inner));
        assert_eq!(tree.lookup(ScopePosition { scope: block, index: 0 }, "y"), None);
    }

    #[test]
    fn same_scope_redeclaration_is_rejected() {
        let mut symbols = SymbolArena::new();
        let a = symbols.alloc("x", SymbolKind::Variable { ty: Ty::I32, mutable: false });
        let b = symbols.alloc("x", SymbolKind::Variable { ty: Ty::I32, mutable: false });

        let mut tree = ScopeTree::new();
        assert!(tree.declare_local("x", a, &symbols));
        assert!(!tree.declare_local("x", b, &symbols));
    }

    #[test]
    fn cursor_enters_and_exits() {
        let mut tree = ScopeTree::new();
        let root = tree.current();
        let block = tree.enter(ScopeKind::Block);
        assert_eq!(tree.current(), block);
        tree.exit();
        assert_eq!(tree.current(), root);
    }
}
