//! Symbols and the arena that owns them.
//!
//! Cross-references between symbols (a struct's methods, a variant's
//! owning enum) are by [SymbolId] into the arena rather than by
//! shared pointers, so cyclic item graphs need no special handling.
use index_vec::IndexVec;
use indexmap::IndexMap;
use rux_ast::SelfParam;
use rux_source::Identifier;

use crate::ty::Ty;

index_vec::define_index_type! {
    pub struct SymbolId = u32;
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Identifier,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// A `let` binding, function parameter or `self`.
    Variable { ty: Ty, mutable: bool },
    /// A `const` item. The value is filled in once the initialiser
    /// has been evaluated; IR emission requires it.
    Constant { ty: Ty, value: Option<i64> },
    Function(FunctionSymbol),
    Struct(StructSymbol),
    Enum(EnumSymbol),
    /// A single variant of an enum.
    Variant { owner: SymbolId, index: u32 },
    Trait(TraitSymbol),
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub self_param: Option<SelfParam>,
    /// Parameter symbols ([SymbolKind::Variable]) in declaration
    /// order.
    pub params: Vec<SymbolId>,
    pub ret_ty: Ty,
    /// Declared in an `impl` block with a `self` parameter.
    pub is_method: bool,
    /// Declared in an `impl` block without a `self` parameter.
    pub is_associated: bool,
    /// Provided by the linked C runtime; called with its native
    /// signature.
    pub is_external: bool,
}

impl FunctionSymbol {
    pub fn new() -> Self {
        Self {
            self_param: None,
            params: Vec::new(),
            ret_ty: Ty::Unknown,
            is_method: false,
            is_associated: false,
            is_external: false,
        }
    }
}

impl Default for FunctionSymbol {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructSymbol {
    /// Field name to type, in declaration order; declaration order is
    /// also the IR layout order.
    pub fields: IndexMap<Identifier, Ty>,
    pub consts: IndexMap<Identifier, SymbolId>,
    /// Associated functions (no `self`).
    pub functions: IndexMap<Identifier, SymbolId>,
    pub methods: IndexMap<Identifier, SymbolId>,
}

impl StructSymbol {
    /// Zero-based position of a field in the layout.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnumSymbol {
    /// Variant name to its [SymbolKind::Variant] symbol, in
    /// declaration order.
    pub variants: IndexMap<Identifier, SymbolId>,
}

#[derive(Debug, Clone, Default)]
pub struct TraitSymbol {
    /// Required items (function signatures and constants) by name.
    pub items: IndexMap<Identifier, SymbolId>,
}

/// Arena of all symbols in a compilation.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: IndexVec<SymbolId, Symbol>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: impl Into<Identifier>, kind: SymbolKind) -> SymbolId {
        self.symbols.push(Symbol { name: name.into(), kind })
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id].name
    }

    pub fn as_function(&self, id: SymbolId) -> Option<&FunctionSymbol> {
        match &self.get(id).kind {
            SymbolKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_struct(&self, id: SymbolId) -> Option<&StructSymbol> {
        match &self.get(id).kind {
            SymbolKind::Struct(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_enum(&self, id: SymbolId) -> Option<&EnumSymbol> {
        match &self.get(id).kind {
            SymbolKind::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// Type of a variable or constant symbol.
    pub fn value_ty(&self, id: SymbolId) -> Option<&Ty> {
        match &self.get(id).kind {
            SymbolKind::Variable { ty, .. } | SymbolKind::Constant { ty, .. } => Some(ty),
            _ => None,
        }
    }
}
