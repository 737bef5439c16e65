//! Semantic analysis for Rux: a fixed five-pass visitor pipeline over
//! the AST, followed by the integer-literal confirmer.
//!
//! 1. [passes::declare] builds the scope tree and declares item
//!    shells.
//! 2. [passes::resolve] resolves declaration types (fields, variants,
//!    signatures, constants).
//! 3. [passes::typecheck] infers a type and category for every
//!    expression.
//! 4. [passes::places] enforces place and mutability rules.
//! 5. [passes::paths] finalises every path expression to its symbol.
//! 6. [passes::confirm] pushes concrete integer types down to
//!    literal-typed leaves.
//!
//! Each pass either reaches the end of the tree or aborts with a
//! [SemanticError]; later passes assume the earlier ones succeeded.
pub mod error;
pub mod passes;
pub mod scope;
pub mod symbol;
pub mod ty;

pub use error::{SemaResult, SemanticError, SemanticErrorKind};
use log::debug;
use rux_ast::{AstTable, Module};
pub use scope::{ScopeId, ScopeKind, ScopePosition, ScopeTree};
pub use symbol::{SymbolArena, SymbolId, SymbolKind};
pub use ty::{PrimTy, Ty};

/// The three expression categories of the language. What may be
/// assigned and what may be borrowed follows from these.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExprCategory {
    /// No address; may only be read.
    Value,
    /// Addressable but read-only.
    Place,
    /// Addressable and writable.
    MutPlace,
}

impl ExprCategory {
    pub fn is_place(&self) -> bool {
        matches!(self, ExprCategory::Place | ExprCategory::MutPlace)
    }
}

/// Side tables filled by the passes, keyed by AST node id.
#[derive(Debug, Default)]
pub struct SemaTables {
    /// Scope position of every node, assigned by pass 1.
    pub node_position: AstTable<ScopePosition>,
    /// The scope a node *creates* (functions, blocks, loops, impls,
    /// traits).
    pub owned_scope: AstTable<ScopeId>,
    /// Resolved type of every expression and type node.
    pub resolved_ty: AstTable<Ty>,
    /// Category of every expression.
    pub expr_category: AstTable<ExprCategory>,
    /// Symbol bound to a use site: path expressions, callees, method
    /// names.
    pub node_symbol: AstTable<SymbolId>,
    /// Symbol introduced by a declaring node: items, parameters,
    /// `self`, `let` statements.
    pub decl_symbol: AstTable<SymbolId>,
}

/// Everything the semantic passes produce; the lowering stage reads
/// it immutably.
#[derive(Debug)]
pub struct Analysis {
    pub scopes: ScopeTree,
    pub symbols: SymbolArena,
    pub tables: SemaTables,
}

impl Analysis {
    pub fn new() -> Self {
        Self { scopes: ScopeTree::new(), symbols: SymbolArena::new(), tables: SemaTables::default() }
    }

    /// Resolved type of an expression node; panics if pass 3 did not
    /// visit it.
    pub fn ty_of(&self, id: rux_ast::AstNodeId) -> &Ty {
        &self.tables.resolved_ty[id]
    }
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the whole pipeline over a parsed module.
pub fn analyse(module: &Module) -> SemaResult<Analysis> {
    let mut analysis = Analysis::new();

    debug!("pass 1: item declaration");
    passes::declare::run(module, &mut analysis)?;
    debug!("pass 2: declaration type resolution");
    passes::resolve::run(module, &mut analysis)?;
    debug!("pass 3: expression type inference");
    passes::typecheck::run(module, &mut analysis)?;
    debug!("pass 4: place and mutability checks");
    passes::places::run(module, &mut analysis)?;
    debug!("pass 5: path finalisation");
    passes::paths::run(module, &mut analysis)?;
    debug!("integer type confirmation");
    passes::confirm::run(module, &mut analysis)?;

    Ok(analysis)
}
