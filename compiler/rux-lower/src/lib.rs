//! Lowering of the type-checked AST into the IR.
//!
//! Two stages: the [predefine] pass populates the module with struct
//! layouts, `S.size` helpers, constant globals, runtime declarations
//! and ABI-shaped function declarations; the [build] pass then lowers
//! every function body into its declaration. The result is the
//! [Module]/[IrCtx] pair that [rux_ir::ModuleWriter] renders.
mod build;
mod collect;
mod predefine;
pub mod ty;

use std::collections::HashMap;

use log::debug;
use rux_ast::Module as AstModule;
use rux_ir::{FuncId, IrCtx, IrError, IrResult, Module, ModuleWriter, ValueId};
use rux_sema::{Analysis, SymbolId};

/// Cross-stage lookup tables: which IR entity each source symbol
/// lowered to.
#[derive(Debug, Default)]
pub struct LowerMaps {
    pub functions: HashMap<SymbolId, FuncId>,
    /// Struct symbol to its `S.size` helper.
    pub size_fns: HashMap<SymbolId, FuncId>,
    /// Constant symbol to its global.
    pub globals: HashMap<SymbolId, ValueId>,
    /// Variable symbol to its stack slot.
    pub slots: HashMap<SymbolId, ValueId>,
}

/// Lower a fully analysed module. Fails with [IrError::MissingSymbol]
/// when there is no `main`.
pub fn lower_module(ast: &AstModule, analysis: &Analysis) -> IrResult<(Module, IrCtx)> {
    let mut ctx = IrCtx::new();
    let mut module = Module::new("main");

    let mut maps = predefine::run(&mut module, &mut ctx, analysis, ast)?;
    if module.function("main").is_none() {
        return Err(IrError::MissingSymbol("main".into()));
    }

    for item in collect::collect_fns(ast, analysis) {
        debug!("lowering @{}", item.mangled_name());
        build::lower_fn(analysis, &mut maps, &mut module, &mut ctx, &item)?;
    }

    Ok((module, ctx))
}

/// The textual form of a lowered module.
pub fn emit_text(module: &Module, ctx: &IrCtx) -> String {
    ModuleWriter::new(module, ctx).to_string()
}
