//! The pre-definer: everything that must exist in the module before
//! any function body is lowered.
//!
//! In order: nominal struct layouts (declaration order), a
//! `S.size` helper per struct computed via `gep null, 1` +
//! `ptrtoint`, one integer global per constant, declarations for the
//! C runtime, and a declaration for every source function under the
//! aggregate-return ABI (`main` keeps its native signature).
use log::debug;
use rux_ast::{Item, Module as AstModule};
use rux_ir::{Builder, FuncId, IrCtx, IrError, IrResult, IrTy, Module};
use rux_sema::{Analysis, SymbolKind};

use crate::{
    collect::{collect_consts, collect_fns},
    ty::{is_aggregate, lower_ty},
    LowerMaps,
};

pub fn run(
    module: &mut Module,
    ctx: &mut IrCtx,
    analysis: &Analysis,
    ast: &AstModule,
) -> IrResult<LowerMaps> {
    let mut maps = LowerMaps::default();

    define_struct_layouts(ctx, analysis, ast)?;
    define_size_fns(module, ctx, analysis, ast, &mut maps)?;
    define_const_globals(module, ctx, analysis, ast, &mut maps)?;
    declare_runtime(module, ctx, analysis, &mut maps)?;
    declare_fns(module, ctx, analysis, ast, &mut maps)?;

    Ok(maps)
}

/// Build every `%struct.S = type { … }` in declaration order.
fn define_struct_layouts(
    ctx: &mut IrCtx,
    analysis: &Analysis,
    ast: &AstModule,
) -> IrResult<()> {
    for item in &ast.items {
        let Item::Struct(def) = item.body() else { continue };

        let symbol = analysis.tables.decl_symbol[item.id()];
        let struct_def = analysis.symbols.as_struct(symbol).expect("struct symbol");

        let ty = ctx.tys.struct_ty(def.name.body());
        let fields = struct_def
            .fields
            .values()
            .map(|field| lower_ty(ctx, analysis, field))
            .collect::<IrResult<Vec<_>>>()?;

        let IrTy::Struct(id) = *ctx.tys.get(ty) else { unreachable!() };
        ctx.tys.set_struct_fields(id, fields);
        debug!("defined layout for %struct.{}", def.name.body());
    }
    Ok(())
}

/// Emit `S.size : i32()` per struct. The body is the canonical
/// opaque-pointer size computation:
///
/// ```text
/// %tmp.0 = getelementptr %struct.S, ptr null, i32 1
/// %tmp.1 = ptrtoint ptr %tmp.0 to i32
/// ret i32 %tmp.1
/// ```
fn define_size_fns(
    module: &mut Module,
    ctx: &mut IrCtx,
    analysis: &Analysis,
    ast: &AstModule,
    maps: &mut LowerMaps,
) -> IrResult<()> {
    for item in &ast.items {
        let Item::Struct(def) = item.body() else { continue };

        let symbol = analysis.tables.decl_symbol[item.id()];
        let struct_ty = ctx.tys.struct_ty(def.name.body());
        let i32_ty = ctx.tys.i32;

        let name = format!("{}.size", def.name.body());
        let fn_ty = ctx.tys.fn_ty(vec![], i32_ty);
        let func = ctx.new_function(&name, fn_ty, &[], false)?;
        let entry = ctx.new_block(func, "entry");

        let null = ctx.const_null();
        let one = ctx.const_int(i32_ty, 1)?;

        let mut builder = Builder::new(ctx);
        builder.set_insert_point(entry);
        let end = builder.create_gep(struct_ty, null, vec![one])?;
        let size = builder.create_ptr_to_int(end, i32_ty)?;
        builder.create_ret(Some(size))?;

        module.functions.insert(name, func);
        maps.size_fns.insert(symbol, func);
    }
    Ok(())
}

/// One `@NAME = constant i32 <value>` per constant; anything that is
/// not a compile-time integer is rejected here.
fn define_const_globals(
    module: &mut Module,
    ctx: &mut IrCtx,
    analysis: &Analysis,
    ast: &AstModule,
    maps: &mut LowerMaps,
) -> IrResult<()> {
    for item in collect_consts(ast, analysis) {
        let symbol = analysis.tables.decl_symbol[item.item_id];
        let SymbolKind::Constant { ty, value } = &analysis.symbols.get(symbol).kind else {
            unreachable!("constant items have constant symbols");
        };

        let name = item.mangled_name();
        if !ty.is_integer() {
            return Err(IrError::NonIntegerConstant(name));
        }
        let Some(value) = value else {
            return Err(IrError::NonIntegerConstant(name));
        };

        let i32_ty = ctx.tys.i32;
        let init = ctx.const_int(i32_ty, *value as u64)?;
        let global = ctx.new_global(&name, i32_ty, Some(init), true);
        module.globals.insert(name, global);
        maps.globals.insert(symbol, global);
    }
    Ok(())
}

/// The runtime functions keep their native C signatures.
fn declare_runtime(
    module: &mut Module,
    ctx: &mut IrCtx,
    analysis: &Analysis,
    maps: &mut LowerMaps,
) -> IrResult<()> {
    let root = analysis.scopes.root();
    for name in ["printInt", "printlnInt", "getInt"] {
        let Some(symbol) = analysis.scopes.get(root).item(name) else {
            return Err(IrError::MissingSymbol(name.to_string()));
        };
        let function = analysis.symbols.as_function(symbol).expect("runtime function");

        let params = function
            .params
            .iter()
            .map(|param| {
                let ty = analysis.symbols.value_ty(*param).expect("parameter");
                lower_ty(ctx, analysis, ty)
            })
            .collect::<IrResult<Vec<_>>>()?;
        let names: Vec<String> =
            (0..params.len()).map(|index| format!("arg{index}")).collect();

        let ret = if function.ret_ty.is_unit() {
            ctx.tys.void
        } else {
            lower_ty(ctx, analysis, &function.ret_ty)?
        };
        let fn_ty = ctx.tys.fn_ty(params, ret);

        let func = ctx.new_function(name, fn_ty, &names, true)?;
        module.functions.insert(name.to_string(), func);
        maps.functions.insert(symbol, func);
    }
    Ok(())
}

/// Declare every source function. `main` keeps its declared
/// signature; everything else becomes
/// `void(ret_ptr, [self_ptr,] params…)` with aggregates by pointer.
fn declare_fns(
    module: &mut Module,
    ctx: &mut IrCtx,
    analysis: &Analysis,
    ast: &AstModule,
    maps: &mut LowerMaps,
) -> IrResult<()> {
    for item in collect_fns(ast, analysis) {
        let symbol = analysis.tables.decl_symbol[item.item_id];
        let function = analysis.symbols.as_function(symbol).expect("function symbol");
        let name = item.mangled_name();

        let mut params = Vec::new();
        let mut names = Vec::new();

        if !item.is_main() {
            params.push(ctx.tys.ptr);
            names.push("ret.ptr".to_string());
            if function.self_param.is_some() {
                params.push(ctx.tys.ptr);
                names.push("self".to_string());
            }
        }

        for (param, node) in function.params.iter().zip(&item.def.params) {
            let ty = analysis.symbols.value_ty(*param).expect("parameter").clone();
            let lowered = if is_aggregate(analysis, &ty) {
                ctx.tys.ptr
            } else {
                lower_ty(ctx, analysis, &ty)?
            };
            params.push(lowered);
            names.push(node.body().name.body().clone());
        }

        let ret = if item.is_main() {
            if function.ret_ty.is_unit() {
                ctx.tys.void
            } else {
                lower_ty(ctx, analysis, &function.ret_ty)?
            }
        } else {
            ctx.tys.void
        };

        let fn_ty = ctx.tys.fn_ty(params, ret);
        let func: FuncId = ctx.new_function(&name, fn_ty, &names, false)?;
        module.functions.insert(name, func);
        maps.functions.insert(symbol, func);
    }
    Ok(())
}
