//! Mapping resolved source types onto IR types.
//!
//! The target is 32-bit: every integer type (including `usize` and
//! `isize`) is `i32`, `bool` is `i1`, `char` is `i8`, references and
//! `str` are opaque pointers, and fieldless enums are their `i32`
//! discriminant. `()` maps to `i8` where a slot or return buffer is
//! needed.
use rux_ir::{IrCtx, IrError, IrResult, TyId};
use rux_sema::{Analysis, PrimTy, Ty};

pub fn lower_ty(ctx: &mut IrCtx, analysis: &Analysis, ty: &Ty) -> IrResult<TyId> {
    Ok(match ty {
        Ty::Prim(prim) => match prim {
            PrimTy::Bool => ctx.tys.i1,
            PrimTy::Char => ctx.tys.i8,
            PrimTy::Str => ctx.tys.ptr,
            _ => ctx.tys.i32,
        },
        Ty::Ref { .. } => ctx.tys.ptr,
        Ty::Array { element, length } => {
            let element = lower_ty(ctx, analysis, element)?;
            ctx.tys.array(element, *length as u32)
        }
        Ty::Named { name, symbol } => {
            if analysis.symbols.as_enum(*symbol).is_some() {
                ctx.tys.i32
            } else {
                ctx.tys.struct_ty(name)
            }
        }
        // Unit occupies a byte wherever it needs storage.
        Ty::Unit | Ty::Never => ctx.tys.i8,
        Ty::SelfTy | Ty::Unknown => {
            return Err(IrError::InvalidIr(format!("`{ty}` reached the lowering stage")))
        }
    })
}

/// Whether values of this source type are passed and stored through
/// pointers.
pub fn is_aggregate(analysis: &Analysis, ty: &Ty) -> bool {
    match ty {
        Ty::Array { .. } => true,
        Ty::Named { symbol, .. } => analysis.symbols.as_struct(*symbol).is_some(),
        _ => false,
    }
}

/// The IR type an expression of this source type produces as an SSA
/// value: aggregates travel as pointers.
pub fn value_ty(ctx: &mut IrCtx, analysis: &Analysis, ty: &Ty) -> IrResult<TyId> {
    if is_aggregate(analysis, ty) {
        Ok(ctx.tys.ptr)
    } else {
        lower_ty(ctx, analysis, ty)
    }
}

/// Byte size of a scalar IR type on the 32-bit target.
pub fn scalar_size(ctx: &IrCtx, ty: TyId) -> Option<u64> {
    use rux_ir::IrTy;
    match ctx.tys.get(ty) {
        IrTy::I1 | IrTy::I8 => Some(1),
        IrTy::I32 | IrTy::Ptr => Some(4),
        _ => None,
    }
}
