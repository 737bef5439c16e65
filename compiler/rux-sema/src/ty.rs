//! The resolved-type model and unification.
//!
//! Every expression and symbol carries a [Ty] once the semantic
//! passes have run. Integer literals without a suffix start out as
//! one of the placeholder primitives (`int`, `signed int`,
//! `unsigned int`) and are narrowed by unification and the final
//! confirmer pass.
use std::fmt;

use crate::symbol::SymbolId;

/// Primitive type names, including the three placeholders that only
/// exist during inference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrimTy {
    I32,
    U32,
    ISize,
    USize,
    Bool,
    Char,
    Str,
    /// An integer literal with no suffix and no constraint yet.
    Int,
    /// An integer known to be signed (e.g. it was negated).
    SignedInt,
    /// An integer known to be unsigned.
    UnsignedInt,
}

impl PrimTy {
    pub fn from_name(name: &str) -> Option<PrimTy> {
        Some(match name {
            "i32" => PrimTy::I32,
            "u32" => PrimTy::U32,
            "isize" => PrimTy::ISize,
            "usize" => PrimTy::USize,
            "bool" => PrimTy::Bool,
            "char" => PrimTy::Char,
            "str" => PrimTy::Str,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimTy::I32 => "i32",
            PrimTy::U32 => "u32",
            PrimTy::ISize => "isize",
            PrimTy::USize => "usize",
            PrimTy::Bool => "bool",
            PrimTy::Char => "char",
            PrimTy::Str => "str",
            PrimTy::Int => "int",
            PrimTy::SignedInt => "signed int",
            PrimTy::UnsignedInt => "unsigned int",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            PrimTy::I32
                | PrimTy::U32
                | PrimTy::ISize
                | PrimTy::USize
                | PrimTy::Int
                | PrimTy::SignedInt
                | PrimTy::UnsignedInt
        )
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PrimTy::Int | PrimTy::SignedInt | PrimTy::UnsignedInt)
    }

    /// Signedness of a concrete integer type; placeholders other than
    /// `unsigned int` are treated as signed for instruction selection.
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, PrimTy::I32 | PrimTy::ISize | PrimTy::Int | PrimTy::SignedInt)
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Prim(PrimTy),
    Ref { inner: Box<Ty>, mutable: bool },
    /// `length` is `-1` while still symbolic (before the constant
    /// expression is evaluated).
    Array { element: Box<Ty>, length: i64 },
    /// A user-declared struct or enum, nominal by symbol.
    Named { name: String, symbol: SymbolId },
    Unit,
    Never,
    /// The opaque `Self` of a trait signature.
    SelfTy,
    Unknown,
}

impl Ty {
    pub const I32: Ty = Ty::Prim(PrimTy::I32);
    pub const U32: Ty = Ty::Prim(PrimTy::U32);
    pub const ISIZE: Ty = Ty::Prim(PrimTy::ISize);
    pub const USIZE: Ty = Ty::Prim(PrimTy::USize);
    pub const BOOL: Ty = Ty::Prim(PrimTy::Bool);
    pub const CHAR: Ty = Ty::Prim(PrimTy::Char);
    pub const INT: Ty = Ty::Prim(PrimTy::Int);

    pub fn reference(inner: Ty, mutable: bool) -> Ty {
        Ty::Ref { inner: Box::new(inner), mutable }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Prim(prim) if prim.is_integer())
    }

    pub fn is_placeholder_integer(&self) -> bool {
        matches!(self, Ty::Prim(prim) if prim.is_placeholder())
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Ty::Prim(PrimTy::Bool))
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Ty::Never)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Ty::Unit)
    }

    pub fn as_ref_ty(&self) -> Option<(&Ty, bool)> {
        match self {
            Ty::Ref { inner, mutable } => Some((inner, *mutable)),
            _ => None,
        }
    }

    /// Strip at most one level of reference; field access, indexing
    /// and method dispatch auto-deref exactly once.
    pub fn auto_deref(&self) -> &Ty {
        match self {
            Ty::Ref { inner, .. } => inner,
            other => other,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(prim) => write!(f, "{}", prim.as_str()),
            Ty::Ref { inner, mutable: true } => write!(f, "&mut {inner}"),
            Ty::Ref { inner, mutable: false } => write!(f, "&{inner}"),
            Ty::Array { element, length } if *length < 0 => write!(f, "[{element}; _]"),
            Ty::Array { element, length } => write!(f, "[{element}; {length}]"),
            Ty::Named { name, .. } => write!(f, "{name}"),
            Ty::Unit => write!(f, "()"),
            Ty::Never => write!(f, "!"),
            Ty::SelfTy => write!(f, "Self"),
            Ty::Unknown => write!(f, "{{unknown}}"),
        }
    }
}

/// Unify two integer primitives, at least one of which may be a
/// placeholder.
fn unify_integers(a: PrimTy, b: PrimTy) -> Option<PrimTy> {
    use PrimTy::*;

    if a == b {
        return Some(a);
    }

    match (a, b) {
        // `int` takes on whatever the other side knows.
        (Int, other) | (other, Int) if other.is_integer() => Some(other),

        (SignedInt, other) | (other, SignedInt) if other.is_integer() => {
            other.is_signed_integer().then_some(other)
        }
        (UnsignedInt, other) | (other, UnsignedInt) if other.is_integer() => {
            (!other.is_signed_integer()).then_some(other)
        }

        _ => None,
    }
}

/// Unify two types: total, commutative modulo swap. Returns the
/// combined type, or `None` on a mismatch (callers attach the span
/// and construct names).
pub fn unify(a: &Ty, b: &Ty) -> Option<Ty> {
    match (a, b) {
        // `!` unifies with anything and disappears.
        (Ty::Never, other) | (other, Ty::Never) => Some(other.clone()),
        (Ty::Unknown, other) | (other, Ty::Unknown) => Some(other.clone()),

        (Ty::Prim(pa), Ty::Prim(pb)) => {
            if pa == pb {
                Some(Ty::Prim(*pa))
            } else if pa.is_integer() && pb.is_integer() {
                unify_integers(*pa, *pb).map(Ty::Prim)
            } else {
                None
            }
        }

        (Ty::Ref { inner: ia, mutable: ma }, Ty::Ref { inner: ib, mutable: mb }) => {
            if ma != mb {
                return None;
            }
            unify(ia, ib).map(|inner| Ty::Ref { inner: Box::new(inner), mutable: *ma })
        }

        (Ty::Array { element: ea, length: la }, Ty::Array { element: eb, length: lb }) => {
            // `-1` means the length is still symbolic and matches any.
            let length = match (*la, *lb) {
                (a, b) if a == b => a,
                (-1, b) => b,
                (a, -1) => a,
                _ => return None,
            };
            unify(ea, eb).map(|element| Ty::Array { element: Box::new(element), length })
        }

        (Ty::Named { symbol: sa, .. }, Ty::Named { symbol: sb, .. }) if sa == sb => {
            Some(a.clone())
        }

        (Ty::Unit, Ty::Unit) => Some(Ty::Unit),
        (Ty::SelfTy, Ty::SelfTy) => Some(Ty::SelfTy),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_narrow_to_concrete() {
        assert_eq!(unify(&Ty::INT, &Ty::U32), Some(Ty::U32));
        assert_eq!(unify(&Ty::U32, &Ty::INT), Some(Ty::U32));
        assert_eq!(unify(&Ty::Prim(PrimTy::SignedInt), &Ty::ISIZE), Some(Ty::ISIZE));
        assert_eq!(unify(&Ty::Prim(PrimTy::SignedInt), &Ty::U32), None);
        assert_eq!(unify(&Ty::Prim(PrimTy::UnsignedInt), &Ty::INT), Some(Ty::Prim(PrimTy::UnsignedInt)));
    }

    #[test]
    fn never_vanishes() {
        assert_eq!(unify(&Ty::Never, &Ty::I32), Some(Ty::I32));
        assert_eq!(unify(&Ty::Unit, &Ty::Never), Some(Ty::Unit));
        assert_eq!(unify(&Ty::Never, &Ty::Never), Some(Ty::Never));
    }

    #[test]
    fn references_and_arrays() {
        let a = Ty::reference(Ty::I32, false);
        let b = Ty::reference(Ty::I32, false);
        assert_eq!(unify(&a, &b), Some(a.clone()));
        assert_eq!(unify(&a, &Ty::reference(Ty::I32, true)), None);

        let arr = Ty::Array { element: Box::new(Ty::INT), length: 3 };
        let symbolic = Ty::Array { element: Box::new(Ty::I32), length: -1 };
        assert_eq!(
            unify(&arr, &symbolic),
            Some(Ty::Array { element: Box::new(Ty::I32), length: 3 })
        );
    }

    #[test]
    fn mismatches() {
        assert_eq!(unify(&Ty::BOOL, &Ty::I32), None);
        assert_eq!(unify(&Ty::I32, &Ty::U32), None);
        assert_eq!(unify(&Ty::Unit, &Ty::BOOL), None);
    }
}
