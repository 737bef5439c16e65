//! The IR type system: uniqued types with opaque pointers.
//!
//! There is one `void`, one of each integer width (1, 8, 32), one
//! pointer type, one array type per `(element, length)` pair, one
//! nominal struct type per name, and one function type per
//! `(return, params)` tuple. Identity is by [TyId]; structural
//! equality is guaranteed by interning.
use std::collections::HashMap;

use index_vec::IndexVec;

index_vec::define_index_type! {
    pub struct TyId = u32;
}

index_vec::define_index_type! {
    pub struct StructId = u32;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrTy {
    Void,
    I1,
    I8,
    I32,
    /// The single opaque pointer type; element types live on the
    /// instructions that use them.
    Ptr,
    Array { element: TyId, length: u32 },
    /// Nominal; the field list lives in the [StructTy].
    Struct(StructId),
    Fn { params: Vec<TyId>, ret: TyId },
}

impl IrTy {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrTy::Array { .. } | IrTy::Struct(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, IrTy::Ptr)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, IrTy::I1 | IrTy::I8 | IrTy::I32)
    }

    /// Bit width of an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            IrTy::I1 => Some(1),
            IrTy::I8 => Some(8),
            IrTy::I32 => Some(32),
            _ => None,
        }
    }
}

/// A named struct layout. Created empty and filled once the field
/// types are known, which lets fields refer back to the struct
/// through pointers.
#[derive(Debug, Clone)]
pub struct StructTy {
    pub name: String,
    pub fields: Vec<TyId>,
}

/// The interner for IR types.
#[derive(Debug)]
pub struct TyStore {
    tys: IndexVec<TyId, IrTy>,
    lookup: HashMap<IrTy, TyId>,
    structs: IndexVec<StructId, StructTy>,
    struct_lookup: HashMap<String, StructId>,

    pub void: TyId,
    pub i1: TyId,
    pub i8: TyId,
    pub i32: TyId,
    pub ptr: TyId,
}

impl TyStore {
    pub fn new() -> Self {
        let mut store = Self {
            tys: IndexVec::new(),
            lookup: HashMap::new(),
            structs: IndexVec::new(),
            struct_lookup: HashMap::new(),
            void: TyId::from_raw(0),
            i1: TyId::from_raw(0),
            i8: TyId::from_raw(0),
            i32: TyId::from_raw(0),
            ptr: TyId::from_raw(0),
        };

        store.void = store.intern(IrTy::Void);
        store.i1 = store.intern(IrTy::I1);
        store.i8 = store.intern(IrTy::I8);
        store.i32 = store.intern(IrTy::I32);
        store.ptr = store.intern(IrTy::Ptr);
        store
    }

    pub fn intern(&mut self, ty: IrTy) -> TyId {
        if let Some(id) = self.lookup.get(&ty) {
            return *id;
        }
        let id = self.tys.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    pub fn get(&self, id: TyId) -> &IrTy {
        &self.tys[id]
    }

    pub fn array(&mut self, element: TyId, length: u32) -> TyId {
        self.intern(IrTy::Array { element, length })
    }

    pub fn fn_ty(&mut self, params: Vec<TyId>, ret: TyId) -> TyId {
        self.intern(IrTy::Fn { params, ret })
    }

    /// The nominal struct type for `name`, creating an empty layout
    /// on first use.
    pub fn struct_ty(&mut self, name: &str) -> TyId {
        let id = match self.struct_lookup.get(name) {
            Some(id) => *id,
            None => {
                let id =
                    self.structs.push(StructTy { name: name.to_string(), fields: Vec::new() });
                self.struct_lookup.insert(name.to_string(), id);
                id
            }
        };
        self.intern(IrTy::Struct(id))
    }

    pub fn set_struct_fields(&mut self, id: StructId, fields: Vec<TyId>) {
        self.structs[id].fields = fields;
    }

    pub fn struct_data(&self, id: StructId) -> &StructTy {
        &self.structs[id]
    }

    /// All struct layouts in declaration order, for the module
    /// header.
    pub fn structs(&self) -> impl Iterator<Item = (StructId, &StructTy)> {
        self.structs.iter_enumerated()
    }

    pub fn is_aggregate(&self, id: TyId) -> bool {
        self.get(id).is_aggregate()
    }

    pub fn is_integer(&self, id: TyId) -> bool {
        self.get(id).is_integer()
    }
}

impl Default for TyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_are_uniqued() {
        let mut store = TyStore::new();

        let a = store.array(store.i32, 4);
        let b = store.array(store.i32, 4);
        assert_eq!(a, b);
        assert_ne!(a, store.array(store.i32, 5));

        let f1 = store.fn_ty(vec![store.i32], store.void);
        let f2 = store.fn_ty(vec![store.i32], store.void);
        assert_eq!(f1, f2);
    }

    #[test]
    fn structs_are_nominal() {
        let mut store = TyStore::new();

        let p1 = store.struct_ty("P");
        let p2 = store.struct_ty("P");
        let q = store.struct_ty("Q");
        assert_eq!(p1, p2);
        assert_ne!(p1, q);

        let IrTy::Struct(id) = *store.get(p1) else { panic!("expected a struct") };
        store.set_struct_fields(id, vec![store.i32, store.i32]);
        assert_eq!(store.struct_data(id).fields.len(), 2);
    }
}
