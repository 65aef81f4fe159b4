//! Type descriptor kinds and the handles that name them.
//!
//! A [`TypeId`] is an opaque, `Copy` handle into a [`crate::store::TypeStore`].
//! Because the store hash-conses every descriptor it builds, two `TypeId`s
//! compare equal iff the types they name are structurally identical —
//! structural equality collapses to handle equality, the same trick
//! `tau_base::Symbol` plays for strings.

/// A hash-consed type descriptor handle. `Copy`, compares in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies the AST declaration node backing a `struct`/`union`/`enum`/`mod`
/// type. Opaque on purpose: `tau_types` has no dependency on `tau_syntax`, so
/// this just carries whatever identity the caller (the analyzer) assigns —
/// in practice the address of the arena-allocated `Decl` node, mirroring the
/// original implementation's use of the declaring `ast_node_t*` as identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeclId(pub usize);

impl DeclId {
    pub fn from_ptr<T>(ptr: *const T) -> DeclId {
        DeclId(ptr as usize)
    }
}

/// A function/generator signature's parameter and result shape. Kept as a
/// separate struct so `Fun`/`Gen` don't repeat the same four fields.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub variadic: bool,
}

/// The canonical representation of a type descriptor. This is the hash-cons
/// key: two descriptors with equal `TypeKind`s are, by construction, the
/// same descriptor (see `TypeStore::intern`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    // primitive family
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Bool,
    Unit,
    Null,
    /// A first-class type value, the result type of `sizeof`/`alignof`'s
    /// sibling expressions and of a type used as a value.
    Type,

    // modifier family
    Mut(TypeId),
    Const(TypeId),
    Ptr(TypeId),
    Array(TypeId, u64),
    Ref(TypeId),
    Opt(TypeId),

    // declared family
    Fun { sig: Signature, ret: TypeId, abi: crate::Abi },
    /// Generators carry no ABI: `extern gen` doesn't exist.
    Gen { sig: Signature, yield_ty: TypeId },
    Struct(DeclId),
    Union(DeclId),
    Enum(DeclId),
    Mod(DeclId),
}

impl TypeKind {
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            TypeKind::Mut(_) | TypeKind::Const(_) | TypeKind::Ptr(_) | TypeKind::Array(_, _) | TypeKind::Ref(_) | TypeKind::Opt(_)
        )
    }

    pub fn is_builtin(&self) -> bool {
        self.is_integer() || self.is_float() || matches!(self, TypeKind::Bool | TypeKind::Unit | TypeKind::Null | TypeKind::Type)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, TypeKind::I8 | TypeKind::I16 | TypeKind::I32 | TypeKind::I64 | TypeKind::Isize)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, TypeKind::U8 | TypeKind::U16 | TypeKind::U32 | TypeKind::U64 | TypeKind::Usize)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64)
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_invokable(&self) -> bool {
        matches!(self, TypeKind::Fun { .. } | TypeKind::Gen { .. })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, TypeKind::Struct(_) | TypeKind::Union(_))
    }

    pub fn is_decl(&self) -> bool {
        matches!(self, TypeKind::Struct(_) | TypeKind::Union(_) | TypeKind::Enum(_) | TypeKind::Mod(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_and_unsigned_integers_are_both_integer_but_not_float() {
        assert!(TypeKind::I32.is_integer());
        assert!(TypeKind::U64.is_integer());
        assert!(!TypeKind::I32.is_float());
        assert!(TypeKind::I32.is_signed());
        assert!(!TypeKind::U64.is_signed());
    }

    #[test]
    fn float_is_arithmetic_but_not_integer() {
        assert!(TypeKind::F64.is_arithmetic());
        assert!(!TypeKind::F64.is_integer());
    }

    #[test]
    fn bool_unit_null_and_type_are_builtin_but_not_arithmetic() {
        for kind in [TypeKind::Bool, TypeKind::Unit, TypeKind::Null, TypeKind::Type] {
            assert!(kind.is_builtin());
            assert!(!kind.is_arithmetic());
        }
    }

    #[test]
    fn modifiers_are_neither_builtin_nor_decl() {
        let m = TypeKind::Mut(TypeId(0));
        assert!(m.is_modifier());
        assert!(!m.is_builtin());
        assert!(!m.is_decl());
    }

    #[test]
    fn struct_and_union_are_composite_but_enum_and_mod_are_not() {
        let s = TypeKind::Struct(DeclId(1));
        let e = TypeKind::Enum(DeclId(1));
        assert!(s.is_composite());
        assert!(s.is_decl());
        assert!(!e.is_composite());
        assert!(e.is_decl());
    }

    #[test]
    fn fun_and_gen_are_invokable() {
        let fun = TypeKind::Fun { sig: Signature { params: vec![], variadic: false }, ret: TypeId(0), abi: crate::Abi::Tau };
        let gen = TypeKind::Gen { sig: Signature { params: vec![], variadic: false }, yield_ty: TypeId(0) };
        assert!(fun.is_invokable());
        assert!(gen.is_invokable());
        assert!(!fun.is_composite());
    }
}
