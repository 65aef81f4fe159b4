//! The hash-consing type store and the invariant checks that guard it.

use std::collections::HashMap;

use crate::kind::{DeclId, Signature, TypeId, TypeKind};
use crate::Abi;

/// Canonical store of every type descriptor built so far. Construction goes
/// through `mk_*` methods only; there is no way to obtain a `TypeId` that
/// isn't backed by an entry in `descs`, so `resolve` never needs to return
/// an `Option`.
pub struct TypeStore {
    descs: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    primitives: Primitives,
}

struct Primitives {
    i8: TypeId,
    i16: TypeId,
    i32: TypeId,
    i64: TypeId,
    isize: TypeId,
    u8: TypeId,
    u16: TypeId,
    u32: TypeId,
    u64: TypeId,
    usize: TypeId,
    f32: TypeId,
    f64: TypeId,
    bool_: TypeId,
    unit: TypeId,
    null: TypeId,
    type_: TypeId,
}

/// A violated §3.3 modifier-stacking rule, e.g. wrapping `const` in `const`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation(pub String);

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InvariantViolation {}

type Result<T> = std::result::Result<T, InvariantViolation>;

impl TypeStore {
    pub fn new() -> Self {
        let mut descs = Vec::new();
        let mut intern = |kind: TypeKind, descs: &mut Vec<TypeKind>| -> TypeId {
            let id = TypeId(descs.len() as u32);
            descs.push(kind);
            id
        };
        let i8 = intern(TypeKind::I8, &mut descs);
        let i16 = intern(TypeKind::I16, &mut descs);
        let i32 = intern(TypeKind::I32, &mut descs);
        let i64 = intern(TypeKind::I64, &mut descs);
        let isize = intern(TypeKind::Isize, &mut descs);
        let u8 = intern(TypeKind::U8, &mut descs);
        let u16 = intern(TypeKind::U16, &mut descs);
        let u32 = intern(TypeKind::U32, &mut descs);
        let u64 = intern(TypeKind::U64, &mut descs);
        let usize = intern(TypeKind::Usize, &mut descs);
        let f32 = intern(TypeKind::F32, &mut descs);
        let f64 = intern(TypeKind::F64, &mut descs);
        let bool_ = intern(TypeKind::Bool, &mut descs);
        let unit = intern(TypeKind::Unit, &mut descs);
        let null = intern(TypeKind::Null, &mut descs);
        let type_ = intern(TypeKind::Type, &mut descs);

        let mut interned = HashMap::new();
        for (i, desc) in descs.iter().enumerate() {
            interned.insert(desc.clone(), TypeId(i as u32));
        }

        TypeStore {
            descs,
            interned,
            primitives: Primitives { i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool_, unit, null, type_ },
        }
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.descs.len() as u32);
        self.descs.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn resolve(&self, id: TypeId) -> &TypeKind {
        &self.descs[id.index()]
    }

    // --- primitives ---

    pub fn i8(&self) -> TypeId {
        self.primitives.i8
    }
    pub fn i16(&self) -> TypeId {
        self.primitives.i16
    }
    pub fn i32(&self) -> TypeId {
        self.primitives.i32
    }
    pub fn i64(&self) -> TypeId {
        self.primitives.i64
    }
    pub fn isize(&self) -> TypeId {
        self.primitives.isize
    }
    pub fn u8(&self) -> TypeId {
        self.primitives.u8
    }
    pub fn u16(&self) -> TypeId {
        self.primitives.u16
    }
    pub fn u32(&self) -> TypeId {
        self.primitives.u32
    }
    pub fn u64(&self) -> TypeId {
        self.primitives.u64
    }
    pub fn usize(&self) -> TypeId {
        self.primitives.usize
    }
    pub fn f32(&self) -> TypeId {
        self.primitives.f32
    }
    pub fn f64(&self) -> TypeId {
        self.primitives.f64
    }
    pub fn bool_(&self) -> TypeId {
        self.primitives.bool_
    }
    pub fn unit(&self) -> TypeId {
        self.primitives.unit
    }
    pub fn null(&self) -> TypeId {
        self.primitives.null
    }
    pub fn type_(&self) -> TypeId {
        self.primitives.type_
    }

    // --- modifier-stacking invariants (§3.3) ---

    pub fn can_add_mut(&self, base: TypeId) -> bool {
        !matches!(self.resolve(base), TypeKind::Mut(_) | TypeKind::Const(_))
    }

    pub fn can_add_const(&self, base: TypeId) -> bool {
        !matches!(self.resolve(base), TypeKind::Const(_))
    }

    fn can_add_ptr_or_array_or_ref(&self, base: TypeId) -> bool {
        match self.resolve(base) {
            TypeKind::Mut(inner) => !matches!(self.resolve(*inner), TypeKind::Ref(_)),
            TypeKind::Const(_) | TypeKind::Ref(_) => false,
            _ => true,
        }
    }

    pub fn can_add_ptr(&self, base: TypeId) -> bool {
        self.can_add_ptr_or_array_or_ref(base)
    }

    pub fn can_add_array(&self, base: TypeId) -> bool {
        self.can_add_ptr_or_array_or_ref(base)
    }

    pub fn can_add_ref(&self, base: TypeId) -> bool {
        self.can_add_ptr_or_array_or_ref(base)
    }

    pub fn can_add_opt(&self, base: TypeId) -> bool {
        match self.resolve(base) {
            TypeKind::Mut(inner) => !matches!(self.resolve(*inner), TypeKind::Ref(_) | TypeKind::Opt(_)),
            TypeKind::Opt(_) | TypeKind::Const(_) | TypeKind::Ref(_) => false,
            _ => true,
        }
    }

    // --- builder methods ---

    pub fn mk_mut(&mut self, base: TypeId) -> Result<TypeId> {
        if !self.can_add_mut(base) {
            return Err(InvariantViolation("mut cannot wrap mut or const".into()));
        }
        Ok(self.intern(TypeKind::Mut(base)))
    }

    pub fn mk_const(&mut self, base: TypeId) -> Result<TypeId> {
        if !self.can_add_const(base) {
            return Err(InvariantViolation("const cannot wrap const".into()));
        }
        Ok(self.intern(TypeKind::Const(base)))
    }

    pub fn mk_ptr(&mut self, base: TypeId) -> Result<TypeId> {
        if !self.can_add_ptr(base) {
            return Err(InvariantViolation("ptr cannot wrap const or ref, nor mut-ref".into()));
        }
        Ok(self.intern(TypeKind::Ptr(base)))
    }

    pub fn mk_array(&mut self, base: TypeId, len: u64) -> Result<TypeId> {
        if !self.can_add_array(base) {
            return Err(InvariantViolation("array cannot wrap const or ref, nor mut-ref".into()));
        }
        Ok(self.intern(TypeKind::Array(base, len)))
    }

    pub fn mk_ref(&mut self, base: TypeId) -> Result<TypeId> {
        if !self.can_add_ref(base) {
            return Err(InvariantViolation("ref cannot wrap const or ref, nor mut-ref".into()));
        }
        Ok(self.intern(TypeKind::Ref(base)))
    }

    pub fn mk_opt(&mut self, base: TypeId) -> Result<TypeId> {
        if !self.can_add_opt(base) {
            return Err(InvariantViolation("opt cannot wrap opt, const, or ref, nor mut-ref/mut-opt".into()));
        }
        Ok(self.intern(TypeKind::Opt(base)))
    }

    pub fn mk_fun(&mut self, params: Vec<TypeId>, variadic: bool, ret: TypeId, abi: Abi) -> TypeId {
        self.intern(TypeKind::Fun { sig: Signature { params, variadic }, ret, abi })
    }

    pub fn mk_gen(&mut self, params: Vec<TypeId>, yield_ty: TypeId) -> TypeId {
        self.intern(TypeKind::Gen { sig: Signature { params, variadic: false }, yield_ty })
    }

    pub fn mk_struct(&mut self, decl: DeclId) -> TypeId {
        self.intern(TypeKind::Struct(decl))
    }

    pub fn mk_union(&mut self, decl: DeclId) -> TypeId {
        self.intern(TypeKind::Union(decl))
    }

    pub fn mk_enum(&mut self, decl: DeclId) -> TypeId {
        self.intern(TypeKind::Enum(decl))
    }

    pub fn mk_mod(&mut self, decl: DeclId) -> TypeId {
        self.intern(TypeKind::Mod(decl))
    }

    // --- modifier removal ---

    pub fn remove_mut(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Mut(inner) => *inner,
            _ => id,
        }
    }

    pub fn remove_const(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Const(inner) => *inner,
            _ => id,
        }
    }

    pub fn remove_ptr(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Ptr(inner) => *inner,
            _ => id,
        }
    }

    pub fn remove_array(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Array(inner, _) => *inner,
            _ => id,
        }
    }

    pub fn remove_ref(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Ref(inner) => *inner,
            _ => id,
        }
    }

    pub fn remove_opt(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            TypeKind::Opt(inner) => *inner,
            _ => id,
        }
    }

    pub fn remove_const_mut(&self, id: TypeId) -> TypeId {
        self.remove_mut(self.remove_const(id))
    }

    pub fn remove_const_mut_ref(&self, id: TypeId) -> TypeId {
        self.remove_ref(self.remove_const_mut(id))
    }

    /// Strips every modifier layer (`mut`/`const`/`ref`/`opt`) down to the
    /// builtin or declared type underneath. `ptr`/`array` are not stripped —
    /// they change the value's shape, not just its access qualifiers.
    pub fn underlying_type(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        loop {
            let next = match self.resolve(cur) {
                TypeKind::Mut(inner) | TypeKind::Const(inner) | TypeKind::Ref(inner) | TypeKind::Opt(inner) => *inner,
                _ => return cur,
            };
            cur = next;
        }
    }

    // --- category predicates, delegated to TypeKind ---

    pub fn is_modifier(&self, id: TypeId) -> bool {
        self.resolve(id).is_modifier()
    }
    pub fn is_builtin(&self, id: TypeId) -> bool {
        self.resolve(id).is_builtin()
    }
    pub fn is_integer(&self, id: TypeId) -> bool {
        self.resolve(id).is_integer()
    }
    pub fn is_signed(&self, id: TypeId) -> bool {
        self.resolve(id).is_signed()
    }
    pub fn is_unsigned(&self, id: TypeId) -> bool {
        self.resolve(id).is_unsigned()
    }
    pub fn is_float(&self, id: TypeId) -> bool {
        self.resolve(id).is_float()
    }
    pub fn is_arithmetic(&self, id: TypeId) -> bool {
        self.resolve(id).is_arithmetic()
    }
    pub fn is_invokable(&self, id: TypeId) -> bool {
        self.resolve(id).is_invokable()
    }
    pub fn is_composite(&self, id: TypeId) -> bool {
        self.resolve(id).is_composite()
    }
    pub fn is_decl(&self, id: TypeId) -> bool {
        self.resolve(id).is_decl()
    }

    /// §4.3: `from → to` holds iff, after stripping an outer `const` from
    /// both sides, either neither is a `ref` and they're identical, or both
    /// are `ref` and, after stripping the `ref`, `to`'s `mut`-ness is
    /// consistent with `from`'s (a `ref mut` target requires a `ref mut`
    /// source; a plain `ref` target accepts either).
    pub fn is_implicitly_convertible(&self, from: TypeId, to: TypeId) -> bool {
        if matches!(self.resolve(to), TypeKind::Const(_)) && !matches!(self.resolve(from), TypeKind::Const(_)) {
            return false;
        }
        let from = self.remove_const_mut(from);
        let to = self.remove_const_mut(to);

        let to_is_ref = matches!(self.resolve(to), TypeKind::Ref(_));
        let from_is_ref = matches!(self.resolve(from), TypeKind::Ref(_));
        if to_is_ref {
            if !from_is_ref {
                return false;
            }
            let to_inner = self.remove_ref(to);
            let from_inner = self.remove_ref(from);
            let to_mut = matches!(self.resolve(to_inner), TypeKind::Mut(_));
            let from_mut = matches!(self.resolve(from_inner), TypeKind::Mut(_));
            if to_mut && !from_mut {
                return false;
            }
            return self.remove_mut(to_inner) == self.remove_mut(from_inner);
        }

        let from = self.remove_ref(from);
        from == to
    }

    /// Byte size of a value of this type. Defined for every builtin and for
    /// `ptr`/`ref` (pointer-sized); undefined (panics) for aggregate and
    /// modifier-wrapped-aggregate types, which the emitter must size from
    /// their declaration's field layout instead.
    pub fn size_of(&self, id: TypeId) -> u64 {
        match self.resolve(id) {
            TypeKind::I8 | TypeKind::U8 | TypeKind::Bool => 1,
            TypeKind::I16 | TypeKind::U16 => 2,
            TypeKind::I32 | TypeKind::U32 | TypeKind::F32 => 4,
            TypeKind::I64 | TypeKind::U64 | TypeKind::Isize | TypeKind::Usize | TypeKind::F64 => 8,
            TypeKind::Unit | TypeKind::Null => 0,
            TypeKind::Ptr(_) | TypeKind::Ref(_) => 8,
            TypeKind::Array(inner, len) => self.size_of(*inner) * len,
            TypeKind::Mut(inner) | TypeKind::Const(inner) | TypeKind::Opt(inner) => self.size_of(*inner),
            other => unreachable!("size_of undefined for {other:?}"),
        }
    }

    /// Arithmetic usual-conversion target for a binary operator's operands,
    /// ported from the original's `type_promote`: mismatched int/float
    /// promotes to float, mismatched signedness promotes to signed, else
    /// the strictly wider operand wins (ties keep the right-hand side).
    pub fn promote(&self, lhs: TypeId, rhs: TypeId) -> TypeId {
        let lhs_float = self.is_float(lhs);
        let rhs_float = self.is_float(rhs);
        if lhs_float != rhs_float {
            return if lhs_float { lhs } else { rhs };
        }
        let lhs_signed = self.is_signed(lhs);
        let rhs_signed = self.is_signed(rhs);
        if lhs_signed != rhs_signed {
            return if lhs_signed { lhs } else { rhs };
        }
        if self.size_of(lhs) > self.size_of(rhs) {
            lhs
        } else {
            rhs
        }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_primitives_share_one_id() {
        let store = TypeStore::new();
        assert_eq!(store.i32(), store.i32());
    }

    #[test]
    fn structurally_equal_composites_hash_cons_to_the_same_id() {
        let mut store = TypeStore::new();
        let a = store.mk_ptr(store.i32()).unwrap();
        let b = store.mk_ptr(store.i32()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_array_lengths_are_distinct_types() {
        let mut store = TypeStore::new();
        let a = store.mk_array(store.u8(), 4).unwrap();
        let b = store.mk_array(store.u8(), 8).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn mut_cannot_wrap_const() {
        let mut store = TypeStore::new();
        let c = store.mk_const(store.i32()).unwrap();
        assert!(store.mk_mut(c).is_err());
    }

    #[test]
    fn const_cannot_wrap_const() {
        let mut store = TypeStore::new();
        let c = store.mk_const(store.i32()).unwrap();
        assert!(store.mk_const(c).is_err());
    }

    #[test]
    fn ptr_cannot_wrap_ref() {
        let mut store = TypeStore::new();
        let r = store.mk_ref(store.i32()).unwrap();
        assert!(store.mk_ptr(r).is_err());
    }

    #[test]
    fn ptr_cannot_wrap_mut_ref() {
        let mut store = TypeStore::new();
        let r = store.mk_ref(store.i32()).unwrap();
        let mr = store.mk_mut(r).unwrap();
        assert!(store.mk_ptr(mr).is_err());
    }

    #[test]
    fn ptr_can_wrap_mut_non_ref() {
        let mut store = TypeStore::new();
        let m = store.mk_mut(store.i32()).unwrap();
        assert!(store.mk_ptr(m).is_ok());
    }

    #[test]
    fn opt_cannot_wrap_opt() {
        let mut store = TypeStore::new();
        let o = store.mk_opt(store.i32()).unwrap();
        assert!(store.mk_opt(o).is_err());
    }

    #[test]
    fn underlying_type_strips_every_modifier_layer() {
        let mut store = TypeStore::new();
        let opt = store.mk_opt(store.i32()).unwrap();
        let r = store.mk_ref(opt).unwrap();
        let m = store.mk_mut(r).unwrap();
        let c = store.mk_const(m).unwrap();
        assert_eq!(store.underlying_type(c), store.i32());
    }

    #[test]
    fn non_const_source_cannot_convert_to_a_const_target() {
        let mut store = TypeStore::new();
        let c = store.mk_const(store.i32()).unwrap();
        assert!(!store.is_implicitly_convertible(store.i32(), c));
    }

    #[test]
    fn const_source_converts_to_an_identical_const_target() {
        let mut store = TypeStore::new();
        let c = store.mk_const(store.i32()).unwrap();
        assert!(store.is_implicitly_convertible(c, c));
    }

    #[test]
    fn plain_ref_target_accepts_a_mut_ref_source() {
        let mut store = TypeStore::new();
        let m = store.mk_mut(store.i32()).unwrap();
        let mr = store.mk_ref(m).unwrap();
        let plain_r = store.mk_ref(store.i32()).unwrap();
        assert!(store.is_implicitly_convertible(mr, plain_r));
    }

    #[test]
    fn mut_ref_target_rejects_a_plain_ref_source() {
        let mut store = TypeStore::new();
        let m = store.mk_mut(store.i32()).unwrap();
        let mr = store.mk_ref(m).unwrap();
        let plain_r = store.mk_ref(store.i32()).unwrap();
        assert!(!store.is_implicitly_convertible(plain_r, mr));
    }

    #[test]
    fn promote_prefers_float_over_integer() {
        let store = TypeStore::new();
        assert_eq!(store.promote(store.i32(), store.f32()), store.f32());
    }

    #[test]
    fn promote_prefers_wider_integer() {
        let store = TypeStore::new();
        assert_eq!(store.promote(store.i8(), store.i64()), store.i64());
    }
}
