//! Hash-consed type descriptors for the Tau toolchain (§3.3, §4.3).
//!
//! [`TypeStore`] is the canonical descriptor table: every `mk_*` call either
//! returns the existing handle for a structurally-equal descriptor or
//! allocates a new one, so two `TypeId`s compare equal iff the types they
//! name are the same. The analyzer is the only consumer that also needs an
//! AST-node-keyed side table (node → descriptor); that table lives in
//! `tau_sema`, since `tau_types` has no dependency on `tau_syntax` and
//! therefore no notion of an AST node.

mod kind;
mod store;

pub use kind::{DeclId, Signature, TypeId, TypeKind};
pub use store::{InvariantViolation, TypeStore};

/// Calling convention carried by a `fun` type descriptor. Mirrors
/// `tau_syntax::Abi`; kept as a separate type so `tau_types` stays
/// independent of the AST crate — the analyzer converts between the two
/// when it builds a function's type from its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abi {
    Tau,
    Cdecl,
    Stdcall,
    Win64,
    Sysv64,
    Aapcs,
    Fastcall,
    Vectorcall,
    Thiscall,
}
