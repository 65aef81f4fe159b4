//! Semantic analysis for the Tau toolchain (§4.4).
//!
//! Resolves every identifier against a lexical scope tree, rewrites
//! resolved identifier expressions to `ExprKind::Decl` in place, and
//! assigns a [`tau_types::TypeId`] to every expression, declaration, and
//! parameter node via a node-identity-keyed side table. Depends on
//! `tau-base` for diagnostics/interning, `tau-syntax` for the AST, and
//! `tau-types` for the hash-consed type store — the bytecode emitter
//! downstream reads both the rewritten AST and this crate's type
//! assignments without re-deriving either.

mod analyzer;
mod symtab;
mod typetable;

pub use analyzer::{Analysis, Analyzer};
pub use symtab::{ScopeId, SymbolTable};
pub use typetable::NodeTypeTable;
