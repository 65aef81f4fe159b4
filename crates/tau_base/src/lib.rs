//! Structural atoms shared by every Tau compiler crate: arena allocation,
//! string interning, source spans, and the error/warning types the rest of
//! the pipeline returns.

mod arena;
mod error;
mod intern;
mod span;

pub use arena::Arena;
pub use error::{Kind, Result, SpannedError, Warning};
pub use intern::{Interner, Symbol};
pub use span::Span;
