//! The umbrella crate's own error type: every stage below it already
//! returns a richly-typed error ([`tau_base::SpannedError`] through lex/
//! parse/analysis, [`tau_bytecode::EmitError`] through emission and
//! backpatching); this just unifies the two so [`crate::compile`] has one
//! `Result` type to return, following the same "one error-returning result
//! kind at every boundary" shape §9 calls for.

use std::fmt;

use tau_base::SpannedError;
use tau_bytecode::{EmitError, UnresolvedLabel};

#[derive(Debug)]
pub enum CompileError {
    Source(SpannedError),
    Emit(EmitError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Source(e) => write!(f, "{}", e),
            CompileError::Emit(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Source(e) => Some(e),
            CompileError::Emit(e) => Some(e),
        }
    }
}

impl From<SpannedError> for CompileError {
    fn from(e: SpannedError) -> Self {
        CompileError::Source(e)
    }
}

impl From<EmitError> for CompileError {
    fn from(e: EmitError) -> Self {
        CompileError::Emit(e)
    }
}

impl From<UnresolvedLabel> for CompileError {
    fn from(e: UnresolvedLabel) -> Self {
        CompileError::Emit(EmitError::from(e))
    }
}
