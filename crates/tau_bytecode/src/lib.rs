//! Instruction encoding and bytecode emission for the Tau toolchain
//! (§3.5, §4.5, §6). [`opcode`]/[`register`]/[`addr`]/[`operand`] encode
//! and decode the instruction stream's bit-level format; [`program`] holds
//! the growable buffer, label table, and backpatching; [`emitter`] walks
//! an analyzed AST and emits instructions into a `Program`. Depends on
//! `tau-base` for diagnostics, `tau-syntax` for the AST, `tau-types` for
//! type sizing, and `tau-sema` for the analyzer's per-node type
//! assignments and resolved identifiers — the VM downstream needs none of
//! this and depends only on the encoded instruction stream this crate
//! produces.

mod addr;
mod emitter;
mod opcode;
mod operand;
mod program;
mod register;

pub use addr::{Addr, AddrMode};
pub use emitter::{emit_program, EmitError};
pub use opcode::{Arity, Opcode, Param1, Param2, Width};
pub use operand::{Imm, Operand};
pub use program::{Instruction, LabelId, Program, UnresolvedLabel};
pub use register::Register;
