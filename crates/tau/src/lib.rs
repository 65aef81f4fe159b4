//! Wires the pipeline stages — [`tau_syntax`]'s lexer and parser,
//! [`tau_sema`]'s analyzer, [`tau_bytecode`]'s emitter, and [`tau_vm`]'s
//! VM — into the two convenience entry points integration tests want:
//! [`compile`] (source to a backpatched [`tau_bytecode::Program`]) and
//! [`compile_and_run`] (the same, then run to completion on a [`Vm`]).
//!
//! This is not the CLI driver spec.md §1 excludes from scope: no argument
//! parsing, file I/O, or diagnostic pretty-printing lives here, only the
//! pipeline wiring itself.

mod error;

pub use error::CompileError;

use tau_base::Interner;
use tau_bytecode::Program;
use tau_sema::Analyzer;
use tau_syntax::{AstArena, Lexer, Parser};
use tau_vm::Vm;

/// Lexes, parses, analyzes, and emits `source`, returning the finished
/// (fully backpatched) bytecode program. Each stage's own error converts
/// into [`CompileError`] via `?`, matching the "abort at the first error"
/// policy §7 describes as the driver's choice — here the umbrella crate
/// itself is the driver, and it chooses to abort.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let mut interner = Interner::new();
    let tokens = Lexer::new("<source>", source, &mut interner).tokenize()?;

    let arena = AstArena::new();
    let mut parser = Parser::new(tokens, &arena, &interner);
    let program = parser.parse_program()?;

    let mut analyzer = Analyzer::new(&interner);
    analyzer.analyze_program(&program)?;

    let mut bytecode = tau_bytecode::emit_program(&mut analyzer, &program)?;
    bytecode.backpatch()?;
    Ok(bytecode)
}

/// Compiles `source` and runs the result to completion on a fresh [`Vm`]
/// with the given stack size, handing the finished machine to `inspect`
/// so the caller can read back whatever registers or stack bytes the
/// program left behind. The [`Vm`] only lives for the duration of the
/// call — it borrows the bytecode this function owns locally — so results
/// must be extracted inside `inspect` rather than by returning the `Vm`
/// itself.
pub fn compile_and_run<T>(source: &str, stack_size: usize, inspect: impl FnOnce(&Vm) -> T) -> Result<T, CompileError> {
    let program = compile(source)?;
    let mut vm = Vm::new(&program.code, stack_size);
    vm.run();
    Ok(inspect(&vm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_bytecode::Register;

    #[test]
    fn compiles_a_trivial_main() {
        let program = compile("fun main(): i32 { return 0 }").unwrap();
        assert!(!program.code.is_empty());
    }

    #[test]
    fn rejects_a_lex_error() {
        let err = compile("fun main(): i32 { return `bad` }").unwrap_err();
        assert!(matches!(err, CompileError::Source(_)));
    }

    /// spec.md §8 scenario 6.
    #[test]
    fn adds_two_integer_literals_and_returns_the_sum() {
        let top = compile_and_run("fun main(): i32 { return 1 + 2 }", tau_vm::DEFAULT_STACK_SIZE, |vm| {
            let sp = vm.register(Register::Sp) as usize;
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&vm.stack()[sp..sp + 4]);
            u32::from_le_bytes(bytes)
        })
        .unwrap();
        assert_eq!(top, 3);
    }
}
