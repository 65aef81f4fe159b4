//! End-to-end pipeline scenarios (spec.md §8, "concrete end-to-end
//! scenarios"), mirroring the teacher's own top-level `tests/` directory.

use tau::{compile, compile_and_run};
use tau_bytecode::Register;

#[test]
fn scenario_6_adds_two_integer_literals_and_returns_the_sum() {
    let top = compile_and_run("fun main(): i32 { return 1 + 2 }", tau_vm::DEFAULT_STACK_SIZE, |vm| {
        let sp = vm.register(Register::Sp) as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&vm.stack()[sp..sp + 4]);
        u32::from_le_bytes(bytes)
    })
    .unwrap();
    assert_eq!(top, 3);
}

#[test]
fn function_with_a_parameter_returns_its_argument() {
    let source = "fun f(x: i32): i32 { return x } fun main(): i32 { return f(41) }";
    let top = compile_and_run(source, tau_vm::DEFAULT_STACK_SIZE, |vm| {
        let sp = vm.register(Register::Sp) as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&vm.stack()[sp..sp + 4]);
        u32::from_le_bytes(bytes)
    })
    .unwrap();
    assert_eq!(top, 41);
}

#[test]
fn nested_arithmetic_respects_precedence() {
    // `2 + 3 * 4` must parse as `2 + (3 * 4)`, not `(2 + 3) * 4`.
    let top = compile_and_run("fun main(): i32 { return 2 + 3 * 4 }", tau_vm::DEFAULT_STACK_SIZE, |vm| {
        let sp = vm.register(Register::Sp) as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&vm.stack()[sp..sp + 4]);
        u32::from_le_bytes(bytes)
    })
    .unwrap();
    assert_eq!(top, 14);
}

#[test]
fn if_else_selects_the_taken_branch() {
    let source = "fun main(): i32 { if 1 == 1 { return 7 } else { return 9 } }";
    let top = compile_and_run(source, tau_vm::DEFAULT_STACK_SIZE, |vm| {
        let sp = vm.register(Register::Sp) as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&vm.stack()[sp..sp + 4]);
        u32::from_le_bytes(bytes)
    })
    .unwrap();
    assert_eq!(top, 7);
}

#[test]
fn compile_rejects_an_unresolved_identifier() {
    let err = compile("fun main(): i32 { return undefined_name }").unwrap_err();
    let message = err.to_string();
    assert!(!message.is_empty());
}

#[test]
fn compile_rejects_a_parse_error() {
    let err = compile("fun main(): i32 { return }").unwrap_err();
    let message = err.to_string();
    assert!(!message.is_empty());
}
