//! The fetch-decode-execute loop and opcode dispatch (§3.6, §4.7).
//!
//! Grounded on `original_source/src/vm.c`'s `vm_fetch`/`vm_decode`/
//! `vm_execute`/`vm_run`. The VM does not validate the instruction stream;
//! bytecode reaching it is trusted to have come out of [`tau_bytecode`]'s
//! own encoder (§4.7's closing line). Operand reads that run past the end
//! of `code` or `stack` panic rather than returning a `Result` — there is
//! no recovery path for corrupt bytecode, matching the original's asserts
//! (which are themselves just sanity checks on trusted input, not input
//! validation).

use tau_bytecode::{Addr, Opcode, Register, Width};

use crate::arith;
use crate::flags::Flags;
use crate::registers::RegisterFile;

/// Matches `VM_STACK_DEFAULT_SIZE` in `original_source/inc/vm.h`.
pub const DEFAULT_STACK_SIZE: usize = 8 * 1024;

/// A register machine executing one bytecode blob. The code slice is
/// borrowed for the run (§3.6: "the code region is borrowed read-only");
/// the VM owns its stack allocation.
pub struct Vm<'c> {
    code: &'c [u8],
    stack: Vec<u8>,
    regs: RegisterFile,
    flags: Flags,
}

impl<'c> Vm<'c> {
    /// `stack_size` is the one configurable knob the VM takes (§1's
    /// "construction-time parameters... not read from environment or
    /// files"); pass [`DEFAULT_STACK_SIZE`] absent a reason to choose
    /// another.
    pub fn new(code: &'c [u8], stack_size: usize) -> Vm<'c> {
        let mut regs = RegisterFile::new();
        regs.set_u64(Register::Sp, stack_size as u64);
        let mut vm = Vm { code, stack: vec![0u8; stack_size], regs, flags: Flags::default() };
        vm.regs.set_u64(Register::Ip, 0);
        vm
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn register(&self, reg: Register) -> u64 {
        self.regs.get_u64(reg)
    }

    /// The full stack buffer, addressed from offset 0 at its lowest
    /// address (not from the top `SP` starts at). Lets a caller read back
    /// a finished run's results once it knows where `SP`/`BP` left them.
    pub fn stack(&self) -> &[u8] {
        &self.stack
    }

    /// Runs until `HLT` executes. Ported from `vm_run`'s
    /// `while (opcode != HLT) { fetch; decode; execute; }`: the loop body
    /// always runs at least once, and `HLT` itself is fetched, decoded,
    /// and executed (as a no-op) before the loop exits — it is only the
    /// instruction *after* `HLT` that never gets fetched.
    pub fn run(&mut self) {
        loop {
            let header = self.next_u16();
            let (opcode, param, width) = Opcode::decode(header).expect("trusted bytecode stream");
            self.execute(opcode, param, width);
            if opcode == Opcode::Hlt {
                break;
            }
        }
    }

    fn ip(&self) -> usize {
        self.regs.get_u64(Register::Ip) as usize
    }

    fn set_ip(&mut self, ip: usize) {
        self.regs.set_u64(Register::Ip, ip as u64);
    }

    fn next_u8(&mut self) -> u8 {
        let ip = self.ip();
        let v = self.code[ip];
        self.set_ip(ip + 1);
        v
    }

    fn next_bytes(&mut self, n: usize) -> u64 {
        let ip = self.ip();
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&self.code[ip..ip + n]);
        self.set_ip(ip + n);
        u64::from_le_bytes(buf)
    }

    fn next_u16(&mut self) -> u16 {
        self.next_bytes(2) as u16
    }

    fn next_imm(&mut self, width: Width) -> u64 {
        self.next_bytes(width.bytes())
    }

    fn next_i64_raw(&mut self) -> i64 {
        self.next_bytes(8) as i64
    }

    /// Decodes a memory operand at the current `IP` and resolves it to an
    /// absolute offset into `stack`. Ported from `vm_code_next_addr` +
    /// `vm_addr_effective`; register contents stand in for the original's
    /// raw pointers.
    fn next_addr(&mut self) -> i64 {
        let ip = self.ip();
        let (addr, len) = Addr::decode(&self.code[ip..]).expect("trusted bytecode stream");
        self.set_ip(ip + len);
        let base_val = addr.base.map(|r| self.regs.get_u64(r) as i64).unwrap_or(0);
        let index_val = addr.index.map(|r| self.regs.get_u64(r) as i64).unwrap_or(0);
        addr.effective(base_val, index_val)
    }

    fn mem_read(&self, addr: i64, width: Width) -> u64 {
        let start = addr as usize;
        let n = width.bytes();
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&self.stack[start..start + n]);
        u64::from_le_bytes(buf)
    }

    fn mem_write(&mut self, addr: i64, width: Width, value: u64) {
        let start = addr as usize;
        let n = width.bytes();
        self.stack[start..start + n].copy_from_slice(&value.to_le_bytes()[..n]);
    }

    fn push(&mut self, width: Width, value: u64) {
        let n = width.bytes();
        let sp = self.regs.get_u64(Register::Sp) as usize - n;
        self.stack[sp..sp + n].copy_from_slice(&value.to_le_bytes()[..n]);
        self.regs.set_u64(Register::Sp, sp as u64);
    }

    fn pop(&mut self, width: Width) -> u64 {
        let sp = self.regs.get_u64(Register::Sp) as usize;
        let n = width.bytes();
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&self.stack[sp..sp + n]);
        self.regs.set_u64(Register::Sp, (sp + n) as u64);
        u64::from_le_bytes(buf)
    }

    fn execute(&mut self, opcode: Opcode, param: u8, width: Width) {
        use Opcode::*;
        match opcode {
            Nop | Hlt => {}
            Mov => self.binop_u(param, width, |_lhs, rhs, _bits, _flags| rhs),
            Psh => self.exec_psh(param, width),
            Pop => self.exec_pop(param, width),
            Lea => self.exec_lea(),
            Add => self.binop_u(param, width, arith::unsigned_add),
            Sub => self.binop_u(param, width, arith::unsigned_sub),
            Mul => self.binop_u(param, width, arith::unsigned_mul),
            Div => self.binop_u(param, width, arith::unsigned_div),
            Mod => self.binop_u(param, width, arith::unsigned_mod),
            Inc => self.unop_u(param, width, |v, bits, f| arith::unsigned_add(v, 1, bits, f)),
            Dec => self.unop_u(param, width, |v, bits, f| arith::unsigned_sub(v, 1, bits, f)),
            Iadd => self.binop_i(param, width, arith::signed_add),
            Isub => self.binop_i(param, width, arith::signed_sub),
            Imul => self.binop_i(param, width, arith::signed_mul),
            Idiv => self.binop_i(param, width, arith::signed_div),
            Imod => self.binop_i(param, width, arith::signed_mod),
            Ineg => self.unop_i(param, width, arith::signed_neg),
            Iinc => self.unop_i(param, width, |v, bits, f| arith::signed_add(v, 1, bits, f)),
            Idec => self.unop_i(param, width, |v, bits, f| arith::signed_sub(v, 1, bits, f)),
            Fadd => self.binop_f(param, width, |a, b| a + b, |a, b| a + b),
            Fsub => self.binop_f(param, width, |a, b| a - b, |a, b| a - b),
            Fmul => self.binop_f(param, width, |a, b| a * b, |a, b| a * b),
            Fdiv => self.binop_f(param, width, |a, b| a / b, |a, b| a / b),
            // FMOD shares FDIV's template in the original machine; there is no
            // separate remainder instruction for floats.
            Fmod => self.binop_f(param, width, |a, b| a / b, |a, b| a / b),
            Fneg => self.unop_f(param, width, |v| -v, |v| -v),
            And => self.binop_u(param, width, arith::unsigned_and),
            Or => self.binop_u(param, width, arith::unsigned_or),
            Xor => self.binop_u(param, width, arith::unsigned_xor),
            Not => self.unop_u(param, width, arith::unsigned_not),
            Shl => self.binop_u(param, width, arith::unsigned_shl),
            Shr => self.binop_u(param, width, arith::unsigned_shr),
            Jmp => {
                let addr = self.next_i64_raw();
                self.set_ip(addr as usize);
            }
            Je | Jz => self.jump_if(self.flags.zero),
            Jne | Jnz => self.jump_if(!self.flags.zero),
            Jl | Jn => self.jump_if(self.flags.negative),
            Jle => self.jump_if(self.flags.zero || self.flags.negative),
            Jg => self.jump_if(!self.flags.zero && !self.flags.negative),
            Jge => self.jump_if(self.flags.zero || !self.flags.negative),
            Jnn => self.jump_if(!self.flags.negative),
            Jo => self.jump_if(self.flags.overflow),
            Jno => self.jump_if(!self.flags.overflow),
            Jc => self.jump_if(self.flags.carry),
            Jnc => self.jump_if(!self.flags.carry),
            Jp => self.jump_if(self.flags.parity),
            Jnp => self.jump_if(!self.flags.parity),
            Cmp => self.cmp_u(param, width),
            Icmp => self.cmp_i(param, width),
            Clf => self.flags.clear(),
            Call => {
                let addr = self.next_i64_raw();
                let ret = self.ip() as u64;
                self.push(Width::W64, ret);
                self.set_ip(addr as usize);
            }
            Ret => {
                let addr = self.pop(Width::W64);
                self.set_ip(addr as usize);
            }
        }
    }

    /// Reads the jump target unconditionally (it must always be consumed
    /// off the instruction stream even when the branch isn't taken), then
    /// sets `IP` to it only if `taken`.
    fn jump_if(&mut self, taken: bool) {
        let addr = self.next_i64_raw();
        if taken {
            self.set_ip(addr as usize);
        }
    }

    fn exec_psh(&mut self, param: u8, width: Width) {
        let value = match param {
            0 => {
                let b = self.next_u8();
                let reg = Register::decode(b, width).expect("trusted bytecode stream");
                self.regs.get_u64(reg)
            }
            1 => {
                let addr = self.next_addr();
                self.mem_read(addr, width)
            }
            2 => self.next_imm(width),
            _ => unreachable!("trusted bytecode stream"),
        };
        self.push(width, value);
    }

    fn exec_pop(&mut self, param: u8, width: Width) {
        match param {
            0 => {
                let b = self.next_u8();
                let reg = Register::decode(b, width).expect("trusted bytecode stream");
                let value = self.pop(width);
                self.regs.set_u64(reg, value);
            }
            1 => {
                let addr = self.next_addr();
                let value = self.pop(width);
                self.mem_write(addr, width, value);
            }
            _ => unreachable!("trusted bytecode stream"),
        }
    }

    fn exec_lea(&mut self) {
        let b = self.next_u8();
        let dst = Register::decode(b, Width::W64).expect("trusted bytecode stream");
        let addr = self.next_addr();
        self.regs.set_u64(dst, addr as u64);
    }

    /// Every unsigned/raw two-operand opcode (`MOV`, `ADD`, `AND`, ...)
    /// shares this read-compute-writeback shape across all six operand
    /// combinations; only the combining function differs per opcode.
    /// Ported from `template_decls_vm_execute_BIN_OP`.
    fn binop_u(&mut self, param: u8, width: Width, op: impl Fn(u64, u64, u32, &mut Flags) -> u64) {
        let bits = width.bits();
        match param {
            0 => {
                let b = self.next_u8();
                let dst = Register::decode(b >> 4, width).expect("trusted bytecode stream");
                let src = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let result = op(self.regs.get_u64(dst), self.regs.get_u64(src), bits, &mut self.flags);
                self.regs.set_u64(dst, result);
            }
            1 => {
                let addr = self.next_addr();
                let b = self.next_u8();
                let src = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let result = op(self.mem_read(addr, width), self.regs.get_u64(src), bits, &mut self.flags);
                self.mem_write(addr, width, result);
            }
            2 => {
                let b = self.next_u8();
                let dst = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let addr = self.next_addr();
                let result = op(self.regs.get_u64(dst), self.mem_read(addr, width), bits, &mut self.flags);
                self.regs.set_u64(dst, result);
            }
            3 => {
                let addr_dst = self.next_addr();
                let addr_src = self.next_addr();
                let result = op(self.mem_read(addr_dst, width), self.mem_read(addr_src, width), bits, &mut self.flags);
                self.mem_write(addr_dst, width, result);
            }
            4 => {
                let b = self.next_u8();
                let dst = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let imm = self.next_imm(width);
                let result = op(self.regs.get_u64(dst), imm, bits, &mut self.flags);
                self.regs.set_u64(dst, result);
            }
            5 => {
                let addr = self.next_addr();
                let imm = self.next_imm(width);
                let result = op(self.mem_read(addr, width), imm, bits, &mut self.flags);
                self.mem_write(addr, width, result);
            }
            _ => unreachable!("trusted bytecode stream"),
        }
    }

    /// Same shape as [`Vm::binop_u`], but operands are sign-extended to
    /// `i64` before reaching `op`. Ported from
    /// `template_decls_vm_execute_SIGNED_BIN_OP`.
    fn binop_i(&mut self, param: u8, width: Width, op: impl Fn(i64, i64, u32, &mut Flags) -> u64) {
        self.binop_u(param, width, |lhs, rhs, bits, flags| {
            op(arith::sign_extend(lhs, bits), arith::sign_extend(rhs, bits), bits, flags)
        });
    }

    /// `FADD`/`FSUB`/.../`FMOD`: arithmetic happens at the declared
    /// precision (`f32` at `W32`, `f64` at `W64`) and never touches
    /// `FLAGS`, matching `template_impl_vm_execute_FLOAT_BIN_OP`.
    fn binop_f(&mut self, param: u8, width: Width, op32: impl Fn(f32, f32) -> f32, op64: impl Fn(f64, f64) -> f64) {
        match param {
            0 => {
                let b = self.next_u8();
                let dst = Register::decode(b >> 4, width).expect("trusted bytecode stream");
                let src = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                self.store_float_result(dst, width, |vm| {
                    Self::apply_float(width, vm.regs.get_u64(dst), vm.regs.get_u64(src), &op32, &op64)
                });
            }
            1 => {
                let addr = self.next_addr();
                let b = self.next_u8();
                let src = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let lhs = self.mem_read(addr, width);
                let rhs = self.regs.get_u64(src);
                let result = Self::apply_float(width, lhs, rhs, &op32, &op64);
                self.mem_write(addr, width, result);
            }
            2 => {
                let b = self.next_u8();
                let dst = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let addr = self.next_addr();
                let rhs = self.mem_read(addr, width);
                self.store_float_result(dst, width, |vm| Self::apply_float(width, vm.regs.get_u64(dst), rhs, &op32, &op64));
            }
            3 => {
                let addr_dst = self.next_addr();
                let addr_src = self.next_addr();
                let lhs = self.mem_read(addr_dst, width);
                let rhs = self.mem_read(addr_src, width);
                let result = Self::apply_float(width, lhs, rhs, &op32, &op64);
                self.mem_write(addr_dst, width, result);
            }
            4 => {
                let b = self.next_u8();
                let dst = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let rhs = self.next_imm(width);
                self.store_float_result(dst, width, |vm| Self::apply_float(width, vm.regs.get_u64(dst), rhs, &op32, &op64));
            }
            5 => {
                let addr = self.next_addr();
                let rhs = self.next_imm(width);
                let lhs = self.mem_read(addr, width);
                let result = Self::apply_float(width, lhs, rhs, &op32, &op64);
                self.mem_write(addr, width, result);
            }
            _ => unreachable!("trusted bytecode stream"),
        }
    }

    fn store_float_result(&mut self, dst: Register, width: Width, compute: impl FnOnce(&Self) -> u64) {
        let result = compute(self);
        self.regs.set_u64(dst, result);
        let _ = width;
    }

    fn apply_float(width: Width, lhs: u64, rhs: u64, op32: &impl Fn(f32, f32) -> f32, op64: &impl Fn(f64, f64) -> f64) -> u64 {
        match width {
            Width::W32 => op32(f32::from_bits(lhs as u32), f32::from_bits(rhs as u32)).to_bits() as u64,
            _ => op64(f64::from_bits(lhs), f64::from_bits(rhs)).to_bits(),
        }
    }

    fn unop_u(&mut self, param: u8, width: Width, op: impl Fn(u64, u32, &mut Flags) -> u64) {
        let bits = width.bits();
        match param {
            0 => {
                let b = self.next_u8();
                let reg = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let result = op(self.regs.get_u64(reg), bits, &mut self.flags);
                self.regs.set_u64(reg, result);
            }
            1 => {
                let addr = self.next_addr();
                let result = op(self.mem_read(addr, width), bits, &mut self.flags);
                self.mem_write(addr, width, result);
            }
            _ => unreachable!("trusted bytecode stream"),
        }
    }

    fn unop_i(&mut self, param: u8, width: Width, op: impl Fn(i64, u32, &mut Flags) -> u64) {
        self.unop_u(param, width, |v, bits, flags| op(arith::sign_extend(v, bits), bits, flags));
    }

    fn unop_f(&mut self, param: u8, width: Width, op32: impl Fn(f32) -> f32, op64: impl Fn(f64) -> f64) {
        match param {
            0 => {
                let b = self.next_u8();
                let reg = Register::decode(b & 0xF, width).expect("trusted bytecode stream");
                let result = Self::apply_float_unary(width, self.regs.get_u64(reg), &op32, &op64);
                self.regs.set_u64(reg, result);
            }
            1 => {
                let addr = self.next_addr();
                let result = Self::apply_float_unary(width, self.mem_read(addr, width), &op32, &op64);
                self.mem_write(addr, width, result);
            }
            _ => unreachable!("trusted bytecode stream"),
        }
    }

    fn apply_float_unary(width: Width, value: u64, op32: &impl Fn(f32) -> f32, op64: &impl Fn(f64) -> f64) -> u64 {
        match width {
            Width::W32 => op32(f32::from_bits(value as u32)).to_bits() as u64,
            _ => op64(f64::from_bits(value)).to_bits(),
        }
    }

    /// `CMP`: flags as if `SUB` ran, result discarded. Ported from
    /// `vm_execute_CMP` and its six operand-shape variants.
    fn cmp_u(&mut self, param: u8, width: Width) {
        self.binop_u(param, width, |lhs, rhs, _bits, flags| {
            arith::unsigned_cmp(lhs, rhs, flags);
            lhs
        });
    }

    /// `ICMP`: flags as if `ISUB` ran, result discarded. The writeback in
    /// `binop_i`/`binop_u` re-masks to the operand's own width, so handing
    /// back `lhs` unchanged is a safe no-op store.
    fn cmp_i(&mut self, param: u8, width: Width) {
        self.binop_i(param, width, |lhs, rhs, bits, flags| {
            arith::signed_cmp(lhs, rhs, bits, flags);
            lhs as u64
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_bytecode::{Imm, Operand, Program, Register::*};

    fn run(program: &Program) -> Vm<'_> {
        let mut vm = Vm::new(&program.code, DEFAULT_STACK_SIZE);
        vm.run();
        vm
    }

    /// spec.md §8 scenario 6: `fun main(): i32 { return 1 + 2 }`, lowered
    /// by hand to the bytecode `emit_program` would produce for it —
    /// push both operands, add, leave the sum on top of the stack.
    #[test]
    fn pushes_and_adds_two_immediates() {
        let mut p = Program::new();
        p.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(1)), Width::W32);
        p.emit1(Opcode::Psh, &Operand::Imm(Imm::Int(2)), Width::W32);
        p.emit1(Opcode::Pop, &Operand::Reg(BLD), Width::W32);
        p.emit1(Opcode::Pop, &Operand::Reg(ALD), Width::W32);
        p.emit2(Opcode::Add, &Operand::Reg(ALD), &Operand::Reg(BLD), Width::W32);
        p.emit1(Opcode::Psh, &Operand::Reg(ALD), Width::W32);
        p.emit0(Opcode::Hlt);
        p.backpatch().unwrap();

        let vm = run(&p);
        let sp = vm.register(Register::Sp) as usize;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&vm.stack[sp..sp + 4]);
        assert_eq!(u32::from_le_bytes(bytes), 3);
    }

    #[test]
    fn mov_reg_imm_then_add_reg_reg_sets_carry_on_wraparound() {
        let mut p = Program::new();
        p.emit2(Opcode::Mov, &Operand::Reg(ALB), &Operand::Imm(Imm::Int(0xFF)), Width::W8);
        p.emit2(Opcode::Mov, &Operand::Reg(BLB), &Operand::Imm(Imm::Int(1)), Width::W8);
        p.emit2(Opcode::Add, &Operand::Reg(ALB), &Operand::Reg(BLB), Width::W8);
        p.emit0(Opcode::Hlt);
        p.backpatch().unwrap();

        let vm = run(&p);
        assert_eq!(vm.register(ALB), 0);
        assert!(vm.flags().carry);
        assert!(!vm.flags().zero);
    }

    #[test]
    fn conditional_jump_is_skipped_when_condition_is_false() {
        let mut p = Program::new();
        let skip = p.new_label();
        p.emit2(Opcode::Mov, &Operand::Reg(ALD), &Operand::Imm(Imm::Int(5)), Width::W32);
        p.emit2(Opcode::Mov, &Operand::Reg(BLD), &Operand::Imm(Imm::Int(5)), Width::W32);
        p.emit2(Opcode::Cmp, &Operand::Reg(ALD), &Operand::Reg(BLD), Width::W32);
        p.emit_jump(Opcode::Jne, skip);
        p.emit2(Opcode::Mov, &Operand::Reg(CLD), &Operand::Imm(Imm::Int(1)), Width::W32);
        p.define_label(skip);
        p.emit0(Opcode::Hlt);
        p.backpatch().unwrap();

        let vm = run(&p);
        assert_eq!(vm.register(CLD), 1);
    }

    #[test]
    fn call_then_ret_returns_to_the_instruction_after_call() {
        let mut p = Program::new();
        let routine = p.new_label();
        p.emit_jump(Opcode::Call, routine);
        p.emit2(Opcode::Mov, &Operand::Reg(ALD), &Operand::Imm(Imm::Int(42)), Width::W32);
        p.emit0(Opcode::Hlt);
        p.define_label(routine);
        p.emit2(Opcode::Mov, &Operand::Reg(BLD), &Operand::Imm(Imm::Int(7)), Width::W32);
        p.emit0(Opcode::Ret);
        p.backpatch().unwrap();

        let vm = run(&p);
        assert_eq!(vm.register(BLD), 7);
        assert_eq!(vm.register(ALD), 42);
    }

    #[test]
    fn idiv_by_min_over_negative_one_sets_overflow() {
        let mut p = Program::new();
        p.emit2(Opcode::Mov, &Operand::Reg(ALD), &Operand::Imm(Imm::Int(i32::MIN as i64)), Width::W32);
        p.emit2(Opcode::Mov, &Operand::Reg(BLD), &Operand::Imm(Imm::Int(-1)), Width::W32);
        p.emit2(Opcode::Idiv, &Operand::Reg(ALD), &Operand::Reg(BLD), Width::W32);
        p.emit0(Opcode::Hlt);
        p.backpatch().unwrap();

        let vm = run(&p);
        assert!(vm.flags().overflow);
    }

    #[test]
    fn fadd_leaves_flags_untouched() {
        let mut p = Program::new();
        p.emit2(Opcode::Mov, &Operand::Reg(BLD), &Operand::Imm(Imm::Int(-1)), Width::W32);
        p.emit2(Opcode::Cmp, &Operand::Reg(BLD), &Operand::Reg(BLD), Width::W32);
        p.emit2(Opcode::Fadd, &Operand::Reg(A), &Operand::Imm(Imm::Float(1.5)), Width::W64);
        p.emit0(Opcode::Hlt);
        p.backpatch().unwrap();

        let vm = run(&p);
        assert!(vm.flags().zero);
        assert_eq!(f64::from_bits(vm.register(A)), 1.5);
    }
}
