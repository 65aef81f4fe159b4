//! The bytecode buffer: a growable byte vector plus the label table and
//! pending-reference list that let the emitter forward-reference a label
//! before it knows that label's final offset (§3.5, §9).
//!
//! The original's `bytecode_t` carries a label list but never finishes
//! wiring up its reference list (`bytecode_ref_t` is declared but unused) —
//! spec.md §9 calls that out as a known bug. `Program` builds the
//! reference list as a real part of its contract: every `Operand::Label`
//! emitted records a patch site, and [`Program::backpatch`] walks them all
//! once every label the program will ever define has been defined.

use std::collections::HashMap;
use std::fmt;

use crate::addr::Addr;
use crate::opcode::{Arity, Opcode, Param1, Param2, Width};
use crate::operand::{Imm, Operand};
use crate::register::Register;

/// An opaque forward-reference target. Allocated by [`Program::new_label`]
/// and pinned to a byte offset by [`Program::define_label`]; until then it
/// may appear in any number of emitted jump/call operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

#[derive(Debug)]
pub struct UnresolvedLabel(pub LabelId);

impl fmt::Display for UnresolvedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label {:?} was referenced but never defined", self.0)
    }
}

impl std::error::Error for UnresolvedLabel {}

/// A decoded instruction: its opcode, declared width, and operands in
/// source order (for a 2-operand instruction, `[dst, src]`). `len` is the
/// instruction's total size in bytes, including its 2-byte header.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub width: Width,
    pub operands: Vec<Operand>,
    pub len: usize,
}

impl Instruction {
    pub fn decode(bytes: &[u8]) -> Option<Instruction> {
        let header = u16::from_le_bytes(bytes.get(0..2)?.try_into().ok()?);
        let (opcode, param, width) = Opcode::decode(header)?;
        let mut offset = 2usize;
        let mut operands = Vec::new();
        match opcode.arity() {
            Arity::Zero => {}
            Arity::One => {
                let shape = match param {
                    0 => Param1::Reg,
                    1 => Param1::Mem,
                    2 => Param1::Imm,
                    3 => Param1::Label,
                    _ => return None,
                };
                match shape {
                    Param1::Reg => {
                        let r = Register::decode(*bytes.get(offset)?, Width::W64)?;
                        operands.push(Operand::Reg(r));
                        offset += 1;
                    }
                    Param1::Mem => {
                        let (addr, len) = Addr::decode(&bytes[offset..])?;
                        operands.push(Operand::Mem(addr));
                        offset += len;
                    }
                    Param1::Imm => {
                        let imm = Imm::decode(&bytes[offset..], width, opcode.is_float())?;
                        operands.push(Operand::Imm(imm));
                        offset += width.bytes();
                    }
                    Param1::Label => {
                        let v = i64::from_le_bytes(bytes.get(offset..offset + 8)?.try_into().ok()?);
                        operands.push(Operand::Label(v));
                        offset += 8;
                    }
                }
            }
            Arity::Two => {
                let shape = match param {
                    0 => Param2::RegReg,
                    1 => Param2::MemReg,
                    2 => Param2::RegMem,
                    3 => Param2::MemMem,
                    4 => Param2::RegImm,
                    5 => Param2::MemImm,
                    _ => return None,
                };
                match shape {
                    Param2::RegReg => {
                        let b = *bytes.get(offset)?;
                        let dst = Register::decode(b >> 4, Width::W64)?;
                        let src = Register::decode(b & 0xF, Width::W64)?;
                        operands.push(Operand::Reg(dst));
                        operands.push(Operand::Reg(src));
                        offset += 1;
                    }
                    Param2::MemReg => {
                        let (addr, len) = Addr::decode(&bytes[offset..])?;
                        offset += len;
                        let r = Register::decode(*bytes.get(offset)?, Width::W64)?;
                        offset += 1;
                        operands.push(Operand::Mem(addr));
                        operands.push(Operand::Reg(r));
                    }
                    Param2::RegMem => {
                        let r = Register::decode(*bytes.get(offset)?, Width::W64)?;
                        offset += 1;
                        let (addr, len) = Addr::decode(&bytes[offset..])?;
                        offset += len;
                        operands.push(Operand::Reg(r));
                        operands.push(Operand::Mem(addr));
                    }
                    Param2::MemMem => {
                        let (a1, l1) = Addr::decode(&bytes[offset..])?;
                        offset += l1;
                        let (a2, l2) = Addr::decode(&bytes[offset..])?;
                        offset += l2;
                        operands.push(Operand::Mem(a1));
                        operands.push(Operand::Mem(a2));
                    }
                    Param2::RegImm => {
                        let r = Register::decode(*bytes.get(offset)?, Width::W64)?;
                        offset += 1;
                        let imm = Imm::decode(&bytes[offset..], width, opcode.is_float())?;
                        offset += width.bytes();
                        operands.push(Operand::Reg(r));
                        operands.push(Operand::Imm(imm));
                    }
                    Param2::MemImm => {
                        let (addr, len) = Addr::decode(&bytes[offset..])?;
                        offset += len;
                        let imm = Imm::decode(&bytes[offset..], width, opcode.is_float())?;
                        offset += width.bytes();
                        operands.push(Operand::Mem(addr));
                        operands.push(Operand::Imm(imm));
                    }
                }
            }
        }
        Some(Instruction { opcode, width, operands, len: offset })
    }
}

/// The bytecode buffer under construction. Holds the raw byte stream, a
/// table from [`LabelId`] to resolved offset, and the list of operand
/// sites that referenced a label before it was defined.
#[derive(Default)]
pub struct Program {
    pub code: Vec<u8>,
    next_label: usize,
    resolved: HashMap<LabelId, i64>,
    pending: Vec<(usize, LabelId)>,
}

impl Program {
    pub fn new() -> Program {
        Program { code: Vec::new(), next_label: 0, resolved: HashMap::new(), pending: Vec::new() }
    }

    pub fn here(&self) -> usize {
        self.code.len()
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Pins `label` to the buffer's current end. Emitting a declaration's
    /// body starts with this, so every earlier forward reference to it
    /// resolves once [`Program::backpatch`] runs.
    pub fn define_label(&mut self, label: LabelId) {
        self.resolved.insert(label, self.here() as i64);
    }

    pub fn emit0(&mut self, opcode: Opcode) {
        let header = opcode.encode(0, Width::None);
        self.code.extend_from_slice(&header.to_le_bytes());
    }

    /// Emits a 1-operand instruction whose operand is a register, memory
    /// location, or immediate. Jump/call targets go through
    /// [`Program::emit_jump`] instead, since a label isn't resolved yet at
    /// the point it's emitted.
    pub fn emit1(&mut self, opcode: Opcode, operand: &Operand, width: Width) {
        let header = opcode.encode(operand.shape1() as u8, width);
        self.code.extend_from_slice(&header.to_le_bytes());
        operand.encode(width, &mut self.code);
    }

    pub fn emit2(&mut self, opcode: Opcode, dst: &Operand, src: &Operand, width: Width) {
        let header = opcode.encode(Operand::shape2(dst, src) as u8, width);
        self.code.extend_from_slice(&header.to_le_bytes());
        match (dst, src) {
            (Operand::Reg(d), Operand::Reg(s)) => Operand::encode_pair(*d, *s, &mut self.code),
            _ => {
                dst.encode(width, &mut self.code);
                src.encode(width, &mut self.code);
            }
        }
    }

    /// Emits a 1-operand jump/call targeting `label`, recording a patch
    /// site for [`Program::backpatch`] to fill in once the label's
    /// offset is known. Used for `JMP`, every conditional jump, and
    /// `CALL`.
    pub fn emit_jump(&mut self, opcode: Opcode, label: LabelId) {
        let header = opcode.encode(Param1::Label as u8, Width::None);
        self.code.extend_from_slice(&header.to_le_bytes());
        let patch_at = self.here();
        self.pending.push((patch_at, label));
        self.code.extend_from_slice(&0i64.to_le_bytes());
    }

    /// Resolves every pending label reference against the offsets
    /// `define_label` recorded, writing the final absolute offset into
    /// each patch site. Must run after the whole program has been
    /// emitted, once every label referenced has also been defined.
    pub fn backpatch(&mut self) -> Result<(), UnresolvedLabel> {
        for (at, label) in &self.pending {
            let target = *self.resolved.get(label).ok_or(UnresolvedLabel(*label))?;
            self.code[*at..*at + 8].copy_from_slice(&target.to_le_bytes());
        }
        Ok(())
    }

    /// A human-readable listing of the encoded instruction stream, the
    /// supplemented debugging affordance SPEC_FULL.md §3 calls for. Not
    /// used by the VM itself.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut offset = 0usize;
        while offset < self.code.len() {
            let Some(inst) = Instruction::decode(&self.code[offset..]) else {
                out.push_str(&format!("{offset:06x}: <invalid>\n"));
                break;
            };
            out.push_str(&format!("{offset:06x}: {}", inst.opcode.name()));
            for (i, operand) in inst.operands.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                out.push_str(&operand_to_string(operand));
            }
            out.push('\n');
            offset += inst.len;
        }
        out
    }
}

fn operand_to_string(operand: &Operand) -> String {
    match operand {
        Operand::Reg(r) => r.name().to_string(),
        Operand::Mem(addr) => format!("{addr:?}"),
        Operand::Imm(Imm::Int(v)) => v.to_string(),
        Operand::Imm(Imm::Float(v)) => v.to_string(),
        Operand::Label(offset) => format!("@{offset:#x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register::*;

    #[test]
    fn emit_and_decode_a_reg_reg_instruction() {
        let mut prog = Program::new();
        prog.emit2(Opcode::Add, &Operand::Reg(A), &Operand::Reg(B), Width::W64);
        let inst = Instruction::decode(&prog.code).unwrap();
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(inst.operands, vec![Operand::Reg(A), Operand::Reg(B)]);
        assert_eq!(inst.len, prog.code.len());
    }

    #[test]
    fn emit_and_decode_a_reg_imm_instruction() {
        let mut prog = Program::new();
        prog.emit2(Opcode::Mov, &Operand::Reg(A), &Operand::Imm(Imm::Int(42)), Width::W32);
        let inst = Instruction::decode(&prog.code).unwrap();
        assert_eq!(inst.operands, vec![Operand::Reg(A), Operand::Imm(Imm::Int(42))]);
    }

    #[test]
    fn forward_label_reference_backpatches_to_the_defined_offset() {
        let mut prog = Program::new();
        let label = prog.new_label();
        prog.emit_jump(Opcode::Jmp, label);
        let target_offset = prog.here();
        prog.emit0(Opcode::Hlt);
        prog.define_label(label);
        prog.backpatch().unwrap();

        let inst = Instruction::decode(&prog.code).unwrap();
        assert_eq!(inst.operands, vec![Operand::Label(target_offset as i64)]);
    }

    #[test]
    fn backpatch_fails_loudly_for_an_undefined_label() {
        let mut prog = Program::new();
        let label = prog.new_label();
        prog.emit_jump(Opcode::Jmp, label);
        assert!(prog.backpatch().is_err());
    }

    #[test]
    fn disassemble_renders_one_line_per_instruction() {
        let mut prog = Program::new();
        prog.emit2(Opcode::Mov, &Operand::Reg(A), &Operand::Imm(Imm::Int(3)), Width::W32);
        prog.emit0(Opcode::Hlt);
        let text = prog.disassemble();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("MOV"));
        assert!(text.contains("HLT"));
    }
}
