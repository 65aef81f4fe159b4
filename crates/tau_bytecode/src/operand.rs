//! Instruction operands and their on-the-wire encoding (§6.2, §6.3).
//!
//! An instruction's header carries an opcode and a [`crate::opcode::Param1`]/
//! [`crate::opcode::Param2`] shape tag; the operand bytes that follow are
//! laid out per that shape, grounded on `original_source/src/tasm.c`'s
//! `tasm_write_*` helpers: two register operands share one byte (one
//! nibble each), a lone register gets its own byte, a memory operand is
//! whatever [`crate::addr::Addr::encode`] writes, and an immediate is the
//! value's raw little-endian bytes at the instruction's declared width. A
//! label operand is a backpatched absolute code offset, written the same
//! way an 8-byte immediate would be.

use crate::addr::Addr;
use crate::opcode::{Param1, Param2, Width};
use crate::register::Register;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imm {
    Int(i64),
    Float(f64),
}

impl Imm {
    fn encode(self, width: Width, out: &mut Vec<u8>) {
        match self {
            Imm::Int(v) => out.extend_from_slice(&v.to_le_bytes()[..width.bytes()]),
            Imm::Float(v) => match width {
                Width::W32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                _ => out.extend_from_slice(&v.to_le_bytes()),
            },
        }
    }

    fn decode(bytes: &[u8], width: Width, float: bool) -> Option<Imm> {
        if float {
            return Some(match width {
                Width::W32 => Imm::Float(f32::from_le_bytes(bytes.get(..4)?.try_into().ok()?) as f64),
                _ => Imm::Float(f64::from_le_bytes(bytes.get(..8)?.try_into().ok()?)),
            });
        }
        let n = width.bytes();
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(bytes.get(..n)?);
        // Sign-extend from the declared width so a narrow negative
        // immediate reads back correctly as `i64`.
        let raw = i64::from_le_bytes(buf);
        let shift = (8 - n) * 8;
        Some(Imm::Int((raw << shift) >> shift))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Reg(Register),
    Mem(Addr),
    Imm(Imm),
    /// A jump/call target. Resolved to an absolute code offset by the
    /// time it reaches the encoder — see `Program::backpatch`.
    Label(i64),
}

impl Operand {
    pub fn shape1(&self) -> Param1 {
        match self {
            Operand::Reg(_) => Param1::Reg,
            Operand::Mem(_) => Param1::Mem,
            Operand::Imm(_) => Param1::Imm,
            Operand::Label(_) => Param1::Label,
        }
    }

    pub fn shape2(dst: &Operand, src: &Operand) -> Param2 {
        match (dst, src) {
            (Operand::Reg(_), Operand::Reg(_)) => Param2::RegReg,
            (Operand::Mem(_), Operand::Reg(_)) => Param2::MemReg,
            (Operand::Reg(_), Operand::Mem(_)) => Param2::RegMem,
            (Operand::Mem(_), Operand::Mem(_)) => Param2::MemMem,
            (Operand::Reg(_), Operand::Imm(_)) => Param2::RegImm,
            (Operand::Mem(_), Operand::Imm(_)) => Param2::MemImm,
            _ => unreachable!("label operands never appear in a 2-operand instruction"),
        }
    }

    /// Appends this operand's bytes to `out`. A lone register gets a
    /// whole byte to itself; call [`Operand::encode_pair`] for the
    /// register-register case, which packs both into one byte.
    pub fn encode(&self, width: Width, out: &mut Vec<u8>) {
        match self {
            Operand::Reg(r) => out.push(r.encode()),
            Operand::Mem(addr) => addr.encode(out),
            Operand::Imm(imm) => imm.encode(width, out),
            Operand::Label(target) => out.extend_from_slice(&target.to_le_bytes()),
        }
    }

    pub fn encode_pair(dst: Register, src: Register, out: &mut Vec<u8>) {
        out.push(((dst.encode() & 0xF) << 4) | (src.encode() & 0xF));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register::*;

    #[test]
    fn immediate_round_trips_each_width() {
        for (value, width) in [(-1i64, Width::W8), (300, Width::W16), (70_000, Width::W32), (i64::MIN, Width::W64)] {
            let mut bytes = Vec::new();
            Imm::Int(value).encode(width, &mut bytes);
            let decoded = Imm::decode(&bytes, width, false).unwrap();
            let truncated = {
                let shift = (8 - width.bytes()) * 8;
                (value << shift) >> shift
            };
            assert_eq!(decoded, Imm::Int(truncated));
        }
    }

    #[test]
    fn float_immediate_round_trips_at_32_and_64_bits() {
        let mut b32 = Vec::new();
        Imm::Float(1.5).encode(Width::W32, &mut b32);
        assert_eq!(Imm::decode(&b32, Width::W32, true).unwrap(), Imm::Float(1.5));

        let mut b64 = Vec::new();
        Imm::Float(2.25).encode(Width::W64, &mut b64);
        assert_eq!(Imm::decode(&b64, Width::W64, true).unwrap(), Imm::Float(2.25));
    }

    #[test]
    fn register_pair_packs_into_one_byte() {
        let mut out = Vec::new();
        Operand::encode_pair(A, B, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0] >> 4, A.encode());
        assert_eq!(out[0] & 0xF, B.encode());
    }

    #[test]
    fn shape2_classifies_every_dst_src_combination() {
        let reg = Operand::Reg(A);
        let mem = Operand::Mem(Addr::base(Bp));
        let imm = Operand::Imm(Imm::Int(1));
        assert_eq!(Operand::shape2(&reg, &reg), Param2::RegReg);
        assert_eq!(Operand::shape2(&mem, &reg), Param2::MemReg);
        assert_eq!(Operand::shape2(&reg, &mem), Param2::RegMem);
        assert_eq!(Operand::shape2(&mem, &mem), Param2::MemMem);
        assert_eq!(Operand::shape2(&reg, &imm), Param2::RegImm);
        assert_eq!(Operand::shape2(&mem, &imm), Param2::MemImm);
    }
}
