//! Width-generic integer arithmetic with flag computation (§4.7).
//!
//! `original_source/src/vm.c` generates one copy of each operation per
//! width via C preprocessor templates (`template_impl_vm_ADD`, ...). Rust's
//! integer types don't share a common arithmetic trait the way the C
//! macros paper over `uint8_t`/.../`uint64_t`, but every one of those
//! widths is a subrange of `u64`/`i64` whose wraparound and comparisons
//! agree with the narrower type's as long as values are kept masked (for
//! unsigned) or sign-extended (for signed) to their declared width between
//! operations. So every op here is written once, operating on masked `u64`
//! or sign-extended `i64` values plus a `bits` parameter, instead of four
//! times over concrete integer types.

use crate::flags::{parity, Flags};

pub fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Sign-extends the low `bits` bits of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        value as i64
    } else {
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }
}

/// Two's-complement bit pattern of a signed width-`bits` result, ready to
/// store back into a register/memory slot the same way the unsigned ops
/// store theirs.
fn truncate_signed(value: i64, bits: u32) -> u64 {
    (value as u64) & mask(bits)
}

fn signed_bounds(bits: u32) -> (i64, i64) {
    if bits >= 64 {
        (i64::MIN, i64::MAX)
    } else {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    }
}

/// `ADD`/`SUB`/`MUL`/`DIV`/`MOD` (§4.7): unsigned arithmetic. `lhs`/`rhs`
/// are already masked to `bits`. Ported from the `UNSIGNED_BIN_OP`
/// templates — note `ADD` sets only `carry`/`parity`, not `zero`/
/// `negative`, matching the original's narrower `template_impl_vm_ADD`.
pub fn unsigned_add(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let m = mask(bits);
    let result = lhs.wrapping_add(rhs) & m;
    flags.carry = m - lhs < rhs;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_sub(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let m = mask(bits);
    let result = lhs.wrapping_sub(rhs) & m;
    flags.zero = lhs == rhs;
    flags.negative = result >> (bits - 1) != 0;
    flags.carry = lhs < rhs;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_mul(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let m = mask(bits);
    let result = lhs.wrapping_mul(rhs) & m;
    flags.zero = result == 0;
    flags.carry = rhs != 0 && lhs > m / rhs;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_div(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = lhs / rhs;
    flags.zero = lhs == 0;
    flags.carry = lhs % rhs != 0;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_mod(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = lhs % rhs;
    flags.zero = result == 0;
    flags.carry = result != 0;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_and(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = (lhs & rhs) & mask(bits);
    flags.zero = result == 0;
    flags.negative = result >> (bits - 1) != 0;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_or(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = (lhs | rhs) & mask(bits);
    flags.zero = result == 0;
    flags.negative = result >> (bits - 1) != 0;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_xor(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = (lhs ^ rhs) & mask(bits);
    flags.zero = result == 0;
    flags.negative = result >> (bits - 1) != 0;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_not(value: u64, bits: u32, flags: &mut Flags) -> u64 {
    let m = mask(bits);
    let result = !value & m;
    flags.zero = result == m;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_shl(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let m = mask(bits);
    let shifted = if rhs >= bits as u64 { 0 } else { lhs << rhs };
    let result = shifted & m;
    flags.zero = result == 0;
    flags.negative = result >> (bits - 1) != 0;
    flags.carry = lhs > result;
    flags.parity = parity(result, bits);
    result
}

pub fn unsigned_shr(lhs: u64, rhs: u64, bits: u32, flags: &mut Flags) -> u64 {
    let result = if rhs >= bits as u64 { 0 } else { lhs >> rhs };
    flags.zero = result == 0;
    flags.negative = result >> (bits - 1) != 0;
    flags.parity = parity(result, bits);
    result
}

/// `CMP` (§4.7): flags as if `SUB` ran, but no result is stored and
/// `negative`/`parity` are never touched — ported from `template_impl_vm_CMP`.
pub fn unsigned_cmp(lhs: u64, rhs: u64, flags: &mut Flags) {
    flags.zero = lhs == rhs;
    flags.carry = lhs < rhs;
}

/// `IADD`/`ISUB`/.../`INEG` (§4.7): signed arithmetic. `lhs`/`rhs` arrive
/// already sign-extended to `i64`; the result is truncated back to `bits`
/// two's-complement bits for storage. Overflow predicates are the exact
/// boundary-crossing tests from `template_impl_vm_IADD` and friends, not
/// a generic "did the i64 math overflow" check — they must be evaluated
/// against the declared width's own MIN/MAX, not `i64`'s.
pub fn signed_add(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) -> u64 {
    let (min, max) = signed_bounds(bits);
    let result = lhs.wrapping_add(rhs);
    flags.zero = result == 0;
    flags.negative = result < 0;
    flags.overflow = (rhs > 0 && lhs > max - rhs) || (rhs < 0 && lhs < min - rhs);
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

pub fn signed_sub(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) -> u64 {
    let (min, max) = signed_bounds(bits);
    let result = lhs.wrapping_sub(rhs);
    flags.zero = result == 0;
    flags.negative = result < 0;
    flags.overflow = (rhs > 0 && lhs < min + rhs) || (rhs < 0 && lhs > max + rhs);
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

pub fn signed_mul(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) -> u64 {
    let (min, max) = signed_bounds(bits);
    let result = lhs.wrapping_mul(rhs);
    flags.zero = result == 0;
    flags.negative = result < 0;
    flags.overflow = (lhs > 0 && ((rhs > 0 && lhs > max / rhs) || (rhs < 0 && rhs < min / lhs)))
        || (lhs < 0 && ((rhs > 0 && lhs < min / rhs) || (rhs < 0 && (lhs != -1 || rhs != min) && rhs < max / lhs)));
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

pub fn signed_div(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) -> u64 {
    let (min, _max) = signed_bounds(bits);
    let result = lhs.wrapping_div(rhs);
    flags.zero = lhs == 0;
    flags.negative = (lhs < 0) != (rhs < 0);
    flags.overflow = rhs == 0 || (lhs == min && rhs == -1);
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

pub fn signed_mod(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) -> u64 {
    let (min, _max) = signed_bounds(bits);
    let result = lhs.wrapping_rem(rhs);
    flags.zero = result == 0;
    flags.negative = result < 0;
    flags.overflow = lhs == min && rhs == -1;
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

pub fn signed_neg(value: i64, bits: u32, flags: &mut Flags) -> u64 {
    let result = value.wrapping_neg();
    flags.zero = value == 0;
    flags.negative = value > 0;
    flags.parity = parity(truncate_signed(result, bits), bits);
    truncate_signed(result, bits)
}

/// `ICMP` (§4.7): flags as if `ISUB` ran, but no result is stored and
/// `parity` is never touched — ported from `template_impl_vm_ICMP`.
pub fn signed_cmp(lhs: i64, rhs: i64, bits: u32, flags: &mut Flags) {
    let (min, max) = signed_bounds(bits);
    flags.zero = lhs == rhs;
    flags.negative = lhs - rhs < 0;
    flags.overflow = (rhs > 0 && lhs < min + rhs) || (rhs < 0 && lhs > max + rhs);
    flags.carry = lhs < rhs;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_add_sets_only_carry_and_parity() {
        let mut flags = Flags::default();
        let result = unsigned_add(0xFF, 1, 8, &mut flags);
        assert_eq!(result, 0);
        assert!(flags.carry);
        assert!(!flags.zero);
        assert!(!flags.negative);
    }

    #[test]
    fn unsigned_sub_sets_carry_on_borrow() {
        let mut flags = Flags::default();
        let result = unsigned_sub(0, 1, 8, &mut flags);
        assert_eq!(result, 0xFF);
        assert!(flags.carry);
        assert!(flags.negative);
    }

    #[test]
    fn signed_add_detects_overflow_at_the_narrow_width() {
        let mut flags = Flags::default();
        let lhs = sign_extend(0x7F, 8);
        let result = signed_add(lhs, 1, 8, &mut flags);
        assert_eq!(result, 0x80);
        assert!(flags.overflow);
        assert!(flags.negative);
    }

    #[test]
    fn signed_div_overflows_only_at_min_over_negative_one() {
        let mut flags = Flags::default();
        signed_div(sign_extend(0x7FFF_FFFF, 32), -1, 32, &mut flags);
        assert!(!flags.overflow);
        let mut flags2 = Flags::default();
        signed_div(sign_extend(0x8000_0000, 32), -1, 32, &mut flags2);
        assert!(flags2.overflow);
    }

    #[test]
    fn sign_extend_round_trips_a_negative_byte() {
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x80, 8), -128);
    }
}
