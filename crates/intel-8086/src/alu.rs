//! Flag algebra: arithmetic and logic with 8086 flag semantics.
//!
//! Everything here is pure. Each operation returns the truncated result,
//! the new flag bits and the mask of flags the operation defines; the caller
//! merges with `Flags::assign(affected, flags)`.

use crate::flags::{AF, CF, OF, PARITY, PF, SF, STATUS, ZF};

/// Operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    /// Decode the `w` bit of an opcode.
    #[must_use]
    pub const fn from_w(opcode: u8) -> Self {
        if opcode & 1 == 0 { Self::Byte } else { Self::Word }
    }

    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
        }
    }

    #[must_use]
    pub const fn sign_bit(self) -> u32 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Byte => 8,
            Self::Word => 16,
        }
    }

    /// Sign-extend a value of this width to 32 bits.
    #[must_use]
    pub const fn sign_extend(self, value: u32) -> i32 {
        match self {
            Self::Byte => value as u8 as i8 as i32,
            Self::Word => value as u16 as i16 as i32,
        }
    }
}

/// Result of an ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u16,
    pub flags: u16,
    pub affected: u16,
}

impl AluResult {
    const fn new(value: u32, flags: u16, affected: u16) -> Self {
        Self {
            value: value as u16,
            flags,
            affected,
        }
    }
}

#[must_use]
pub const fn zero(width: Width, result: u32) -> bool {
    result & width.mask() == 0
}

#[must_use]
pub const fn sign(width: Width, result: u32) -> bool {
    result & width.sign_bit() != 0
}

/// Even parity of the low byte, folded with the high byte's parity for words.
#[must_use]
pub fn parity(width: Width, result: u32) -> bool {
    let low = PARITY[(result & 0xFF) as usize];
    match width {
        Width::Byte => low,
        Width::Word => low == PARITY[((result >> 8) & 0xFF) as usize],
    }
}

/// Carry or borrow out of bit 3.
#[must_use]
pub const fn auxiliary(a: u32, b: u32, result: u32) -> bool {
    (a ^ b ^ result) & 0x10 != 0
}

/// Carry out of the top bit. `result` is the untruncated sum, or the
/// wrapping 32-bit difference for subtraction.
#[must_use]
pub const fn carry(width: Width, result: u32) -> bool {
    result & (width.mask() + 1) != 0
}

#[must_use]
pub const fn overflow_add(width: Width, a: u32, b: u32, result: u32) -> bool {
    (a ^ result) & (b ^ result) & width.sign_bit() != 0
}

#[must_use]
pub const fn overflow_sub(width: Width, a: u32, b: u32, result: u32) -> bool {
    (a ^ b) & (a ^ result) & width.sign_bit() != 0
}

/// SF, ZF and PF for a result.
#[must_use]
pub fn szp(width: Width, result: u32) -> u16 {
    let mut f = 0;
    if sign(width, result) {
        f |= SF;
    }
    if zero(width, result) {
        f |= ZF;
    }
    if parity(width, result) {
        f |= PF;
    }
    f
}

const fn bit(condition: bool, flag: u16) -> u16 {
    if condition { flag } else { 0 }
}

/// ADD / ADC.
#[must_use]
pub fn add(width: Width, a: u16, b: u16, carry_in: bool) -> AluResult {
    let (a, b) = (u32::from(a) & width.mask(), u32::from(b) & width.mask());
    let r = a + b + u32::from(carry_in);
    let flags = szp(width, r)
        | bit(carry(width, r), CF)
        | bit(auxiliary(a, b, r), AF)
        | bit(overflow_add(width, a, b, r), OF);
    AluResult::new(r & width.mask(), flags, STATUS)
}

/// SUB / SBB / CMP / NEG.
#[must_use]
pub fn sub(width: Width, a: u16, b: u16, borrow_in: bool) -> AluResult {
    let (a, b) = (u32::from(a) & width.mask(), u32::from(b) & width.mask());
    let r = a.wrapping_sub(b).wrapping_sub(u32::from(borrow_in));
    let flags = szp(width, r)
        | bit(carry(width, r), CF)
        | bit(auxiliary(a, b, r), AF)
        | bit(overflow_sub(width, a, b, r), OF);
    AluResult::new(r & width.mask(), flags, STATUS)
}

/// AND / OR / XOR / TEST: OF, CF and AF cleared.
#[must_use]
pub fn logic(width: Width, result: u16) -> AluResult {
    let r = u32::from(result) & width.mask();
    AluResult::new(r, szp(width, r), STATUS)
}

/// INC: CF untouched.
#[must_use]
pub fn inc(width: Width, a: u16) -> AluResult {
    let mut res = add(width, a, 1, false);
    res.affected &= !CF;
    res.flags &= !CF;
    res
}

/// DEC: CF untouched.
#[must_use]
pub fn dec(width: Width, a: u16) -> AluResult {
    let mut res = sub(width, a, 1, false);
    res.affected &= !CF;
    res.flags &= !CF;
    res
}

/// The eight operations selected by the reg field of the shift group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Rol,
    Ror,
    Rcl,
    Rcr,
    Shl,
    Shr,
    Sar,
}

impl ShiftOp {
    /// Decode the group 2 reg field. Encoding 6 is an alias of SHL.
    #[must_use]
    pub const fn from_reg(reg: u8) -> Self {
        match reg & 7 {
            0 => Self::Rol,
            1 => Self::Ror,
            2 => Self::Rcl,
            3 => Self::Rcr,
            4 | 6 => Self::Shl,
            5 => Self::Shr,
            _ => Self::Sar,
        }
    }
}

/// Shift or rotate `value` by `count` (already masked by the caller where the
/// model masks counts). `carry_in` is the current CF.
#[must_use]
pub fn shift(width: Width, op: ShiftOp, value: u16, count: u8, carry_in: bool) -> AluResult {
    let mask = width.mask();
    let top = width.sign_bit();
    let mut v = u32::from(value) & mask;
    if count == 0 {
        return AluResult::new(v, 0, 0);
    }
    let mut cf = carry_in;
    let original = v;
    for _ in 0..count {
        match op {
            ShiftOp::Rol => {
                cf = v & top != 0;
                v = ((v << 1) | u32::from(cf)) & mask;
            }
            ShiftOp::Ror => {
                cf = v & 1 != 0;
                v = (v >> 1) | if cf { top } else { 0 };
            }
            ShiftOp::Rcl => {
                let out = v & top != 0;
                v = ((v << 1) | u32::from(cf)) & mask;
                cf = out;
            }
            ShiftOp::Rcr => {
                let out = v & 1 != 0;
                v = (v >> 1) | if cf { top } else { 0 };
                cf = out;
            }
            ShiftOp::Shl => {
                cf = v & top != 0;
                v = (v << 1) & mask;
            }
            ShiftOp::Shr => {
                cf = v & 1 != 0;
                v >>= 1;
            }
            ShiftOp::Sar => {
                cf = v & 1 != 0;
                v = (v >> 1) | (v & top);
            }
        }
    }
    let msb = v & top != 0;
    let next = v & (top >> 1) != 0;
    let of = match op {
        ShiftOp::Rol | ShiftOp::Rcl | ShiftOp::Shl => msb != cf,
        ShiftOp::Ror | ShiftOp::Rcr => msb != next,
        ShiftOp::Shr => original & top != 0,
        ShiftOp::Sar => false,
    };
    let mut flags = bit(cf, CF) | bit(of, OF);
    let mut affected = CF | OF;
    if matches!(op, ShiftOp::Shl | ShiftOp::Shr | ShiftOp::Sar) {
        flags |= szp(width, v);
        affected |= SF | ZF | PF;
    }
    AluResult::new(v, flags, affected)
}

/// Unsigned multiply. Returns the double-width product; CF and OF are set
/// when the upper half is non-zero.
#[must_use]
pub fn mul(width: Width, a: u16, b: u16) -> (u32, AluResult) {
    let product = (u32::from(a) & width.mask()) * (u32::from(b) & width.mask());
    let high = product >> width.bits() != 0;
    let flags = bit(high, CF | OF) | szp(width, product);
    (product, AluResult::new(product, flags, CF | OF | SF | ZF | PF))
}

/// Signed multiply. CF and OF are set when the product does not fit the
/// operand width.
#[must_use]
pub fn imul(width: Width, a: u16, b: u16) -> (u32, AluResult) {
    let product = width.sign_extend(u32::from(a)) * width.sign_extend(u32::from(b));
    let truncated = width.sign_extend(product as u32);
    let flags = bit(truncated != product, CF | OF) | szp(width, product as u32);
    (
        product as u32,
        AluResult::new(product as u32, flags, CF | OF | SF | ZF | PF),
    )
}

/// DAA on AL.
#[must_use]
pub fn daa(al: u8, flags: u16) -> AluResult {
    let old_al = al;
    let old_cf = flags & CF != 0;
    let mut al = al;
    let mut cf = false;
    let mut af = false;
    if al & 0x0F > 9 || flags & AF != 0 {
        let (sum, carried) = al.overflowing_add(6);
        al = sum;
        cf = old_cf || carried;
        af = true;
    }
    if old_al > 0x99 || old_cf {
        al = al.wrapping_add(0x60);
        cf = true;
    }
    let f = szp(Width::Byte, u32::from(al)) | bit(cf, CF) | bit(af, AF);
    AluResult::new(u32::from(al), f, CF | AF | SF | ZF | PF)
}

/// DAS on AL.
#[must_use]
pub fn das(al: u8, flags: u16) -> AluResult {
    let old_al = al;
    let old_cf = flags & CF != 0;
    let mut al = al;
    let mut cf = false;
    let mut af = false;
    if al & 0x0F > 9 || flags & AF != 0 {
        cf = old_cf || al < 6;
        al = al.wrapping_sub(6);
        af = true;
    }
    if old_al > 0x99 || old_cf {
        al = al.wrapping_sub(0x60);
        cf = true;
    }
    let f = szp(Width::Byte, u32::from(al)) | bit(cf, CF) | bit(af, AF);
    AluResult::new(u32::from(al), f, CF | AF | SF | ZF | PF)
}

/// AAA on AX.
#[must_use]
pub fn aaa(ax: u16, flags: u16) -> AluResult {
    let (mut al, mut ah) = (ax as u8, (ax >> 8) as u8);
    let adjust = al & 0x0F > 9 || flags & AF != 0;
    if adjust {
        al = al.wrapping_add(6);
        ah = ah.wrapping_add(1);
    }
    let value = (u32::from(ah) << 8) | u32::from(al & 0x0F);
    AluResult::new(value, bit(adjust, AF | CF), AF | CF)
}

/// AAS on AX.
#[must_use]
pub fn aas(ax: u16, flags: u16) -> AluResult {
    let (mut al, mut ah) = (ax as u8, (ax >> 8) as u8);
    let adjust = al & 0x0F > 9 || flags & AF != 0;
    if adjust {
        al = al.wrapping_sub(6);
        ah = ah.wrapping_sub(1);
    }
    let value = (u32::from(ah) << 8) | u32::from(al & 0x0F);
    AluResult::new(value, bit(adjust, AF | CF), AF | CF)
}

/// AAM: split AL into AH = AL / base, AL = AL % base. `base` must be
/// non-zero; the caller raises the divide error.
#[must_use]
pub fn aam(al: u8, base: u8) -> AluResult {
    let (ah, al) = (al / base, al % base);
    let value = (u32::from(ah) << 8) | u32::from(al);
    AluResult::new(value, szp(Width::Byte, u32::from(al)), SF | ZF | PF)
}

/// AAD: fold AH into AL as AL + AH * base, clearing AH.
#[must_use]
pub fn aad(ax: u16, base: u8) -> AluResult {
    let al = (ax as u8).wrapping_add(((ax >> 8) as u8).wrapping_mul(base));
    AluResult::new(u32::from(al), szp(Width::Byte, u32::from(al)), SF | ZF | PF)
}
