//! FLAGS register bits and the 80286 machine status word.

/// Carry.
pub const CF: u16 = 0x0001;
/// Parity (even number of set bits in the low byte).
pub const PF: u16 = 0x0004;
/// Auxiliary carry out of bit 3.
pub const AF: u16 = 0x0010;
/// Zero.
pub const ZF: u16 = 0x0040;
/// Sign.
pub const SF: u16 = 0x0080;
/// Trap (single step).
pub const TF: u16 = 0x0100;
/// Interrupt enable.
pub const IF: u16 = 0x0200;
/// Direction.
pub const DF: u16 = 0x0400;
/// Overflow.
pub const OF: u16 = 0x0800;

/// Bits that exist in the register.
pub const DEFINED: u16 = CF | PF | AF | ZF | SF | TF | IF | DF | OF;
/// Arithmetic result flags.
pub const STATUS: u16 = CF | PF | AF | ZF | SF | OF;

/// Bit 1 always reads as one.
pub const RESERVED_ONE: u16 = 0x0002;
/// Bits 12-15 read as ones on the 8086 and 80186.
pub const HIGH_NIBBLE: u16 = 0xF000;

/// MSW: protection enable.
pub const MSW_PE: u16 = 0x0001;
/// MSW: monitor coprocessor.
pub const MSW_MP: u16 = 0x0002;
/// MSW: emulate coprocessor.
pub const MSW_EM: u16 = 0x0004;
/// MSW: task switched.
pub const MSW_TS: u16 = 0x0008;

/// FLAGS register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(pub u16);

impl Flags {
    /// Power-up value.
    pub const RESET: Self = Self(RESERVED_ONE);

    #[must_use]
    pub const fn is_set(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u16) {
        self.0 &= !flag;
    }

    pub fn set_if(&mut self, flag: u16, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Replace the bits selected by `mask` with those in `value`.
    pub fn assign(&mut self, mask: u16, value: u16) {
        self.0 = (self.0 & !mask) | (value & mask);
    }

    /// Load from a popped or restored image. Undefined bits are dropped.
    pub fn load(&mut self, image: u16) {
        self.0 = (image & DEFINED) | RESERVED_ONE;
    }

    /// The image PUSHF and interrupts write to the stack.
    #[must_use]
    pub const fn image(self, high_set: bool) -> u16 {
        let base = (self.0 & DEFINED) | RESERVED_ONE;
        if high_set { base | HIGH_NIBBLE } else { base }
    }
}

/// Even-parity lookup: entry is true when the byte has an even number of
/// set bits.
pub static PARITY: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() % 2 == 0;
        i += 1;
    }
    table
};
