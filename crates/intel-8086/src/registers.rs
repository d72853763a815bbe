//! 8086-family register file.

use crate::flags::Flags;

/// General registers in instruction-encoding order.
pub const AX: usize = 0;
pub const CX: usize = 1;
pub const DX: usize = 2;
pub const BX: usize = 3;
pub const SP: usize = 4;
pub const BP: usize = 5;
pub const SI: usize = 6;
pub const DI: usize = 7;

/// Segment register, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Es = 0,
    Cs = 1,
    Ss = 2,
    Ds = 3,
}

impl Segment {
    /// Decode the two-bit segment field of an instruction.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Es,
            1 => Self::Cs,
            2 => Self::Ss,
            _ => Self::Ds,
        }
    }

    /// Checked conversion from a raw index.
    ///
    /// Out-of-range indices are a caller bug; they are logged and refused.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=3 => Some(Self::from_bits(index as u8)),
            _ => {
                log::error!("invalid segment selector {index}");
                None
            }
        }
    }
}

/// Register that can supply the offset half of a linear address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetRegister {
    Ip,
    Si,
    Di,
    Bp,
    Sp,
}

impl OffsetRegister {
    /// Checked conversion from a raw index (IP, SI, DI, BP, SP).
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Ip),
            1 => Some(Self::Si),
            2 => Some(Self::Di),
            3 => Some(Self::Bp),
            4 => Some(Self::Sp),
            _ => {
                log::error!("invalid offset selector {index}");
                None
            }
        }
    }
}

/// GDTR/IDTR contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescriptorTable {
    /// 24-bit linear base.
    pub base: u32,
    pub limit: u16,
}

/// A selector with its hidden descriptor cache (LDTR, TR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentCache {
    pub selector: u16,
    pub base: u32,
    pub limit: u16,
    pub access: u8,
}

/// 8086-family CPU register set.
///
/// AX, CX, DX and BX each hold a single 16-bit cell; the byte registers
/// AL/AH, CL/CH, DL/DH and BL/BH are views onto the low and high halves of
/// those cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// AX, CX, DX, BX, SP, BP, SI, DI.
    pub gp: [u16; 8],
    /// ES, CS, SS, DS.
    pub seg: [u16; 4],
    /// Instruction pointer.
    pub ip: u16,
    pub flags: Flags,
    /// Machine status word (80286).
    pub msw: u16,
    pub gdtr: DescriptorTable,
    pub idtr: DescriptorTable,
    pub ldtr: SegmentCache,
    pub tr: SegmentCache,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Create a zeroed register file with FLAGS at its power-up value.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gp: [0; 8],
            seg: [0; 4],
            ip: 0,
            flags: Flags::RESET,
            msw: 0,
            gdtr: DescriptorTable { base: 0, limit: 0 },
            idtr: DescriptorTable {
                base: 0,
                limit: 0x03FF,
            },
            ldtr: SegmentCache {
                selector: 0,
                base: 0,
                limit: 0,
                access: 0,
            },
            tr: SegmentCache {
                selector: 0,
                base: 0,
                limit: 0,
                access: 0,
            },
        }
    }

    /// 16-bit register by encoding (0-7).
    #[must_use]
    pub const fn reg16(&self, index: u8) -> u16 {
        self.gp[(index & 7) as usize]
    }

    pub fn set_reg16(&mut self, index: u8, value: u16) {
        self.gp[usize::from(index & 7)] = value;
    }

    /// 8-bit register by encoding: 0-3 are AL, CL, DL, BL; 4-7 are AH, CH,
    /// DH, BH.
    #[must_use]
    pub const fn reg8(&self, index: u8) -> u8 {
        let cell = self.gp[(index & 3) as usize];
        if index & 4 == 0 {
            cell as u8
        } else {
            (cell >> 8) as u8
        }
    }

    pub fn set_reg8(&mut self, index: u8, value: u8) {
        let cell = &mut self.gp[usize::from(index & 3)];
        if index & 4 == 0 {
            *cell = (*cell & 0xFF00) | u16::from(value);
        } else {
            *cell = (*cell & 0x00FF) | (u16::from(value) << 8);
        }
    }

    #[must_use]
    pub const fn seg(&self, segment: Segment) -> u16 {
        self.seg[segment as usize]
    }

    pub fn set_seg(&mut self, segment: Segment, value: u16) {
        self.seg[segment as usize] = value;
    }

    /// Current value of an offset register.
    #[must_use]
    pub const fn offset(&self, offset: OffsetRegister) -> u16 {
        match offset {
            OffsetRegister::Ip => self.ip,
            OffsetRegister::Si => self.gp[SI],
            OffsetRegister::Di => self.gp[DI],
            OffsetRegister::Bp => self.gp[BP],
            OffsetRegister::Sp => self.gp[SP],
        }
    }

    #[must_use]
    pub const fn ax(&self) -> u16 {
        self.gp[AX]
    }

    pub fn set_ax(&mut self, value: u16) {
        self.gp[AX] = value;
    }

    #[must_use]
    pub const fn al(&self) -> u8 {
        self.reg8(0)
    }

    pub fn set_al(&mut self, value: u8) {
        self.set_reg8(0, value);
    }

    #[must_use]
    pub const fn ah(&self) -> u8 {
        self.reg8(4)
    }

    pub fn set_ah(&mut self, value: u8) {
        self.set_reg8(4, value);
    }

    #[must_use]
    pub const fn cx(&self) -> u16 {
        self.gp[CX]
    }

    pub fn set_cx(&mut self, value: u16) {
        self.gp[CX] = value;
    }

    #[must_use]
    pub const fn cl(&self) -> u8 {
        self.reg8(1)
    }

    #[must_use]
    pub const fn dx(&self) -> u16 {
        self.gp[DX]
    }

    pub fn set_dx(&mut self, value: u16) {
        self.gp[DX] = value;
    }

    #[must_use]
    pub const fn bx(&self) -> u16 {
        self.gp[BX]
    }

    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.gp[SP]
    }

    pub fn set_sp(&mut self, value: u16) {
        self.gp[SP] = value;
    }

    #[must_use]
    pub const fn bp(&self) -> u16 {
        self.gp[BP]
    }

    #[must_use]
    pub const fn si(&self) -> u16 {
        self.gp[SI]
    }

    pub fn set_si(&mut self, value: u16) {
        self.gp[SI] = value;
    }

    #[must_use]
    pub const fn di(&self) -> u16 {
        self.gp[DI]
    }

    pub fn set_di(&mut self, value: u16) {
        self.gp[DI] = value;
    }

    #[must_use]
    pub const fn cs(&self) -> u16 {
        self.seg[Segment::Cs as usize]
    }

    #[must_use]
    pub const fn ss(&self) -> u16 {
        self.seg[Segment::Ss as usize]
    }

    #[must_use]
    pub const fn ds(&self) -> u16 {
        self.seg[Segment::Ds as usize]
    }

    #[must_use]
    pub const fn es(&self) -> u16 {
        self.seg[Segment::Es as usize]
    }
}
