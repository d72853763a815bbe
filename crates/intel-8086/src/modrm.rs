//! ModRM decoding and operand access.

use copro_core::ParasiteBus;

use crate::alu::Width;
use crate::cpu::I86;
use crate::registers::{BP, BX, DI, SI, Segment};

/// A decoded ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    /// Addressing mode, bits 7-6.
    pub mode: u8,
    /// Register or sub-operation, bits 5-3.
    pub reg: u8,
    /// Register or memory form, bits 2-0.
    pub rm: u8,
}

impl ModRm {
    #[must_use]
    pub const fn new(byte: u8) -> Self {
        Self {
            mode: byte >> 6,
            reg: (byte >> 3) & 7,
            rm: byte & 7,
        }
    }

    /// Mode 3 names a register, never memory.
    #[must_use]
    pub const fn is_register(self) -> bool {
        self.mode == 3
    }

    /// Mode 0 with rm 6 is a bare 16-bit displacement.
    #[must_use]
    pub const fn is_direct(self) -> bool {
        self.mode == 0 && self.rm == 6
    }

    /// Segment used when no override prefix is active.
    #[must_use]
    pub const fn default_segment(self) -> Segment {
        match self.rm {
            2 | 3 => Segment::Ss,
            6 if self.mode != 0 => Segment::Ss,
            _ => Segment::Ds,
        }
    }

    /// Effective-address calculation time.
    #[must_use]
    pub const fn ea_cycles(self) -> i32 {
        if self.is_register() {
            return 0;
        }
        if self.is_direct() {
            return 6;
        }
        let base = match self.rm {
            0 | 3 => 7,
            1 | 2 => 8,
            _ => 5,
        };
        if self.mode == 0 { base } else { base + 4 }
    }
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Register by encoding, interpreted at the access width.
    Register(u8),
    /// Memory at segment:offset.
    Memory { segment: Segment, offset: u16 },
}

impl I86 {
    pub(crate) fn fetch_modrm<B: ParasiteBus>(&mut self, bus: &mut B) -> ModRm {
        ModRm::new(self.fetch8(bus))
    }

    /// Base plus index for a memory form, before displacement.
    fn base_index(&self, rm: u8) -> u16 {
        let r = &self.regs.gp;
        match rm & 7 {
            0 => r[BX].wrapping_add(r[SI]),
            1 => r[BX].wrapping_add(r[DI]),
            2 => r[BP].wrapping_add(r[SI]),
            3 => r[BP].wrapping_add(r[DI]),
            4 => r[SI],
            5 => r[DI],
            6 => r[BP],
            _ => r[BX],
        }
    }

    /// Resolve a ModRM byte, consuming any displacement that follows it.
    pub(crate) fn resolve<B: ParasiteBus>(&mut self, bus: &mut B, modrm: ModRm) -> Operand {
        if modrm.is_register() {
            return Operand::Register(modrm.rm);
        }
        self.cycles += modrm.ea_cycles();
        let offset = if modrm.is_direct() {
            self.fetch16(bus)
        } else {
            let displacement = match modrm.mode {
                1 => self.fetch8(bus) as i8 as u16,
                2 => self.fetch16(bus),
                _ => 0,
            };
            self.base_index(modrm.rm).wrapping_add(displacement)
        };
        Operand::Memory {
            segment: self.data_segment(modrm.default_segment()),
            offset,
        }
    }

    /// Resolve a form that must address memory. Register forms yield `None`.
    pub(crate) fn resolve_memory<B: ParasiteBus>(
        &mut self,
        bus: &mut B,
        modrm: ModRm,
    ) -> Option<(Segment, u16)> {
        match self.resolve(bus, modrm) {
            Operand::Memory { segment, offset } => Some((segment, offset)),
            Operand::Register(_) => None,
        }
    }

    pub(crate) fn get_operand_value<B: ParasiteBus>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        width: Width,
    ) -> u16 {
        match operand {
            Operand::Register(index) => self.get_register_value(width, index),
            Operand::Memory { segment, offset } => match width {
                Width::Byte => u16::from(self.read8(bus, segment, offset)),
                Width::Word => self.read16(bus, segment, offset),
            },
        }
    }

    pub(crate) fn set_operand_value<B: ParasiteBus>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        width: Width,
        value: u16,
    ) {
        match operand {
            Operand::Register(index) => self.set_register_value(width, index, value),
            Operand::Memory { segment, offset } => match width {
                Width::Byte => self.write8(bus, segment, offset, value as u8),
                Width::Word => self.write16(bus, segment, offset, value),
            },
        }
    }

    pub(crate) fn get_register_value(&self, width: Width, index: u8) -> u16 {
        match width {
            Width::Byte => u16::from(self.regs.reg8(index)),
            Width::Word => self.regs.reg16(index),
        }
    }

    pub(crate) fn set_register_value(&mut self, width: Width, index: u8, value: u16) {
        match width {
            Width::Byte => self.regs.set_reg8(index, value as u8),
            Width::Word => self.regs.set_reg16(index, value),
        }
    }
}
