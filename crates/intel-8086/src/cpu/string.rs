//! String instructions and the repeat prefixes.

use copro_core::ParasiteBus;

use crate::alu::{self, Width};
use crate::decode::OPCODES;
use crate::flags::{DF, ZF};
use crate::registers::{DI, SI, Segment};

use super::{I86, Repeat};

impl I86 {
    /// MOVS CMPS STOS LODS SCAS INS OUTS, repeated while CX is non-zero
    /// under a REP prefix. The whole repeat runs as one instruction.
    pub(super) fn string_op<B: ParasiteBus>(&mut self, bus: &mut B, op: u8) {
        let Some(repeat) = self.prefix.repeat else {
            self.string_iteration(bus, op);
            return;
        };
        let per_iteration = i32::from(OPCODES[usize::from(op)].cycles);
        let compares = matches!(op, 0xA6 | 0xA7 | 0xAE | 0xAF);
        while self.regs.cx() != 0 {
            self.string_iteration(bus, op);
            self.cycles += per_iteration;
            let cx = self.regs.cx().wrapping_sub(1);
            self.regs.set_cx(cx);
            if compares {
                let zf = self.regs.flags.is_set(ZF);
                let stop = match repeat {
                    Repeat::WhileEqual => !zf,
                    Repeat::WhileNotEqual => zf,
                };
                if stop {
                    break;
                }
            }
        }
    }

    fn string_iteration<B: ParasiteBus>(&mut self, bus: &mut B, op: u8) {
        let width = Width::from_w(op);
        let step: u16 = match width {
            Width::Byte => 1,
            Width::Word => 2,
        };
        let delta = if self.regs.flags.is_set(DF) {
            step.wrapping_neg()
        } else {
            step
        };
        let source = self.data_segment(Segment::Ds);
        let si = self.regs.si();
        let di = self.regs.di();

        match op {
            // INSB / INSW
            0x6C | 0x6D => {
                let port = self.regs.dx();
                let value = match width {
                    Width::Byte => u16::from(self.port_in8(bus, port)),
                    Width::Word => self.port_in16(bus, port),
                };
                self.store(bus, Segment::Es, di, width, value);
                self.advance(DI, delta);
            }

            // OUTSB / OUTSW
            0x6E | 0x6F => {
                let port = self.regs.dx();
                let value = self.load(bus, source, si, width);
                match width {
                    Width::Byte => self.port_out8(bus, port, value as u8),
                    Width::Word => self.port_out16(bus, port, value),
                }
                self.advance(SI, delta);
            }

            // MOVSB / MOVSW
            0xA4 | 0xA5 => {
                let value = self.load(bus, source, si, width);
                self.store(bus, Segment::Es, di, width, value);
                self.advance(SI, delta);
                self.advance(DI, delta);
            }

            // CMPSB / CMPSW
            0xA6 | 0xA7 => {
                let a = self.load(bus, source, si, width);
                let b = self.load(bus, Segment::Es, di, width);
                self.apply(alu::sub(width, a, b, false));
                self.advance(SI, delta);
                self.advance(DI, delta);
            }

            // STOSB / STOSW
            0xAA | 0xAB => {
                let value = self.get_register_value(width, 0);
                self.store(bus, Segment::Es, di, width, value);
                self.advance(DI, delta);
            }

            // LODSB / LODSW
            0xAC | 0xAD => {
                let value = self.load(bus, source, si, width);
                self.set_register_value(width, 0, value);
                self.advance(SI, delta);
            }

            // SCASB / SCASW
            _ => {
                let a = self.get_register_value(width, 0);
                let b = self.load(bus, Segment::Es, di, width);
                self.apply(alu::sub(width, a, b, false));
                self.advance(DI, delta);
            }
        }
    }

    fn load<B: ParasiteBus>(&mut self, bus: &mut B, segment: Segment, offset: u16, width: Width) -> u16 {
        match width {
            Width::Byte => u16::from(self.read8(bus, segment, offset)),
            Width::Word => self.read16(bus, segment, offset),
        }
    }

    fn store<B: ParasiteBus>(&mut self, bus: &mut B, segment: Segment, offset: u16, width: Width, value: u16) {
        match width {
            Width::Byte => self.write8(bus, segment, offset, value as u8),
            Width::Word => self.write16(bus, segment, offset, value),
        }
    }

    fn advance(&mut self, index: usize, delta: u16) {
        self.regs.gp[index] = self.regs.gp[index].wrapping_add(delta);
    }
}
