//! Instruction execution for the 8086 family.

#![allow(clippy::too_many_lines)]

use copro_core::ParasiteBus;

use crate::alu::{self, AluResult, ShiftOp, Width};
use crate::decode::{Class, OPCODES, group_op};
use crate::flags::{AF, CF, DF, IF, MSW_MP, MSW_EM, MSW_TS, OF, PF, SF, ZF};
use crate::interrupt;
use crate::model::Isa;
use crate::modrm::{ModRm, Operand};
use crate::registers::{AX, BP, DX, SP, Segment};

use super::I86;

impl I86 {
    /// Merge an ALU result into FLAGS.
    pub(crate) fn apply(&mut self, result: AluResult) {
        self.regs.flags.assign(result.affected, result.flags);
    }

    /// One of ADD OR ADC SBB AND SUB XOR CMP, selected by `op`.
    pub(crate) fn alu(&mut self, op: u8, width: Width, a: u16, b: u16) -> u16 {
        let carry = self.regs.flags.is_set(CF);
        let result = match op & 7 {
            0 => alu::add(width, a, b, false),
            1 => alu::logic(width, a | b),
            2 => alu::add(width, a, b, carry),
            3 => alu::sub(width, a, b, carry),
            4 => alu::logic(width, a & b),
            5 | 7 => alu::sub(width, a, b, false),
            _ => alu::logic(width, a ^ b),
        };
        self.apply(result);
        result.value
    }

    fn fetch_imm<B: ParasiteBus>(&mut self, bus: &mut B, width: Width) -> u16 {
        match width {
            Width::Byte => u16::from(self.fetch8(bus)),
            Width::Word => self.fetch16(bus),
        }
    }

    fn fetch_simm8<B: ParasiteBus>(&mut self, bus: &mut B) -> u16 {
        self.fetch8(bus) as i8 as u16
    }

    /// Jcc condition by low nibble.
    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.flags;
        let result = match cc >> 1 {
            0 => f.is_set(OF),
            1 => f.is_set(CF),
            2 => f.is_set(ZF),
            3 => f.is_set(CF) || f.is_set(ZF),
            4 => f.is_set(SF),
            5 => f.is_set(PF),
            6 => f.is_set(SF) != f.is_set(OF),
            _ => f.is_set(ZF) || (f.is_set(SF) != f.is_set(OF)),
        };
        result != (cc & 1 != 0)
    }

    fn jump_relative(&mut self, displacement: u16) {
        self.regs.ip = self.regs.ip.wrapping_add(displacement);
    }

    fn far_transfer(&mut self, segment: u16, offset: u16) {
        self.regs.set_seg(Segment::Cs, segment);
        self.regs.ip = offset;
    }

    /// Decode a group opcode's ModRM and check the sub-operation exists.
    fn group_modrm<B: ParasiteBus>(&mut self, bus: &mut B, opcode: u8) -> Option<ModRm> {
        let modrm = self.fetch_modrm(bus);
        let Class::Group(group) = OPCODES[usize::from(opcode)].class else {
            return Some(modrm);
        };
        if let Some(sub) = group_op(group, modrm.reg) {
            self.cycles += i32::from(sub.cycles);
            Some(modrm)
        } else {
            self.invalid_opcode(opcode);
            None
        }
    }

    /// Execute the opcode after prefixes. ISA gating has already happened.
    pub(super) fn execute<B: ParasiteBus>(&mut self, bus: &mut B, op: u8) {
        match op {
            // ADD OR ADC SBB AND SUB XOR CMP: r/m, reg
            0x00..=0x3F if op & 7 < 2 => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let dst = self.resolve(bus, modrm);
                let a = self.get_operand_value(bus, dst, width);
                let b = self.get_register_value(width, modrm.reg);
                let r = self.alu(op >> 3, width, a, b);
                if op >> 3 != 7 {
                    self.set_operand_value(bus, dst, width, r);
                }
            }

            // ADD OR ADC SBB AND SUB XOR CMP: reg, r/m
            0x00..=0x3F if op & 7 < 4 => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let src = self.resolve(bus, modrm);
                let a = self.get_register_value(width, modrm.reg);
                let b = self.get_operand_value(bus, src, width);
                let r = self.alu(op >> 3, width, a, b);
                if op >> 3 != 7 {
                    self.set_register_value(width, modrm.reg, r);
                }
            }

            // ADD OR ADC SBB AND SUB XOR CMP: AL/AX, imm
            0x00..=0x3F if op & 7 < 6 => {
                let width = Width::from_w(op);
                let b = self.fetch_imm(bus, width);
                let a = self.get_register_value(width, 0);
                let r = self.alu(op >> 3, width, a, b);
                if op >> 3 != 7 {
                    self.set_register_value(width, 0, r);
                }
            }

            // PUSH seg
            0x06 | 0x0E | 0x16 | 0x1E => {
                let value = self.regs.seg(Segment::from_bits(op >> 3));
                self.push(bus, value);
            }

            // POP seg
            0x07 | 0x17 | 0x1F => {
                let value = self.pop(bus);
                self.regs.set_seg(Segment::from_bits(op >> 3), value);
            }

            // 80286 two-byte map
            0x0F => self.execute_extended(bus),

            // DAA
            0x27 => {
                let r = alu::daa(self.regs.al(), self.regs.flags.0);
                self.regs.set_al(r.value as u8);
                self.apply(r);
            }

            // DAS
            0x2F => {
                let r = alu::das(self.regs.al(), self.regs.flags.0);
                self.regs.set_al(r.value as u8);
                self.apply(r);
            }

            // AAA
            0x37 => {
                let r = alu::aaa(self.regs.ax(), self.regs.flags.0);
                self.regs.set_ax(r.value);
                self.apply(r);
            }

            // AAS
            0x3F => {
                let r = alu::aas(self.regs.ax(), self.regs.flags.0);
                self.regs.set_ax(r.value);
                self.apply(r);
            }

            // INC r16
            0x40..=0x47 => {
                let r = alu::inc(Width::Word, self.regs.reg16(op));
                self.regs.set_reg16(op, r.value);
                self.apply(r);
            }

            // DEC r16
            0x48..=0x4F => {
                let r = alu::dec(Width::Word, self.regs.reg16(op));
                self.regs.set_reg16(op, r.value);
                self.apply(r);
            }

            // PUSH r16. Before the 80286, PUSH SP stores the decremented SP.
            0x50..=0x57 => {
                let index = op & 7;
                let value = if usize::from(index) == SP && self.isa() < Isa::I80286 {
                    self.regs.sp().wrapping_sub(2)
                } else {
                    self.regs.reg16(index)
                };
                self.push(bus, value);
            }

            // POP r16
            0x58..=0x5F => {
                let value = self.pop(bus);
                self.regs.set_reg16(op, value);
            }

            // PUSHA
            0x60 => {
                let sp = self.regs.sp();
                for index in 0..8u8 {
                    let value = if usize::from(index) == SP { sp } else { self.regs.reg16(index) };
                    self.push(bus, value);
                }
            }

            // POPA
            0x61 => {
                for index in (0..8u8).rev() {
                    let value = self.pop(bus);
                    if usize::from(index) != SP {
                        self.regs.set_reg16(index, value);
                    }
                }
            }

            // BOUND r16, m16&16
            0x62 => {
                let modrm = self.fetch_modrm(bus);
                let Some((segment, offset)) = self.resolve_memory(bus, modrm) else {
                    self.invalid_opcode(op);
                    return;
                };
                let lower = self.read16(bus, segment, offset) as i16;
                let upper = self.read16(bus, segment, offset.wrapping_add(2)) as i16;
                let index = self.regs.reg16(modrm.reg) as i16;
                if index < lower || index > upper {
                    self.fault(interrupt::BOUND_RANGE);
                }
            }

            // ARPL r/m16, r16
            0x63 => {
                if !self.protected_mode() {
                    self.invalid_opcode(op);
                    return;
                }
                let modrm = self.fetch_modrm(bus);
                let dst = self.resolve(bus, modrm);
                let selector = self.get_operand_value(bus, dst, Width::Word);
                let rpl = self.regs.reg16(modrm.reg) & 3;
                if selector & 3 < rpl {
                    self.set_operand_value(bus, dst, Width::Word, (selector & !3) | rpl);
                    self.regs.flags.set(ZF);
                } else {
                    self.regs.flags.clear(ZF);
                }
            }

            // PUSH imm16
            0x68 => {
                let value = self.fetch16(bus);
                self.push(bus, value);
            }

            // PUSH imm8 (sign-extended)
            0x6A => {
                let value = self.fetch_simm8(bus);
                self.push(bus, value);
            }

            // IMUL r16, r/m16, imm16 / imm8
            0x69 | 0x6B => {
                let modrm = self.fetch_modrm(bus);
                let src = self.resolve(bus, modrm);
                let a = self.get_operand_value(bus, src, Width::Word);
                let b = if op == 0x69 {
                    self.fetch16(bus)
                } else {
                    self.fetch_simm8(bus)
                };
                let (product, r) = alu::imul(Width::Word, a, b);
                self.regs.set_reg16(modrm.reg, product as u16);
                self.apply(r);
            }

            // INS OUTS MOVS CMPS STOS LODS SCAS
            0x6C..=0x6F | 0xA4..=0xA7 | 0xAA..=0xAF => self.string_op(bus, op),

            // Jcc rel8
            0x70..=0x7F => {
                let displacement = self.fetch_simm8(bus);
                if self.condition(op & 0x0F) {
                    self.jump_relative(displacement);
                    self.cycles += 12;
                }
            }

            // ALU r/m, imm
            0x80..=0x83 => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                let width = Width::from_w(op);
                let dst = self.resolve(bus, modrm);
                let b = if op == 0x83 {
                    self.fetch_simm8(bus)
                } else {
                    self.fetch_imm(bus, width)
                };
                let a = self.get_operand_value(bus, dst, width);
                let r = self.alu(modrm.reg, width, a, b);
                if modrm.reg != 7 {
                    self.set_operand_value(bus, dst, width, r);
                }
            }

            // TEST r/m, reg
            0x84 | 0x85 => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let src = self.resolve(bus, modrm);
                let a = self.get_operand_value(bus, src, width);
                let b = self.get_register_value(width, modrm.reg);
                self.apply(alu::logic(width, a & b));
            }

            // XCHG r/m, reg
            0x86 | 0x87 => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let dst = self.resolve(bus, modrm);
                let a = self.get_operand_value(bus, dst, width);
                let b = self.get_register_value(width, modrm.reg);
                self.set_operand_value(bus, dst, width, b);
                self.set_register_value(width, modrm.reg, a);
            }

            // MOV r/m, reg
            0x88 | 0x89 => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let dst = self.resolve(bus, modrm);
                let value = self.get_register_value(width, modrm.reg);
                self.set_operand_value(bus, dst, width, value);
            }

            // MOV reg, r/m
            0x8A | 0x8B => {
                let width = Width::from_w(op);
                let modrm = self.fetch_modrm(bus);
                let src = self.resolve(bus, modrm);
                let value = self.get_operand_value(bus, src, width);
                self.set_register_value(width, modrm.reg, value);
            }

            // MOV r/m16, seg
            0x8C => {
                let modrm = self.fetch_modrm(bus);
                let dst = self.resolve(bus, modrm);
                let value = self.regs.seg(Segment::from_bits(modrm.reg));
                self.set_operand_value(bus, dst, Width::Word, value);
            }

            // LEA r16, m
            0x8D => {
                let modrm = self.fetch_modrm(bus);
                match self.resolve(bus, modrm) {
                    Operand::Memory { offset, .. } => self.regs.set_reg16(modrm.reg, offset),
                    Operand::Register(_) => self.invalid_opcode(op),
                }
            }

            // MOV seg, r/m16. Loading CS this way only works on the 8086.
            0x8E => {
                let modrm = self.fetch_modrm(bus);
                let segment = Segment::from_bits(modrm.reg);
                if segment == Segment::Cs && self.isa() >= Isa::I80186 {
                    self.invalid_opcode(op);
                    return;
                }
                let src = self.resolve(bus, modrm);
                let value = self.get_operand_value(bus, src, Width::Word);
                self.regs.set_seg(segment, value);
            }

            // POP r/m16
            0x8F => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                let value = self.pop(bus);
                let dst = self.resolve(bus, modrm);
                self.set_operand_value(bus, dst, Width::Word, value);
            }

            // NOP
            0x90 => {}

            // XCHG AX, r16
            0x91..=0x97 => {
                let other = self.regs.reg16(op);
                self.regs.set_reg16(op, self.regs.ax());
                self.regs.set_ax(other);
            }

            // CBW
            0x98 => {
                let al = self.regs.al();
                self.regs.set_ax(al as i8 as u16);
            }

            // CWD
            0x99 => {
                let dx = if self.regs.ax() & 0x8000 != 0 { 0xFFFF } else { 0 };
                self.regs.set_dx(dx);
            }

            // CALL far ptr16:16
            0x9A => {
                let offset = self.fetch16(bus);
                let segment = self.fetch16(bus);
                self.push(bus, self.regs.cs());
                self.push(bus, self.regs.ip);
                self.far_transfer(segment, offset);
            }

            // WAIT
            0x9B => {
                if self.regs.msw & (MSW_MP | MSW_TS) == MSW_MP | MSW_TS {
                    self.fault(interrupt::NO_FPU);
                }
            }

            // PUSHF
            0x9C => {
                let image = self.flags_image();
                self.push(bus, image);
            }

            // POPF
            0x9D => {
                let image = self.pop(bus);
                self.regs.flags.load(image);
            }

            // SAHF
            0x9E => {
                let ah = u16::from(self.regs.ah());
                self.regs.flags.assign(SF | ZF | AF | PF | CF, ah);
            }

            // LAHF
            0x9F => {
                let image = self.flags_image();
                self.regs.set_ah(image as u8);
            }

            // MOV AL/AX, moffs
            0xA0 | 0xA1 => {
                let width = Width::from_w(op);
                let offset = self.fetch16(bus);
                let segment = self.data_segment(Segment::Ds);
                let value = self.get_operand_value(bus, Operand::Memory { segment, offset }, width);
                self.set_register_value(width, 0, value);
            }

            // MOV moffs, AL/AX
            0xA2 | 0xA3 => {
                let width = Width::from_w(op);
                let offset = self.fetch16(bus);
                let segment = self.data_segment(Segment::Ds);
                let value = self.get_register_value(width, 0);
                self.set_operand_value(bus, Operand::Memory { segment, offset }, width, value);
            }

            // TEST AL/AX, imm
            0xA8 | 0xA9 => {
                let width = Width::from_w(op);
                let b = self.fetch_imm(bus, width);
                let a = self.get_register_value(width, 0);
                self.apply(alu::logic(width, a & b));
            }

            // MOV r8, imm8
            0xB0..=0xB7 => {
                let value = self.fetch8(bus);
                self.regs.set_reg8(op & 7, value);
            }

            // MOV r16, imm16
            0xB8..=0xBF => {
                let value = self.fetch16(bus);
                self.regs.set_reg16(op & 7, value);
            }

            // Shift/rotate r/m by imm8 (C0 C1), 1 (D0 D1) or CL (D2 D3)
            0xC0 | 0xC1 | 0xD0..=0xD3 => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                let width = Width::from_w(op);
                let dst = self.resolve(bus, modrm);
                let mut count = match op {
                    0xC0 | 0xC1 => self.fetch8(bus),
                    0xD0 | 0xD1 => 1,
                    _ => self.regs.cl(),
                };
                if self.caps.masks_shift_count {
                    count &= 0x1F;
                }
                if !matches!(op, 0xD0 | 0xD1) {
                    self.cycles += 4 * i32::from(count);
                }
                let value = self.get_operand_value(bus, dst, width);
                let carry = self.regs.flags.is_set(CF);
                let r = alu::shift(width, ShiftOp::from_reg(modrm.reg), value, count, carry);
                self.set_operand_value(bus, dst, width, r.value);
                self.apply(r);
            }

            // RET imm16
            0xC2 => {
                let release = self.fetch16(bus);
                self.regs.ip = self.pop(bus);
                let sp = self.regs.sp().wrapping_add(release);
                self.regs.set_sp(sp);
            }

            // RET
            0xC3 => {
                self.regs.ip = self.pop(bus);
            }

            // LES / LDS r16, m16:16
            0xC4 | 0xC5 => {
                let modrm = self.fetch_modrm(bus);
                let Some((segment, offset)) = self.resolve_memory(bus, modrm) else {
                    self.invalid_opcode(op);
                    return;
                };
                let value = self.read16(bus, segment, offset);
                let selector = self.read16(bus, segment, offset.wrapping_add(2));
                self.regs.set_reg16(modrm.reg, value);
                let target = if op == 0xC4 { Segment::Es } else { Segment::Ds };
                self.regs.set_seg(target, selector);
            }

            // MOV r/m, imm
            0xC6 | 0xC7 => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                let width = Width::from_w(op);
                let dst = self.resolve(bus, modrm);
                let value = self.fetch_imm(bus, width);
                self.set_operand_value(bus, dst, width, value);
            }

            // ENTER imm16, imm8
            0xC8 => {
                let size = self.fetch16(bus);
                let level = self.fetch8(bus) & 0x1F;
                self.push(bus, self.regs.bp());
                let frame = self.regs.sp();
                if level > 0 {
                    let mut bp = self.regs.bp();
                    for _ in 1..level {
                        bp = bp.wrapping_sub(2);
                        let link = self.read16(bus, Segment::Ss, bp);
                        self.push(bus, link);
                        self.cycles += 16;
                    }
                    self.push(bus, frame);
                }
                self.regs.gp[BP] = frame;
                let sp = self.regs.sp().wrapping_sub(size);
                self.regs.set_sp(sp);
            }

            // LEAVE
            0xC9 => {
                self.regs.set_sp(self.regs.bp());
                self.regs.gp[BP] = self.pop(bus);
            }

            // RETF imm16
            0xCA => {
                let release = self.fetch16(bus);
                let offset = self.pop(bus);
                let segment = self.pop(bus);
                self.far_transfer(segment, offset);
                let sp = self.regs.sp().wrapping_add(release);
                self.regs.set_sp(sp);
            }

            // RETF
            0xCB => {
                let offset = self.pop(bus);
                let segment = self.pop(bus);
                self.far_transfer(segment, offset);
            }

            // INT3
            0xCC => self.software_interrupt(interrupt::BREAKPOINT),

            // INT imm8
            0xCD => {
                let vector = self.fetch8(bus);
                self.software_interrupt(vector);
            }

            // INTO
            0xCE => {
                if self.regs.flags.is_set(OF) {
                    self.cycles += 48;
                    self.software_interrupt(interrupt::OVERFLOW);
                }
            }

            // IRET
            0xCF => {
                let offset = self.pop(bus);
                let segment = self.pop(bus);
                let image = self.pop(bus);
                self.far_transfer(segment, offset);
                self.regs.flags.load(image);
            }

            // AAM imm8
            0xD4 => {
                let base = self.fetch8(bus);
                if base == 0 {
                    self.fault(interrupt::DIVIDE_ERROR);
                    return;
                }
                let r = alu::aam(self.regs.al(), base);
                self.regs.set_ax(r.value);
                self.apply(r);
            }

            // AAD imm8
            0xD5 => {
                let base = self.fetch8(bus);
                let r = alu::aad(self.regs.ax(), base);
                self.regs.set_ax(r.value);
                self.apply(r);
            }

            // XLAT
            0xD7 => {
                let segment = self.data_segment(Segment::Ds);
                let offset = self.regs.bx().wrapping_add(u16::from(self.regs.al()));
                let value = self.read8(bus, segment, offset);
                self.regs.set_al(value);
            }

            // ESC: hand off to the coprocessor, or trap if there is none
            0xD8..=0xDF => {
                let modrm = self.fetch_modrm(bus);
                self.resolve(bus, modrm);
                if !self.profile.fpu || self.regs.msw & MSW_EM != 0 {
                    self.fault(interrupt::NO_FPU);
                }
            }

            // LOOPNZ / LOOPZ / LOOP rel8
            0xE0..=0xE2 => {
                let displacement = self.fetch_simm8(bus);
                let cx = self.regs.cx().wrapping_sub(1);
                self.regs.set_cx(cx);
                let zf = self.regs.flags.is_set(ZF);
                let taken = cx != 0
                    && match op {
                        0xE0 => !zf,
                        0xE1 => zf,
                        _ => true,
                    };
                if taken {
                    self.jump_relative(displacement);
                    self.cycles += 12;
                }
            }

            // JCXZ rel8
            0xE3 => {
                let displacement = self.fetch_simm8(bus);
                if self.regs.cx() == 0 {
                    self.jump_relative(displacement);
                    self.cycles += 12;
                }
            }

            // IN AL/AX, imm8
            0xE4 | 0xE5 => {
                let port = u16::from(self.fetch8(bus));
                self.input(bus, op, port);
            }

            // OUT imm8, AL/AX
            0xE6 | 0xE7 => {
                let port = u16::from(self.fetch8(bus));
                self.output(bus, op, port);
            }

            // CALL rel16
            0xE8 => {
                let displacement = self.fetch16(bus);
                self.push(bus, self.regs.ip);
                self.jump_relative(displacement);
            }

            // JMP rel16
            0xE9 => {
                let displacement = self.fetch16(bus);
                self.jump_relative(displacement);
            }

            // JMP far ptr16:16
            0xEA => {
                let offset = self.fetch16(bus);
                let segment = self.fetch16(bus);
                self.far_transfer(segment, offset);
            }

            // JMP rel8
            0xEB => {
                let displacement = self.fetch_simm8(bus);
                self.jump_relative(displacement);
            }

            // IN AL/AX, DX
            0xEC | 0xED => {
                let port = self.regs.dx();
                self.input(bus, op, port);
            }

            // OUT DX, AL/AX
            0xEE | 0xEF => {
                let port = self.regs.dx();
                self.output(bus, op, port);
            }

            // HLT
            0xF4 => self.halt(),

            // CMC
            0xF5 => {
                let carry = self.regs.flags.is_set(CF);
                self.regs.flags.set_if(CF, !carry);
            }

            // TEST NOT NEG MUL IMUL DIV IDIV
            0xF6 | 0xF7 => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                self.execute_unary(bus, op, modrm);
            }

            // CLC / STC
            0xF8 => self.regs.flags.clear(CF),
            0xF9 => self.regs.flags.set(CF),

            // CLI / STI
            0xFA => self.regs.flags.clear(IF),
            0xFB => self.regs.flags.set(IF),

            // CLD / STD
            0xFC => self.regs.flags.clear(DF),
            0xFD => self.regs.flags.set(DF),

            // INC/DEC r/m8
            0xFE => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                self.inc_dec(bus, modrm, Width::Byte);
            }

            // INC DEC CALL CALLF JMP JMPF PUSH r/m16
            0xFF => {
                let Some(modrm) = self.group_modrm(bus, op) else {
                    return;
                };
                self.execute_misc(bus, modrm);
            }

            _ => self.invalid_opcode(op),
        }
    }

    fn input<B: ParasiteBus>(&mut self, bus: &mut B, op: u8, port: u16) {
        if op & 1 == 0 {
            let value = self.port_in8(bus, port);
            self.regs.set_al(value);
        } else {
            let value = self.port_in16(bus, port);
            self.regs.set_ax(value);
        }
    }

    fn output<B: ParasiteBus>(&mut self, bus: &mut B, op: u8, port: u16) {
        if op & 1 == 0 {
            self.port_out8(bus, port, self.regs.al());
        } else {
            self.port_out16(bus, port, self.regs.ax());
        }
    }

    fn inc_dec<B: ParasiteBus>(&mut self, bus: &mut B, modrm: ModRm, width: Width) {
        let dst = self.resolve(bus, modrm);
        let value = self.get_operand_value(bus, dst, width);
        let r = if modrm.reg == 0 {
            alu::inc(width, value)
        } else {
            alu::dec(width, value)
        };
        self.set_operand_value(bus, dst, width, r.value);
        self.apply(r);
    }

    /// Group 3 (F6/F7).
    fn execute_unary<B: ParasiteBus>(&mut self, bus: &mut B, op: u8, modrm: ModRm) {
        let width = Width::from_w(op);
        let src = self.resolve(bus, modrm);
        let value = self.get_operand_value(bus, src, width);
        match modrm.reg {
            // TEST r/m, imm
            0 | 1 => {
                let imm = self.fetch_imm(bus, width);
                self.apply(alu::logic(width, value & imm));
            }

            // NOT
            2 => self.set_operand_value(bus, src, width, !value),

            // NEG
            3 => {
                let r = alu::sub(width, 0, value, false);
                self.set_operand_value(bus, src, width, r.value);
                self.apply(r);
            }

            // MUL
            4 => {
                let (product, r) = alu::mul(width, self.get_register_value(width, 0), value);
                self.store_product(width, product);
                self.apply(r);
            }

            // IMUL
            5 => {
                let (product, r) = alu::imul(width, self.get_register_value(width, 0), value);
                self.store_product(width, product);
                self.apply(r);
            }

            // DIV
            6 => self.divide(width, value),

            // IDIV
            _ => self.divide_signed(width, value),
        }
    }

    /// AX for byte products, DX:AX for word products.
    fn store_product(&mut self, width: Width, product: u32) {
        match width {
            Width::Byte => self.regs.set_ax(product as u16),
            Width::Word => {
                self.regs.set_ax(product as u16);
                self.regs.set_dx((product >> 16) as u16);
            }
        }
    }

    fn divide(&mut self, width: Width, divisor: u16) {
        let dividend = match width {
            Width::Byte => u32::from(self.regs.ax()),
            Width::Word => (u32::from(self.regs.dx()) << 16) | u32::from(self.regs.ax()),
        };
        let divisor = u32::from(divisor);
        let quotient = dividend.checked_div(divisor);
        match quotient {
            Some(q) if q <= width.mask() => {
                let remainder = dividend % divisor;
                self.store_quotient(width, q as u16, remainder as u16);
            }
            _ => self.fault(interrupt::DIVIDE_ERROR),
        }
    }

    fn divide_signed(&mut self, width: Width, divisor: u16) {
        let dividend = match width {
            Width::Byte => i64::from(self.regs.ax() as i16),
            Width::Word => i64::from(((u32::from(self.regs.dx()) << 16) | u32::from(self.regs.ax())) as i32),
        };
        let divisor = i64::from(width.sign_extend(u32::from(divisor)));
        let limit = i64::from(width.sign_bit());
        match dividend.checked_div(divisor) {
            Some(q) if q >= -limit && q < limit => {
                let remainder = dividend % divisor;
                self.store_quotient(width, q as u16, remainder as u16);
            }
            _ => self.fault(interrupt::DIVIDE_ERROR),
        }
    }

    /// AL/AH or AX/DX.
    fn store_quotient(&mut self, width: Width, quotient: u16, remainder: u16) {
        match width {
            Width::Byte => {
                self.regs.set_al(quotient as u8);
                self.regs.set_ah(remainder as u8);
            }
            Width::Word => {
                self.regs.gp[AX] = quotient;
                self.regs.gp[DX] = remainder;
            }
        }
    }

    /// Group 5 (FF).
    fn execute_misc<B: ParasiteBus>(&mut self, bus: &mut B, modrm: ModRm) {
        match modrm.reg {
            0 | 1 => self.inc_dec(bus, modrm, Width::Word),

            // CALL r/m16
            2 => {
                let src = self.resolve(bus, modrm);
                let target = self.get_operand_value(bus, src, Width::Word);
                self.push(bus, self.regs.ip);
                self.regs.ip = target;
            }

            // CALL m16:16 / JMP m16:16
            3 | 5 => {
                let Some((segment, offset)) = self.resolve_memory(bus, modrm) else {
                    self.invalid_opcode(0xFF);
                    return;
                };
                let target = self.read16(bus, segment, offset);
                let selector = self.read16(bus, segment, offset.wrapping_add(2));
                if modrm.reg == 3 {
                    self.push(bus, self.regs.cs());
                    self.push(bus, self.regs.ip);
                }
                self.far_transfer(selector, target);
            }

            // JMP r/m16
            4 => {
                let src = self.resolve(bus, modrm);
                self.regs.ip = self.get_operand_value(bus, src, Width::Word);
            }

            // PUSH r/m16
            _ => {
                let src = self.resolve(bus, modrm);
                let value = self.get_operand_value(bus, src, Width::Word);
                self.push(bus, value);
            }
        }
    }
}
