//! 80286 system instructions: the `0F` map and LOADALL.
//!
//! Only the descriptor-table registers, the MSW and the LDTR/TR caches are
//! modelled. Segment loads keep real-mode semantics even with PE set.

use copro_core::ParasiteBus;

use crate::alu::Width;
use crate::decode::{Extended, extended_op, group6_op, group7_op};
use crate::flags::{MSW_PE, MSW_TS, ZF};
use crate::modrm::ModRm;
use crate::registers::{DescriptorTable, Segment, SegmentCache};

use super::I86;

/// Descriptor access byte: present.
const ACCESS_PRESENT: u8 = 0x80;
/// Descriptor access byte: code or data segment (not a system descriptor).
const ACCESS_SEGMENT: u8 = 0x10;
/// Descriptor access byte: executable.
const ACCESS_CODE: u8 = 0x08;
/// Descriptor access byte: readable (code) or writable (data).
const ACCESS_RW: u8 = 0x02;

/// Base of the LOADALL image in physical memory.
const LOADALL_BASE: u32 = 0x800;

/// A descriptor as read from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Descriptor {
    base: u32,
    limit: u16,
    access: u8,
}

impl I86 {
    pub(super) fn execute_extended<B: ParasiteBus>(&mut self, bus: &mut B) {
        let op = self.fetch8(bus);
        let Some((extended, sub)) = extended_op(op) else {
            self.invalid_opcode(0x0F);
            return;
        };
        self.cycles += i32::from(sub.cycles);
        match extended {
            Extended::Group6 => {
                let modrm = self.fetch_modrm(bus);
                match group6_op(modrm.reg) {
                    Some(member) if self.protected_mode() => {
                        self.cycles += i32::from(member.cycles);
                        self.execute_group6(bus, modrm);
                    }
                    _ => self.invalid_opcode(0x0F),
                }
            }
            Extended::Group7 => {
                let modrm = self.fetch_modrm(bus);
                if let Some(member) = group7_op(modrm.reg) {
                    self.cycles += i32::from(member.cycles);
                    self.execute_group7(bus, modrm);
                } else {
                    self.invalid_opcode(0x0F);
                }
            }
            Extended::Lar | Extended::Lsl => {
                let modrm = self.fetch_modrm(bus);
                if !self.protected_mode() {
                    self.invalid_opcode(0x0F);
                    return;
                }
                let src = self.resolve(bus, modrm);
                let selector = self.get_operand_value(bus, src, Width::Word);
                match self.descriptor(bus, selector) {
                    Some(descriptor) => {
                        let value = if extended == Extended::Lar {
                            u16::from(descriptor.access) << 8
                        } else {
                            descriptor.limit
                        };
                        self.regs.set_reg16(modrm.reg, value);
                        self.regs.flags.set(ZF);
                    }
                    None => self.regs.flags.clear(ZF),
                }
            }
            Extended::Loadall => self.loadall(bus),
            Extended::Clts => self.regs.msw &= !MSW_TS,
        }
    }

    /// 0F 00: SLDT STR LLDT LTR VERR VERW. Protected mode only.
    fn execute_group6<B: ParasiteBus>(&mut self, bus: &mut B, modrm: ModRm) {
        let operand = self.resolve(bus, modrm);
        match modrm.reg {
            // SLDT
            0 => {
                let selector = self.regs.ldtr.selector;
                self.set_operand_value(bus, operand, Width::Word, selector);
            }

            // STR
            1 => {
                let selector = self.regs.tr.selector;
                self.set_operand_value(bus, operand, Width::Word, selector);
            }

            // LLDT / LTR
            2 | 3 => {
                let selector = self.get_operand_value(bus, operand, Width::Word);
                let cache = if selector & !3 == 0 {
                    SegmentCache::default()
                } else if let Some(d) = self.global_descriptor(bus, selector) {
                    SegmentCache {
                        selector,
                        base: d.base,
                        limit: d.limit,
                        access: d.access,
                    }
                } else {
                    log::debug!("selector {selector:04X} outside GDT limit");
                    return;
                };
                if modrm.reg == 2 {
                    self.regs.ldtr = cache;
                } else {
                    self.regs.tr = cache;
                }
            }

            // VERR / VERW
            _ => {
                let selector = self.get_operand_value(bus, operand, Width::Word);
                let ok = self.descriptor(bus, selector).is_some_and(|d| {
                    let segment = d.access & (ACCESS_PRESENT | ACCESS_SEGMENT)
                        == ACCESS_PRESENT | ACCESS_SEGMENT;
                    let code = d.access & ACCESS_CODE != 0;
                    let rw = d.access & ACCESS_RW != 0;
                    segment
                        && if modrm.reg == 4 {
                            !code || rw
                        } else {
                            !code && rw
                        }
                });
                self.regs.flags.set_if(ZF, ok);
            }
        }
    }

    /// 0F 01: SGDT SIDT LGDT LIDT SMSW LMSW.
    fn execute_group7<B: ParasiteBus>(&mut self, bus: &mut B, modrm: ModRm) {
        match modrm.reg {
            // SGDT / SIDT
            0 | 1 => {
                let Some((segment, offset)) = self.resolve_memory(bus, modrm) else {
                    self.invalid_opcode(0x0F);
                    return;
                };
                let table = if modrm.reg == 0 { self.regs.gdtr } else { self.regs.idtr };
                self.write16(bus, segment, offset, table.limit);
                self.write16(bus, segment, offset.wrapping_add(2), table.base as u16);
                self.write8(bus, segment, offset.wrapping_add(4), (table.base >> 16) as u8);
                self.write8(bus, segment, offset.wrapping_add(5), 0xFF);
            }

            // LGDT / LIDT
            2 | 3 => {
                let Some((segment, offset)) = self.resolve_memory(bus, modrm) else {
                    self.invalid_opcode(0x0F);
                    return;
                };
                let limit = self.read16(bus, segment, offset);
                let low = self.read16(bus, segment, offset.wrapping_add(2));
                let high = self.read8(bus, segment, offset.wrapping_add(4));
                let table = DescriptorTable {
                    base: (u32::from(high) << 16) | u32::from(low),
                    limit,
                };
                if modrm.reg == 2 {
                    self.regs.gdtr = table;
                } else {
                    self.regs.idtr = table;
                }
            }

            // SMSW
            4 => {
                let dst = self.resolve(bus, modrm);
                let msw = self.regs.msw;
                self.set_operand_value(bus, dst, Width::Word, msw);
            }

            // LMSW: loads the low four bits; PE cannot be cleared
            _ => {
                let src = self.resolve(bus, modrm);
                let value = self.get_operand_value(bus, src, Width::Word);
                let pe = self.regs.msw & MSW_PE;
                self.regs.msw = (self.regs.msw & !0x000F) | (value & 0x000F) | pe;
                if pe == 0 && value & MSW_PE != 0 {
                    log::info!("protected mode enabled");
                }
            }
        }
    }

    /// Read a descriptor from the GDT or, for TI=1 selectors, the LDT.
    fn descriptor<B: ParasiteBus>(&mut self, bus: &mut B, selector: u16) -> Option<Descriptor> {
        if selector & 4 == 0 {
            return self.global_descriptor(bus, selector);
        }
        let ldt = self.regs.ldtr;
        self.read_descriptor(bus, ldt.base, ldt.limit, selector)
    }

    fn global_descriptor<B: ParasiteBus>(&mut self, bus: &mut B, selector: u16) -> Option<Descriptor> {
        if selector & !3 == 0 {
            return None;
        }
        let gdt = self.regs.gdtr;
        self.read_descriptor(bus, gdt.base, gdt.limit, selector)
    }

    fn read_descriptor<B: ParasiteBus>(
        &mut self,
        bus: &mut B,
        base: u32,
        limit: u16,
        selector: u16,
    ) -> Option<Descriptor> {
        let index = u32::from(selector & !7);
        if index + 7 > u32::from(limit) {
            return None;
        }
        let address = base.wrapping_add(index);
        let limit = self.mem.read_word(bus, address);
        let base = u32::from(self.mem.read_word(bus, address + 2))
            | (u32::from(self.mem.read_byte(bus, address + 4)) << 16);
        let access = self.mem.read_byte(bus, address + 5);
        Some(Descriptor { base, limit, access })
    }

    /// Six-byte cache entry: 24-bit base, access byte, limit.
    fn loadall_cache<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> Descriptor {
        let low = self.mem.read_word(bus, address);
        let high = self.mem.read_byte(bus, address + 2);
        let access = self.mem.read_byte(bus, address + 3);
        let limit = self.mem.read_word(bus, address + 4);
        Descriptor {
            base: (u32::from(high) << 16) | u32::from(low),
            limit,
            access,
        }
    }

    /// 0F 05: reload every register from the image at physical 0x800.
    fn loadall<B: ParasiteBus>(&mut self, bus: &mut B) {
        let word = |cpu: &mut Self, bus: &mut B, offset: u32| cpu.mem.read_word(bus, LOADALL_BASE + offset);

        self.regs.msw = word(self, bus, 0x06);
        let tr = word(self, bus, 0x16);
        let flags = word(self, bus, 0x18);
        self.regs.flags.load(flags);
        self.regs.ip = word(self, bus, 0x1A);
        let ldtr = word(self, bus, 0x1C);
        for (offset, segment) in [
            (0x1E, Segment::Ds),
            (0x20, Segment::Ss),
            (0x22, Segment::Cs),
            (0x24, Segment::Es),
        ] {
            let value = word(self, bus, offset);
            self.regs.set_seg(segment, value);
        }
        // DI SI BP SP BX DX CX AX, stored in reverse encoding order.
        for (slot, index) in (0..8u8).rev().enumerate() {
            let value = word(self, bus, 0x26 + 2 * slot as u32);
            self.regs.set_reg16(index, value);
        }

        // Segment caches at 0x36..0x4D are not modelled.
        let gdt = self.loadall_cache(bus, LOADALL_BASE + 0x4E);
        self.regs.gdtr = DescriptorTable {
            base: gdt.base,
            limit: gdt.limit,
        };
        let ldt = self.loadall_cache(bus, LOADALL_BASE + 0x54);
        self.regs.ldtr = SegmentCache {
            selector: ldtr,
            base: ldt.base,
            limit: ldt.limit,
            access: ldt.access,
        };
        let idt = self.loadall_cache(bus, LOADALL_BASE + 0x5A);
        self.regs.idtr = DescriptorTable {
            base: idt.base,
            limit: idt.limit,
        };
        let tss = self.loadall_cache(bus, LOADALL_BASE + 0x60);
        self.regs.tr = SegmentCache {
            selector: tr,
            base: tss.base,
            limit: tss.limit,
            access: tss.access,
        };
    }
}
