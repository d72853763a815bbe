//! Coprocessor address space: local RAM, boot ROM and the Tube window.
//!
//! After reset the ROM is overlaid across the whole address space so the
//! CPU can fetch its reset vector. The first access at or above the ROM base
//! drops the overlay for good, after which the map is:
//!
//! | Masked address          | Region                      |
//! |-------------------------|-----------------------------|
//! | below Tube window       | RAM (mirrored)              |
//! | Tube window to ROM base | forwarded to the host       |
//!
//! The byte at the Tube window base itself is RAM for writes but host for
//! reads.
//! | ROM base and above      | ROM (mirrored, read-only)   |

use copro_core::ParasiteBus;

use crate::profile::HardwareProfile;
use crate::registers::{OffsetRegister, Registers, Segment};

/// RAM, ROM and the boot overlay latch.
pub struct AddressSpace {
    ram: Vec<u8>,
    rom: Vec<u8>,
    /// When true, ROM is mapped everywhere (reset overlay).
    boot_flag: bool,
    ram_mask: u32,
    rom_mask: u32,
    tube_window: u32,
    rom_base: u32,
    internal_mask: u32,
    external_mask: u32,
    /// Wait states charged by the host since the last `take_wait_states`.
    wait: u32,
}

impl AddressSpace {
    /// Allocate zeroed RAM and ROM for a profile.
    #[must_use]
    pub fn new(profile: &HardwareProfile) -> Self {
        Self {
            ram: vec![0; profile.ram_size],
            rom: vec![0; profile.rom_size],
            boot_flag: true,
            ram_mask: (profile.ram_size as u32).wrapping_sub(1),
            rom_mask: (profile.rom_size as u32).wrapping_sub(1),
            tube_window: profile.tube_window(),
            rom_base: profile.rom_base(),
            internal_mask: profile.internal_address_mask,
            external_mask: profile.external_address_mask,
            wait: 0,
        }
    }

    /// Zero RAM and re-arm the boot overlay. ROM is kept.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.boot_flag = true;
        self.wait = 0;
    }

    /// Copy a firmware image into ROM. Returns the number of bytes copied.
    pub fn load_rom(&mut self, image: &[u8]) -> usize {
        let len = image.len().min(self.rom.len());
        self.rom[..len].copy_from_slice(&image[..len]);
        len
    }

    #[must_use]
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// True while the reset overlay is active.
    #[must_use]
    pub fn boot_flag(&self) -> bool {
        self.boot_flag
    }

    /// `(segment << 4) + offset`, masked to the CPU's address lines.
    #[must_use]
    pub fn linear_address(&self, regs: &Registers, segment: Segment, offset: OffsetRegister) -> u32 {
        self.physical(regs.seg(segment), regs.offset(offset))
    }

    /// `(segment << 4) + offset` for explicit values.
    #[must_use]
    pub fn physical(&self, segment: u16, offset: u16) -> u32 {
        ((u32::from(segment) << 4) + u32::from(offset)) & self.internal_mask
    }

    /// Wait states accumulated since the last call.
    pub fn take_wait_states(&mut self) -> u32 {
        std::mem::take(&mut self.wait)
    }

    fn touch(&mut self, address: u32) {
        if self.boot_flag && address >= self.rom_base {
            log::debug!("boot overlay cleared by access at {address:06X}");
            self.boot_flag = false;
        }
    }

    pub fn read_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> u8 {
        let address = address & self.external_mask;
        if self.boot_flag {
            self.touch(address);
            return self.rom[(address & self.rom_mask) as usize];
        }
        if address < self.tube_window {
            self.ram[(address & self.ram_mask) as usize]
        } else if address >= self.rom_base {
            self.rom[(address & self.rom_mask) as usize]
        } else {
            let result = bus.read(address);
            self.wait += u32::from(result.wait);
            result.data
        }
    }

    pub fn write_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32, value: u8) {
        let address = address & self.external_mask;
        if self.boot_flag {
            self.touch(address);
            return;
        }
        if address <= self.tube_window {
            self.ram[(address & self.ram_mask) as usize] = value;
        } else if address < self.rom_base {
            self.wait += u32::from(bus.write(address, value));
        }
    }

    /// Little-endian word.
    pub fn read_word<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> u16 {
        let lo = self.read_byte(bus, address);
        let hi = self.read_byte(bus, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Little-endian doubleword.
    pub fn read_long<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> u32 {
        let lo = self.read_word(bus, address);
        let hi = self.read_word(bus, address.wrapping_add(2));
        (u32::from(hi) << 16) | u32::from(lo)
    }

    pub fn write_word<B: ParasiteBus>(&mut self, bus: &mut B, address: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(bus, address, lo);
        self.write_byte(bus, address.wrapping_add(1), hi);
    }

    pub fn write_long<B: ParasiteBus>(&mut self, bus: &mut B, address: u32, value: u32) {
        self.write_word(bus, address, value as u16);
        self.write_word(bus, address.wrapping_add(2), (value >> 16) as u16);
    }
}
