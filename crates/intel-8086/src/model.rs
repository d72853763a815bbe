//! CPU model/capability definitions for the Intel 8086 family.
//!
//! Every model runs the same decoder; the capability set gates which opcodes
//! exist and how a handful of corner cases behave.

/// Instruction-set level. Ordered, so `model.isa() >= Isa::I80186` reads
/// naturally at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Isa {
    /// Original 8086/8088 instruction set.
    I8086,
    /// 80186/80188 additions (PUSHA, ENTER, BOUND, immediate shifts...).
    I80186,
    /// 80286 additions (the 0F map, ARPL, LOADALL).
    I80286,
}

/// Selected Intel CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    /// Intel 8088 (8-bit external bus).
    I8088,
    /// Intel 8086.
    I8086,
    /// Intel 80188 (8-bit external bus).
    I80188,
    /// Intel 80186.
    I80186,
    /// Intel 80286.
    I80286,
}

/// Capability flags for a specific CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// Highest instruction-set level decoded.
    pub isa: Isa,
    /// Physical address mask (20 or 24 address lines).
    pub address_mask: u32,
    /// Shift and rotate counts are masked to five bits.
    pub masks_shift_count: bool,
    /// Faults push the address of the faulting instruction, prefixes included.
    pub restartable_faults: bool,
    /// On-chip peripheral control block in I/O space.
    pub peripheral_block: bool,
    /// Bits 12-15 of a pushed FLAGS image read as ones.
    pub flags_high_set: bool,
    /// CS at power-up.
    pub reset_cs: u16,
    /// IP at power-up.
    pub reset_ip: u16,
    /// Machine status word at power-up.
    pub reset_msw: u16,
}

impl CpuModel {
    /// Static capability set for this CPU model.
    #[must_use]
    pub const fn capabilities(self) -> CpuCapabilities {
        match self {
            Self::I8088 | Self::I8086 => CpuCapabilities {
                isa: Isa::I8086,
                address_mask: 0x000F_FFFF,
                masks_shift_count: false,
                restartable_faults: false,
                peripheral_block: false,
                flags_high_set: true,
                reset_cs: 0xFFFF,
                reset_ip: 0x0000,
                reset_msw: 0,
            },
            Self::I80188 | Self::I80186 => CpuCapabilities {
                isa: Isa::I80186,
                address_mask: 0x000F_FFFF,
                masks_shift_count: true,
                restartable_faults: true,
                peripheral_block: true,
                flags_high_set: true,
                reset_cs: 0xFFFF,
                reset_ip: 0x0000,
                reset_msw: 0,
            },
            Self::I80286 => CpuCapabilities {
                isa: Isa::I80286,
                address_mask: 0x00FF_FFFF,
                masks_shift_count: true,
                restartable_faults: true,
                peripheral_block: false,
                flags_high_set: false,
                reset_cs: 0xF000,
                reset_ip: 0xFFF0,
                reset_msw: 0xFFF0,
            },
        }
    }

    /// Convenience helper for decode gating.
    #[must_use]
    pub const fn isa(self) -> Isa {
        self.capabilities().isa
    }

    /// Physical address mask for this model.
    #[must_use]
    pub const fn address_mask(self) -> u32 {
        self.capabilities().address_mask
    }

    /// Part number, as printed on the chip.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8088 => "8088",
            Self::I8086 => "8086",
            Self::I80188 => "80188",
            Self::I80186 => "80186",
            Self::I80286 => "80286",
        }
    }
}
