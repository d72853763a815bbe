//! Hardware profiles: the immutable parameters of one second-processor board.

use std::fmt;

use crate::model::CpuModel;

/// Why a profile was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// RAM size is zero or not a power of two.
    RamSize(usize),
    /// ROM size is zero or not a power of two.
    RomSize(usize),
    /// The Tube window does not sit below the ROM base once masked.
    WindowAboveRom { tube: u32, rom: u32 },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RamSize(size) => {
                write!(f, "RAM size must be a power of two, got {size} bytes")
            }
            Self::RomSize(size) => {
                write!(f, "ROM size must be a power of two, got {size} bytes")
            }
            Self::WindowAboveRom { tube, rom } => write!(
                f,
                "Tube window at {tube:#08X} must lie below ROM base {rom:#08X}"
            ),
        }
    }
}

impl std::error::Error for ProfileError {}

/// Parameters for one coprocessor board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareProfile {
    /// CPU fitted.
    pub model: CpuModel,
    /// A numeric coprocessor is fitted. ESC opcodes trap when absent.
    pub fpu: bool,
    /// An external memory-management unit is fitted. Informational only:
    /// no board modelled here has one, and nothing translates addresses.
    pub mmu: bool,
    /// RAM size in bytes. Power of two.
    pub ram_size: usize,
    /// ROM size in bytes. Power of two.
    pub rom_size: usize,
    /// Start of the window forwarded to the Tube ULA.
    pub tube_ula_address: u32,
    /// Start of the ROM region.
    pub rom_base_address: u32,
    /// Mask applied to addresses generated inside the CPU.
    pub internal_address_mask: u32,
    /// Mask applied to addresses placed on the external bus.
    pub external_address_mask: u32,
    /// Firmware image file name, relative to the host's ROM directory.
    pub firmware: &'static str,
}

impl HardwareProfile {
    /// Acorn Master 512: 80186 with 512K.
    pub const ACORN_186: Self = Self::for_model(CpuModel::I80186, 0x8_0000, "BeebFile/Master512.rom");

    /// Acorn Business Computer 300 second processor: 80286 with 1M.
    ///
    /// The board decodes A0-A19 only, so the Tube window and ROM sit at the
    /// top of the first megabyte where real-mode code, including the reset
    /// fetch at F000:FFF0, can reach them.
    pub const ACORN_286: Self =
        Self::for_model(CpuModel::I80286, 0x10_0000, "BeebFile/ABC300.rom").with_external_mask(0x000F_FFFF);

    /// Torch Graduate: 8088 with 256K.
    pub const TORCH_GRADUATE: Self = Self::for_model(CpuModel::I8088, 0x4_0000, "BeebFile/CCCP102.rom");

    /// A board with the Acorn memory map around the given CPU.
    #[must_use]
    pub const fn for_model(model: CpuModel, ram_size: usize, firmware: &'static str) -> Self {
        let mask = model.address_mask();
        Self {
            model,
            fpu: false,
            mmu: false,
            ram_size,
            rom_size: 0x4000,
            tube_ula_address: 0xFFFE_0000,
            rom_base_address: 0xFFFF_0000,
            internal_address_mask: mask,
            external_address_mask: mask,
            firmware,
        }
    }

    /// Same board with a numeric coprocessor fitted or removed.
    #[must_use]
    pub const fn with_fpu(mut self, fpu: bool) -> Self {
        self.fpu = fpu;
        self
    }

    /// Same board with a different set of decoded address lines.
    #[must_use]
    pub const fn with_external_mask(mut self, mask: u32) -> Self {
        self.external_address_mask = mask;
        self
    }

    /// Same board with a different RAM size.
    #[must_use]
    pub const fn with_ram_size(mut self, ram_size: usize) -> Self {
        self.ram_size = ram_size;
        self
    }

    /// Masked start of the Tube window.
    #[must_use]
    pub const fn tube_window(&self) -> u32 {
        self.tube_ula_address & self.external_address_mask
    }

    /// Masked start of the ROM region.
    #[must_use]
    pub const fn rom_base(&self) -> u32 {
        self.rom_base_address & self.external_address_mask
    }

    /// Check the sizes and the memory map.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !self.ram_size.is_power_of_two() {
            return Err(ProfileError::RamSize(self.ram_size));
        }
        if !self.rom_size.is_power_of_two() {
            return Err(ProfileError::RomSize(self.rom_size));
        }
        if self.tube_window() > self.rom_base() {
            return Err(ProfileError::WindowAboveRom {
                tube: self.tube_window(),
                rom: self.rom_base(),
            });
        }
        Ok(())
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::ACORN_186
    }
}
