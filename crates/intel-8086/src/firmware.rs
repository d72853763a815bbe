//! Loading the board's firmware image from disk.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::cpu::I86;

/// Why a firmware image could not be loaded.
#[derive(Debug)]
pub enum FirmwareError {
    /// The file could not be read.
    Io { path: PathBuf, source: io::Error },
    /// The file was empty.
    Empty(PathBuf),
}

impl fmt::Display for FirmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "ROM file {} not readable: {source}", path.display())
            }
            Self::Empty(path) => write!(f, "ROM file {} is empty", path.display()),
        }
    }
}

impl std::error::Error for FirmwareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Empty(_) => None,
        }
    }
}

/// Load the profile's firmware from `rom_dir` into ROM.
///
/// Failure is reported and logged but leaves the core usable: ROM keeps
/// whatever it held before.
pub fn load_firmware(cpu: &mut I86, rom_dir: &Path) -> Result<usize, FirmwareError> {
    let path = rom_dir.join(cpu.profile().firmware);
    let image = match std::fs::read(&path) {
        Ok(image) => image,
        Err(source) => {
            let err = FirmwareError::Io { path, source };
            log::error!("{err}");
            return Err(err);
        }
    };
    if image.is_empty() {
        let err = FirmwareError::Empty(path);
        log::error!("{err}");
        return Err(err);
    }
    let loaded = cpu.load_rom(&image);
    log::info!("firmware {} loaded", path.display());
    Ok(loaded)
}
