//! I/O space: the Tube registers and the 80186 peripheral control block.

use copro_core::{ParasiteBus, ReadResult};

/// First port of the Tube ULA's parasite-side registers.
pub const TUBE_PORT_BASE: u16 = 0x80;
/// Last port decoded as a Tube register.
pub const TUBE_PORT_END: u16 = 0x8F;

/// Offset of the relocation register within the control block.
const RELOCATION: usize = 0xFE;
/// Relocation register at power-up: block at I/O 0xFF00.
const RELOCATION_RESET: u16 = 0x20FF;

/// Port decoder.
#[derive(Debug, Clone)]
pub struct IoSpace {
    /// 80186 peripheral control block, when the CPU has one.
    pcb: Option<Box<[u8; 256]>>,
}

impl IoSpace {
    #[must_use]
    pub fn new(peripheral_block: bool) -> Self {
        let mut io = Self {
            pcb: peripheral_block.then(|| Box::new([0; 256])),
        };
        io.reset();
        io
    }

    pub fn reset(&mut self) {
        if let Some(pcb) = self.pcb.as_mut() {
            pcb.fill(0);
            let [lo, hi] = RELOCATION_RESET.to_le_bytes();
            pcb[RELOCATION] = lo;
            pcb[RELOCATION + 1] = hi;
        }
    }

    /// Tube register selected by a port, if any.
    #[must_use]
    pub const fn tube_register(port: u16) -> Option<u8> {
        if port >= TUBE_PORT_BASE && port <= TUBE_PORT_END {
            Some(((port & 0x0F) >> 1) as u8)
        } else {
            None
        }
    }

    /// Offset into the control block, if the port falls inside it.
    fn pcb_offset(&self, port: u16) -> Option<usize> {
        let pcb = self.pcb.as_ref()?;
        let relocation = u16::from_le_bytes([pcb[RELOCATION], pcb[RELOCATION + 1]]);
        let base = (relocation & 0x0FFF) << 8;
        (port & 0xFF00 == base).then_some(usize::from(port & 0xFF))
    }

    pub fn read<B: ParasiteBus>(&mut self, bus: &mut B, port: u16) -> ReadResult {
        if let Some(register) = Self::tube_register(port) {
            return bus.io_read(register);
        }
        if let (Some(offset), Some(pcb)) = (self.pcb_offset(port), self.pcb.as_ref()) {
            return ReadResult::new(pcb[offset]);
        }
        log::debug!("read from unmapped port {port:04X}");
        ReadResult::new(0xFF)
    }

    /// Returns wait states.
    pub fn write<B: ParasiteBus>(&mut self, bus: &mut B, port: u16, value: u8) -> u8 {
        if let Some(register) = Self::tube_register(port) {
            return bus.io_write(register, value);
        }
        if let Some(offset) = self.pcb_offset(port) {
            if let Some(pcb) = self.pcb.as_mut() {
                pcb[offset] = value;
            }
            return 0;
        }
        log::debug!("write {value:02X} to unmapped port {port:04X}");
        0
    }
}
