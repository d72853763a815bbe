//! Parasite-side bus interface.

use std::collections::HashMap;

/// Result of a bus read: the data byte plus any wait states the access cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Byte returned by the device.
    pub data: u8,
    /// Extra CPU cycles spent waiting on the device.
    pub wait: u8,
}

impl ReadResult {
    /// A zero-wait read.
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self { data, wait: 0 }
    }

    /// A read that stalled the CPU for `wait` cycles.
    #[must_use]
    pub const fn with_wait(data: u8, wait: u8) -> Self {
        Self { data, wait }
    }
}

/// The host side of the Tube, as seen from the second processor.
///
/// The coprocessor only calls out through this trait; it never polls it.
/// Memory accesses carry the masked linear address that fell inside the
/// Tube window. Register accesses carry the parasite-side Tube register
/// index (0-7).
pub trait ParasiteBus {
    /// Read a byte from the Tube window.
    fn read(&mut self, address: u32) -> ReadResult;

    /// Write a byte to the Tube window. Returns wait states.
    fn write(&mut self, address: u32, value: u8) -> u8;

    /// Read a parasite-side Tube register.
    fn io_read(&mut self, register: u8) -> ReadResult;

    /// Write a parasite-side Tube register. Returns wait states.
    fn io_write(&mut self, register: u8, value: u8) -> u8;
}

/// A passive stand-in for the host.
///
/// The window reads back whatever was last written (0xFF when untouched) and
/// the eight Tube registers are plain latches. Useful for tests and for
/// running a coprocessor with no host attached.
#[derive(Debug, Clone, Default)]
pub struct SimpleBus {
    window: HashMap<u32, u8>,
    registers: [u8; 8],
    wait: u8,
}

impl SimpleBus {
    /// Create an empty bus with no wait states.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge `wait` cycles on every access.
    #[must_use]
    pub fn with_wait(mut self, wait: u8) -> Self {
        self.wait = wait;
        self
    }

    /// Inspect the window without side effects.
    #[must_use]
    pub fn peek(&self, address: u32) -> Option<u8> {
        self.window.get(&address).copied()
    }

    /// Preload a window byte.
    pub fn poke(&mut self, address: u32, value: u8) {
        self.window.insert(address, value);
    }

    /// Current value of a Tube register latch.
    #[must_use]
    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register & 7)]
    }

    /// Preload a Tube register latch.
    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[usize::from(register & 7)] = value;
    }
}

impl ParasiteBus for SimpleBus {
    fn read(&mut self, address: u32) -> ReadResult {
        let data = self.window.get(&address).copied().unwrap_or(0xFF);
        ReadResult::with_wait(data, self.wait)
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.window.insert(address, value);
        self.wait
    }

    fn io_read(&mut self, register: u8) -> ReadResult {
        ReadResult::with_wait(self.register(register), self.wait)
    }

    fn io_write(&mut self, register: u8, value: u8) -> u8 {
        log::trace!("tube register {register} <- {value:#04X}");
        self.set_register(register, value);
        self.wait
    }
}
