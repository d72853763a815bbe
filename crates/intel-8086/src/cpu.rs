//! The 8086-family core: state, memory helpers and the run loop.

mod execute;
mod string;
mod system;

use copro_core::{Coprocessor, Observable, ParasiteBus, Value};

use crate::decode::{Class, OPCODES};
use crate::flags::{self, Flags, IF, TF};
use crate::interrupt::{self, InterruptController};
use crate::io::IoSpace;
use crate::memory::AddressSpace;
use crate::model::{CpuCapabilities, CpuModel, Isa};
use crate::profile::{HardwareProfile, ProfileError};
use crate::registers::{Registers, SP, Segment};

/// Log target for the per-instruction register trace.
pub const TRACE_TARGET: &str = "intel_8086::trace";

/// Longest run of prefixes accepted before the byte stream is treated as
/// garbage.
const MAX_PREFIXES: u32 = 14;

/// Repeat prefix in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repeat {
    /// F3: REP / REPZ.
    WhileEqual,
    /// F2: REPNZ.
    WhileNotEqual,
}

/// Prefixes gathered ahead of the current opcode.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Prefixes {
    pub segment: Option<Segment>,
    pub repeat: Option<Repeat>,
}

/// Intel 8088/8086/80188/80186/80286 second processor.
pub struct I86 {
    /// CPU registers.
    pub regs: Registers,
    profile: HardwareProfile,
    caps: CpuCapabilities,
    mem: AddressSpace,
    io: IoSpace,
    interrupts: InterruptController,
    /// Cycles left to run. May go negative by the overrun of the last
    /// instruction.
    budget: i32,
    total_cycles: u64,
    halted: bool,
    debug: bool,

    // Per-instruction decode state.
    pub(crate) prefix: Prefixes,
    /// IP of the first prefix or opcode byte of the current instruction.
    pub(crate) start_ip: u16,
    /// Cost of the current instruction so far.
    pub(crate) cycles: i32,
}

impl I86 {
    /// Build a core for a hardware profile. RAM and ROM start zeroed; load
    /// firmware and call `reset` before running.
    pub fn new(profile: HardwareProfile) -> Result<Self, ProfileError> {
        if let Err(e) = profile.validate() {
            log::error!("rejected hardware profile: {e}");
            return Err(e);
        }
        Ok(Self::build(profile))
    }

    fn build(profile: HardwareProfile) -> Self {
        let caps = profile.model.capabilities();
        let mut cpu = Self {
            regs: Registers::new(),
            profile,
            caps,
            mem: AddressSpace::new(&profile),
            io: IoSpace::new(caps.peripheral_block),
            interrupts: InterruptController::new(),
            budget: 0,
            total_cycles: 0,
            halted: false,
            debug: false,
            prefix: Prefixes::default(),
            start_ip: 0,
            cycles: 0,
        };
        cpu.power_on();
        cpu
    }

    #[must_use]
    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    #[must_use]
    pub fn model(&self) -> CpuModel {
        self.profile.model
    }

    #[must_use]
    pub fn memory(&self) -> &AddressSpace {
        &self.mem
    }

    /// Copy a firmware image into ROM. Returns the number of bytes used.
    pub fn load_rom(&mut self, image: &[u8]) -> usize {
        let rom_size = self.profile.rom_size;
        if image.len() != rom_size {
            log::warn!(
                "firmware image is {} bytes, ROM is {rom_size}",
                image.len()
            );
        }
        self.mem.load_rom(image)
    }

    /// Vector waiting to be taken at the next instruction boundary.
    #[must_use]
    pub fn pending_interrupt(&self) -> Option<u8> {
        self.interrupts.pending()
    }

    /// Vector supplied with the maskable interrupt line.
    pub fn set_irq_vector(&mut self, vector: u8) {
        self.interrupts.set_irq_vector(vector);
    }

    /// Cycles run since reset.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Budget carried into the next `exec`.
    #[must_use]
    pub fn budget(&self) -> i32 {
        self.budget
    }

    /// Protected mode enabled (80286 MSW.PE).
    #[must_use]
    pub fn protected_mode(&self) -> bool {
        self.regs.msw & flags::MSW_PE != 0
    }

    fn power_on(&mut self) {
        self.regs = Registers::new();
        self.regs.set_seg(Segment::Cs, self.caps.reset_cs);
        self.regs.ip = self.caps.reset_ip;
        self.regs.msw = self.caps.reset_msw;
        self.regs.flags = Flags::RESET;
        self.mem.reset();
        self.io.reset();
        self.interrupts.reset();
        self.budget = 0;
        self.total_cycles = 0;
        self.halted = false;
        self.prefix = Prefixes::default();
        self.start_ip = self.regs.ip;
        self.cycles = 0;
    }

    // =========================================================================
    // Memory and stack
    // =========================================================================

    fn physical(&self, segment: Segment, offset: u16) -> u32 {
        self.mem.physical(self.regs.seg(segment), offset)
    }

    /// Override segment if one is active, otherwise `default`.
    pub(crate) fn data_segment(&self, default: Segment) -> Segment {
        self.prefix.segment.unwrap_or(default)
    }

    pub(crate) fn read8<B: ParasiteBus>(&mut self, bus: &mut B, segment: Segment, offset: u16) -> u8 {
        let address = self.physical(segment, offset);
        self.mem.read_byte(bus, address)
    }

    /// Word read; the high byte wraps within the segment.
    pub(crate) fn read16<B: ParasiteBus>(&mut self, bus: &mut B, segment: Segment, offset: u16) -> u16 {
        let lo = self.read8(bus, segment, offset);
        let hi = self.read8(bus, segment, offset.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write8<B: ParasiteBus>(&mut self, bus: &mut B, segment: Segment, offset: u16, value: u8) {
        let address = self.physical(segment, offset);
        self.mem.write_byte(bus, address, value);
    }

    pub(crate) fn write16<B: ParasiteBus>(
        &mut self,
        bus: &mut B,
        segment: Segment,
        offset: u16,
        value: u16,
    ) {
        let [lo, hi] = value.to_le_bytes();
        self.write8(bus, segment, offset, lo);
        self.write8(bus, segment, offset.wrapping_add(1), hi);
    }

    pub(crate) fn fetch8<B: ParasiteBus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read8(bus, Segment::Cs, self.regs.ip);
        self.regs.ip = self.regs.ip.wrapping_add(1);
        value
    }

    pub(crate) fn fetch16<B: ParasiteBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus);
        let hi = self.fetch8(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn push<B: ParasiteBus>(&mut self, bus: &mut B, value: u16) {
        let sp = self.regs.sp().wrapping_sub(2);
        self.regs.set_sp(sp);
        self.write16(bus, Segment::Ss, sp, value);
    }

    pub(crate) fn pop<B: ParasiteBus>(&mut self, bus: &mut B) -> u16 {
        let sp = self.regs.sp();
        let value = self.read16(bus, Segment::Ss, sp);
        self.regs.gp[SP] = sp.wrapping_add(2);
        value
    }

    /// FLAGS as pushed by PUSHF and interrupts.
    pub(crate) fn flags_image(&self) -> u16 {
        self.regs.flags.image(self.caps.flags_high_set)
    }

    pub(crate) fn isa(&self) -> Isa {
        self.caps.isa
    }

    // =========================================================================
    // I/O
    // =========================================================================

    pub(crate) fn port_in8<B: ParasiteBus>(&mut self, bus: &mut B, port: u16) -> u8 {
        let result = self.io.read(bus, port);
        self.cycles += i32::from(result.wait);
        result.data
    }

    pub(crate) fn port_in16<B: ParasiteBus>(&mut self, bus: &mut B, port: u16) -> u16 {
        let lo = self.port_in8(bus, port);
        let hi = self.port_in8(bus, port.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn port_out8<B: ParasiteBus>(&mut self, bus: &mut B, port: u16, value: u8) {
        let wait = self.io.write(bus, port, value);
        self.cycles += i32::from(wait);
    }

    pub(crate) fn port_out16<B: ParasiteBus>(&mut self, bus: &mut B, port: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.port_out8(bus, port, lo);
        self.port_out8(bus, port.wrapping_add(1), hi);
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    /// Raise a fault. Restartable faults report the address of the faulting
    /// instruction; an 8086 divide error reports the next one.
    pub(crate) fn fault(&mut self, vector: u8) {
        if self.caps.restartable_faults || vector != interrupt::DIVIDE_ERROR {
            self.regs.ip = self.start_ip;
        }
        self.interrupts.raise(vector);
    }

    pub(crate) fn invalid_opcode(&mut self, opcode: u8) {
        log::debug!(
            "invalid opcode {opcode:02X} at {:04X}:{:04X} on {}",
            self.regs.cs(),
            self.start_ip,
            self.profile.model.name()
        );
        self.fault(interrupt::INVALID_OPCODE);
    }

    /// Software interrupt: taken after the instruction completes.
    pub(crate) fn software_interrupt(&mut self, vector: u8) {
        self.interrupts.raise(vector);
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Push FLAGS, CS and IP and enter the handler for `vector`.
    fn service_interrupt<B: ParasiteBus>(&mut self, bus: &mut B, vector: u8) {
        let image = self.flags_image();
        self.push(bus, image);
        self.push(bus, self.regs.cs());
        self.push(bus, self.regs.ip);
        self.regs.flags.clear(IF | TF);
        // The 80286 keeps the real-mode table wherever LIDT put it.
        let table = if self.caps.isa >= Isa::I80286 {
            self.regs.idtr.base
        } else {
            0
        };
        let entry = table.wrapping_add(u32::from(vector) * 4);
        self.regs.ip = self.mem.read_word(bus, entry);
        let cs = self.mem.read_word(bus, entry.wrapping_add(2));
        self.regs.set_seg(Segment::Cs, cs);
        let cost = interrupt::SERVICE_CYCLES + self.mem.take_wait_states() as i32;
        self.budget -= cost;
        self.total_cycles += cost as u64;
    }

    /// Sample the lines and take any pending vector. A halted core only
    /// wakes for an external request.
    fn poll_interrupts<B: ParasiteBus>(&mut self, bus: &mut B) {
        let enabled = self.regs.flags.is_set(IF);
        self.interrupts.sample(enabled);
        if self.halted {
            if !self.interrupts.is_external() {
                return;
            }
            self.halted = false;
        }
        if let Some(vector) = self.interrupts.take() {
            self.service_interrupt(bus, vector);
        }
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    /// Execute one instruction, prefixes included.
    fn step<B: ParasiteBus>(&mut self, bus: &mut B) {
        let trace = self.debug && log::log_enabled!(target: TRACE_TARGET, log::Level::Trace);
        let snapshot = trace.then(|| self.snapshot());
        let address = self.physical(Segment::Cs, self.regs.ip);

        self.start_ip = self.regs.ip;
        self.prefix = Prefixes::default();
        self.cycles = 0;
        let single_step = self.regs.flags.is_set(TF);

        let mut opcode = self.fetch8(bus);
        let mut prefixes = 0;
        while OPCODES[usize::from(opcode)].class == Class::Prefix {
            if prefixes == MAX_PREFIXES {
                self.invalid_opcode(opcode);
                self.finish(single_step);
                return;
            }
            self.apply_prefix(opcode);
            self.cycles += i32::from(OPCODES[usize::from(opcode)].cycles);
            prefixes += 1;
            opcode = self.fetch8(bus);
        }

        let descriptor = OPCODES[usize::from(opcode)];
        if let Some(snapshot) = snapshot {
            log::trace!(
                target: TRACE_TARGET,
                "{address:06X} {opcode:02X} {:<7} {snapshot}",
                descriptor.mnemonic
            );
        }

        self.cycles += i32::from(descriptor.cycles);
        if descriptor.class == Class::Invalid || descriptor.isa > self.caps.isa {
            self.invalid_opcode(opcode);
        } else {
            self.execute(bus, opcode);
        }
        self.finish(single_step);
    }

    fn apply_prefix(&mut self, opcode: u8) {
        match opcode {
            0x26 | 0x2E | 0x36 | 0x3E => {
                self.prefix.segment = Some(Segment::from_bits(opcode >> 3));
            }
            // LOCK: the board has no other bus master.
            0xF0 => {}
            0xF2 => self.prefix.repeat = Some(Repeat::WhileNotEqual),
            _ => self.prefix.repeat = Some(Repeat::WhileEqual),
        }
    }

    /// Charge the instruction and queue the single-step trap.
    fn finish(&mut self, single_step: bool) {
        let cost = self.cycles + self.mem.take_wait_states() as i32;
        self.budget -= cost;
        self.total_cycles += cost as u64;
        if single_step {
            self.interrupts.trap();
        }
    }

    /// Take any pending interrupt and run exactly one instruction, leaving
    /// the budget alone. Returns the cycles spent.
    pub fn step_instruction<B: ParasiteBus>(&mut self, bus: &mut B) -> u64 {
        let before = self.total_cycles;
        let budget = self.budget;
        self.poll_interrupts(bus);
        if !self.halted {
            self.step(bus);
        }
        self.budget = budget;
        self.total_cycles - before
    }

    /// Run until the budget is spent or the core halts.
    pub fn run<B: ParasiteBus>(&mut self, bus: &mut B, cycles: i32) {
        self.budget = self.budget.saturating_add(cycles);
        while self.budget > 0 {
            self.poll_interrupts(bus);
            if self.halted {
                // Idle time is not banked.
                self.budget = 0;
                break;
            }
            self.step(bus);
        }
    }
}

impl Default for I86 {
    fn default() -> Self {
        Self::build(HardwareProfile::default())
    }
}

impl Coprocessor for I86 {
    type Registers = Registers;

    fn reset(&mut self) {
        log::info!("{} second processor reset", self.profile.model.name());
        self.power_on();
    }

    fn exec<B: ParasiteBus>(&mut self, bus: &mut B, cycles: i32) {
        self.run(bus, cycles);
    }

    fn read_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> u8 {
        self.mem.read_byte(bus, address)
    }

    fn write_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32, value: u8) {
        self.mem.write_byte(bus, address, value);
    }

    fn pc(&self) -> u32 {
        self.physical(Segment::Cs, self.regs.ip)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn set_irq(&mut self, asserted: bool) {
        self.interrupts.set_irq(asserted);
    }

    fn set_nmi(&mut self, asserted: bool) {
        self.interrupts.set_nmi(asserted);
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }
}

impl Observable for I86 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |bit| Some(Value::Bool(r.flags.is_set(bit)));
        match path {
            "ip" => Some(r.ip.into()),
            "ax" => Some(r.ax().into()),
            "bx" => Some(r.bx().into()),
            "cx" => Some(r.cx().into()),
            "dx" => Some(r.dx().into()),
            "si" => Some(r.si().into()),
            "di" => Some(r.di().into()),
            "bp" => Some(r.bp().into()),
            "sp" => Some(r.sp().into()),
            "cs" => Some(r.cs().into()),
            "ds" => Some(r.ds().into()),
            "es" => Some(r.es().into()),
            "ss" => Some(r.ss().into()),
            "flags" => Some(r.flags.0.into()),
            "flags.cf" => flag(flags::CF),
            "flags.pf" => flag(flags::PF),
            "flags.af" => flag(flags::AF),
            "flags.zf" => flag(flags::ZF),
            "flags.sf" => flag(flags::SF),
            "flags.tf" => flag(flags::TF),
            "flags.if" => flag(flags::IF),
            "flags.df" => flag(flags::DF),
            "flags.of" => flag(flags::OF),
            "msw" => Some(r.msw.into()),
            "pc" => Some(self.pc().into()),
            "halted" => Some(self.halted.into()),
            "boot_flag" => Some(self.mem.boot_flag().into()),
            "cycles" => Some(self.total_cycles.into()),
            "pending" => self.interrupts.pending().map(Value::from),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        if self.caps.isa >= Isa::I80286 {
            &[
                "ip", "ax", "bx", "cx", "dx", "si", "di", "bp", "sp", "cs", "ds", "es", "ss",
                "flags", "msw",
            ]
        } else {
            &[
                "ip", "ax", "bx", "cx", "dx", "si", "di", "bp", "sp", "cs", "ds", "es", "ss",
                "flags",
            ]
        }
    }
}
