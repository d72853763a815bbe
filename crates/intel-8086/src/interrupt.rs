//! Interrupt lines and the single pending-vector latch.
//!
//! There is exactly one pending slot. Faults, software interrupts and the
//! external lines all write to it, and a later request replaces an earlier
//! one that has not yet been serviced.

/// Divide error.
pub const DIVIDE_ERROR: u8 = 0;
/// Single-step trap.
pub const SINGLE_STEP: u8 = 1;
/// Non-maskable interrupt.
pub const NMI: u8 = 2;
/// INT3.
pub const BREAKPOINT: u8 = 3;
/// INTO with OF set.
pub const OVERFLOW: u8 = 4;
/// BOUND range exceeded.
pub const BOUND_RANGE: u8 = 5;
/// Invalid or unsupported opcode.
pub const INVALID_OPCODE: u8 = 6;
/// ESC with no coprocessor (or MSW.EM set).
pub const NO_FPU: u8 = 7;

/// Cost of an interrupt transfer.
pub const SERVICE_CYCLES: i32 = 50;

#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    pending: Option<u8>,
    /// Request displaced by a single-step trap, restored once the trap has
    /// been taken.
    pre_trace: Option<u8>,
    irq: bool,
    irq_vector: u8,
    nmi_line: bool,
    nmi_latched: bool,
    /// The pending request came from an external line.
    external: bool,
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything except the line levels, which belong to the host.
    pub fn reset(&mut self) {
        self.pending = None;
        self.pre_trace = None;
        self.nmi_latched = false;
        self.external = false;
    }

    #[must_use]
    pub fn pending(&self) -> Option<u8> {
        self.pending
    }

    /// Request a vector, replacing whatever was pending.
    pub fn raise(&mut self, vector: u8) {
        if let Some(previous) = self.pending {
            log::debug!("vector {vector} replaces pending vector {previous}");
        }
        self.pending = Some(vector);
        self.external = false;
    }

    pub fn set_irq(&mut self, asserted: bool) {
        self.irq = asserted;
    }

    /// Vector supplied with the next maskable interrupt.
    pub fn set_irq_vector(&mut self, vector: u8) {
        self.irq_vector = vector;
    }

    /// Drive the NMI line. A rising edge latches a request.
    pub fn set_nmi(&mut self, asserted: bool) {
        if asserted && !self.nmi_line {
            self.nmi_latched = true;
        }
        self.nmi_line = asserted;
    }

    /// Sample the lines at an instruction boundary. IRQ is sampled before
    /// NMI, so NMI wins when both arrive together.
    pub fn sample(&mut self, interrupts_enabled: bool) {
        if self.irq && interrupts_enabled {
            self.raise(self.irq_vector);
            self.external = true;
        }
        if self.nmi_latched {
            self.nmi_latched = false;
            self.raise(NMI);
            self.external = true;
        }
    }

    /// True when the pending request came from a line rather than from
    /// the instruction stream.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.pending.is_some() && self.external
    }

    /// Queue a single-step trap after the current instruction, keeping
    /// whatever it raised for afterwards.
    pub fn trap(&mut self) {
        self.pre_trace = self.pending;
        self.pending = Some(SINGLE_STEP);
        self.external = false;
    }

    /// Take the pending vector for servicing.
    pub fn take(&mut self) -> Option<u8> {
        let vector = self.pending.take()?;
        self.external = false;
        if vector == SINGLE_STEP {
            self.pending = self.pre_trace.take();
        }
        Some(vector)
    }
}
