//! Second-processor trait.

use crate::ParasiteBus;

/// A Tube second processor.
///
/// The host resets the core once its firmware is loaded and then hands it
/// cycle budgets. The bus is passed in rather than owned so the host can
/// keep driving its own side of the Tube between calls.
pub trait Coprocessor {
    /// The type used for register inspection.
    type Registers;

    /// Reinitialise registers, flags and RAM to power-up state.
    ///
    /// ROM contents survive a reset.
    fn reset(&mut self);

    /// Run instructions until `cycles` are spent or the core halts.
    ///
    /// Budget left over (positive or negative) carries into the next call.
    fn exec<B: ParasiteBus>(&mut self, bus: &mut B, cycles: i32);

    /// Host-side memory probe. Same routing as a CPU access, including any
    /// effect on boot-time ROM overlays.
    fn read_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32) -> u8;

    /// Host-side memory write. Same routing as a CPU access.
    fn write_byte<B: ParasiteBus>(&mut self, bus: &mut B, address: u32, value: u8);

    /// Linear address of the next instruction.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the core is halted.
    fn is_halted(&self) -> bool;

    /// Drive the maskable interrupt line.
    fn set_irq(&mut self, asserted: bool);

    /// Drive the non-maskable interrupt line.
    fn set_nmi(&mut self, asserted: bool);

    /// Enable or disable per-instruction trace logging.
    fn set_debug(&mut self, enabled: bool);
}
