//! Host/second-processor contract for Tube coprocessor emulation.
//!
//! A coprocessor owns its own RAM and ROM. Everything else (the Tube ULA
//! registers and the window of parasite address space that maps onto them)
//! belongs to the host and is reached through a [`ParasiteBus`].

mod bus;
mod coprocessor;
mod observable;

pub use bus::{ParasiteBus, ReadResult, SimpleBus};
pub use coprocessor::Coprocessor;
pub use observable::{Observable, Value};
