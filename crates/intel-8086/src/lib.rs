//! Intel 8088/80186/80286 Tube second-processor core.
//!
//! Each call to `exec()` runs whole instructions until the cycle budget is
//! spent. Cycle costs are additive per instruction, not bus-cycle exact.

mod alu;
mod cpu;
mod decode;
mod firmware;
mod flags;
mod interrupt;
mod io;
mod memory;
mod model;
mod modrm;
mod profile;
mod registers;

pub use alu::{AluResult, ShiftOp, Width};
pub use cpu::{I86, TRACE_TARGET};
pub use decode::{Class, Extended, Group, OPCODES, Opcode, SubOp};
pub use firmware::{FirmwareError, load_firmware};
pub use flags::{AF, CF, DF, Flags, IF, MSW_EM, MSW_MP, MSW_PE, MSW_TS, OF, PF, SF, TF, ZF};
pub use interrupt::{
    BOUND_RANGE, BREAKPOINT, DIVIDE_ERROR, INVALID_OPCODE, NMI, NO_FPU, OVERFLOW, SINGLE_STEP,
};
pub use memory::AddressSpace;
pub use model::{CpuCapabilities, CpuModel, Isa};
pub use modrm::{ModRm, Operand};
pub use profile::{HardwareProfile, ProfileError};
pub use registers::{DescriptorTable, OffsetRegister, Registers, Segment, SegmentCache};
