//! CPU emulation.
//!
//! This module implements the complete machine:
//! - 4 general purpose registers: rax, rbx, rcx, rdx (64-bit signed)
//! - 4 flags: ZF, SF, CF, OF
//! - a flat instruction memory indexed by address
//! - a 5-instruction set: ADD, SBB, ADOX, JMP, JGE

pub mod memory;
pub mod registers;
pub mod decode;
pub mod operand;
pub mod execute;

pub use memory::Memory;
pub use registers::{Flag, Flags, Register, Registers, UnknownName};
pub use decode::{Instruction, Op};
pub use execute::{Cpu, CpuError, RunOutcome};
