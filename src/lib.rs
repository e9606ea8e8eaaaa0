//! # flagsim
//!
//! A small instruction-set simulator with an x86 flavour.
//!
//! The machine has four signed 64-bit registers, the ZF/SF/CF/OF flags and a
//! flat instruction memory. Programs are plain text, one instruction per
//! line, and run through a fetch-decode-execute loop over five instructions:
//! ADD, SBB, ADOX, JMP and JGE.

pub mod cpu;
pub mod asm;
pub mod shell;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Flag, Flags, Instruction, Memory, Op, Register, Registers, RunOutcome};
pub use asm::{load_program, load_snapshot, save_snapshot, ProgramFile, ProgramError, SnapshotError};
pub use shell::Shell;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
