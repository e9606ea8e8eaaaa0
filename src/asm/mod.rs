//! Program files, diagnostics and snapshots.
//!
//! This module provides:
//! - A line-oriented program file reader/writer
//! - Register, flag and memory listings
//! - JSON snapshots of the whole machine

pub mod program;
pub mod disasm;
pub mod snapshot;

pub use program::{ProgramFile, ProgramError, load_program, save_program};
pub use disasm::{disassemble, format_flags, format_instruction, format_memory, format_registers};
pub use snapshot::{SnapshotError, load_snapshot, save_snapshot};
