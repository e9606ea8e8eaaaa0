//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag view
//! - Memory view around the loaded range
//! - Step/run/breakpoint controls
//! - Program listing around the PC

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
