//! Debugger application state and logic.

use crate::cpu::{Cpu, CpuError};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Program lines, reloaded on reset.
    pub program: Vec<String>,
    /// Load address of the program.
    pub base: usize,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Let the next tick execute past a breakpoint at the current PC.
    resume: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<String>, base: usize) -> Self {
        let mut cpu = Cpu::new();
        cpu.load(base, &program);
        cpu.regs.jump(base);

        Self {
            cpu,
            program,
            base,
            breakpoints: HashSet::new(),
            running: false,
            resume: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: base,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.cpu.pc();
        match self.cpu.step() {
            Ok(op) => {
                self.status = format!("PC={:03}: {}", pc, op);
            }
            Err(CpuError::OutOfBounds { .. }) => {
                self.status = format!("Program finished after {} cycles", self.cpu.cycles);
                self.running = false;
            }
            Err(e) => {
                self.status = format!("Error at PC={:03}: {}", pc, e);
                self.running = false;
            }
        }
    }

    /// Run until the program finishes, a breakpoint, or an error.
    pub fn run(&mut self) {
        self.running = true;
        self.resume = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let pc = self.cpu.pc();
        if self.breakpoints.contains(&pc) && !self.resume {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }
        self.resume = false;

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reset CPU to initial state with the program reloaded.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.cpu.load(self.base, &self.program);
        self.cpu.regs.jump(self.base);
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Get the listing around the current PC.
    pub fn get_listing(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let pc = self.cpu.pc();
        let start = pc.saturating_sub(lines / 2);

        (start..start.saturating_add(lines))
            .filter(|&addr| addr < self.cpu.mem.end())
            .map(|addr| {
                let text = self
                    .cpu
                    .instruction(addr)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<empty>".into());
                (addr, text, addr == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program loaded at `base`.
pub fn run_debugger(program: Vec<String>, base: usize) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, base);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                        KeyCode::Down => {
                            if app.mem_scroll.saturating_add(1) < app.cpu.mem.end() {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Vec<String> {
        ["ADD rax, 5", "JGE 3", "ADD rbx, 10", "ADD rbx, 20"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_step_and_finish() {
        let mut app = DebuggerApp::new(program(), 0);
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.cpu.regs.rbx, 20);
        assert!(app.status.starts_with("Program finished"));
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(program(), 0);
        app.cpu.regs.jump(3);
        app.toggle_breakpoint();
        app.cpu.regs.jump(0);

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.cpu.pc(), 3);
        assert_eq!(app.status, "Breakpoint at PC=3");

        // Resuming from a breakpoint executes it.
        app.run();
        app.tick();
        assert_eq!(app.cpu.regs.rbx, 20);
    }

    #[test]
    fn test_error_stops_run() {
        let mut app = DebuggerApp::new(vec!["HLT".into()], 0);
        app.run();
        app.tick();
        assert!(!app.running);
        assert!(app.status.contains("unknown instruction: HLT"));
    }

    #[test]
    fn test_reset_reloads_at_base() {
        let mut app = DebuggerApp::new(program(), 4);
        app.step();
        assert_eq!(app.cpu.regs.rax, 5);

        app.reset();
        assert_eq!(app.cpu.regs.rax, 0);
        assert_eq!(app.cpu.pc(), 4);
        assert_eq!(app.cpu.mem.end(), 8);
    }

    #[test]
    fn test_listing_marks_pc() {
        let app = DebuggerApp::new(program(), 0);
        let listing = app.get_listing(6);
        assert_eq!(listing.len(), 4);
        assert_eq!(listing[0], (0, "ADD rax, 5".to_string(), true));
        assert!(!listing[1].2);
    }

    #[test]
    fn test_listing_near_top_of_address_space() {
        let mut app = DebuggerApp::new(program(), usize::MAX - 2);
        assert_eq!(app.cpu.mem.end(), usize::MAX);
        app.cpu.regs.jump(usize::MAX - 1);

        let listing = app.get_listing(8);
        assert_eq!(listing.len(), 5);
        assert_eq!(listing[3], (usize::MAX - 2, "ADD rax, 5".to_string(), false));
        assert_eq!(listing[4], (usize::MAX - 1, "JGE 3".to_string(), true));
    }
}
