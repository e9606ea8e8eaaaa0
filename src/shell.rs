//! Interactive command shell.
//!
//! Reads one command per line and drives a single [`Cpu`]. Errors from the
//! engine or from a command are printed and the session keeps going; only
//! `quit` or end of input ends it.

use crate::asm::{self, disasm};
use crate::cpu::{Cpu, CpuError, RunOutcome};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Default cycle budget for `run` without an argument.
pub const DEFAULT_MAX_CYCLES: u64 = 10_000;

const HELP: &str = "\
Commands:
  load <addr> <file>   load a program file at <addr>
  step [n]             execute n instructions (default 1)
  run [max]            run until the program finishes or max cycles
  regs                 show registers
  flags                show flags
  mem <addr> <size>    show instructions in [addr, addr+size)
  inst <addr>          show the instruction at addr
  dis                  list the loaded program
  pc                   show the program counter
  reset                clear registers, flags and memory
  save <file>          write a JSON snapshot
  restore <file>       read a JSON snapshot
  help                 show this text
  quit                 leave the shell";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load { addr: usize, path: String },
    Step(u64),
    Run(u64),
    Regs,
    Flags,
    Mem { addr: usize, size: usize },
    Inst(usize),
    Dis,
    Pc,
    Reset,
    Save(String),
    Restore(String),
    Help,
    Quit,
    Empty,
}

impl Command {
    /// Parse a command line.
    pub fn parse(line: &str) -> Result<Command, ShellError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = parts.split_first() else {
            return Ok(Command::Empty);
        };

        let cmd = match (name, args) {
            ("load", [addr, path]) => Command::Load { addr: number(addr)?, path: path.to_string() },
            ("step" | "s", []) => Command::Step(1),
            ("step" | "s", [n]) => Command::Step(number(n)?),
            ("run" | "r", []) => Command::Run(DEFAULT_MAX_CYCLES),
            ("run" | "r", [max]) => Command::Run(number(max)?),
            ("regs", []) => Command::Regs,
            ("flags", []) => Command::Flags,
            ("mem", [addr, size]) => Command::Mem { addr: number(addr)?, size: number(size)? },
            ("inst", [addr]) => Command::Inst(number(addr)?),
            ("dis", []) => Command::Dis,
            ("pc", []) => Command::Pc,
            ("reset", []) => Command::Reset,
            ("save", [path]) => Command::Save(path.to_string()),
            ("restore", [path]) => Command::Restore(path.to_string()),
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            (
                "load" | "step" | "s" | "run" | "r" | "regs" | "flags" | "mem" | "inst" | "dis"
                | "pc" | "reset" | "save" | "restore" | "help" | "?" | "quit" | "exit" | "q",
                _,
            ) => return Err(ShellError::Usage(name.to_string())),
            _ => return Err(ShellError::UnknownCommand(name.to_string())),
        };
        Ok(cmd)
    }
}

fn number<T: std::str::FromStr>(token: &str) -> Result<T, ShellError> {
    token.parse().map_err(|_| ShellError::BadNumber(token.to_string()))
}

/// Errors in shell input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    #[error("unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("wrong arguments for '{0}' (try 'help')")]
    Usage(String),

    #[error("not a number: {0}")]
    BadNumber(String),
}

/// The interactive shell.
pub struct Shell<R, W> {
    /// The machine being driven.
    pub cpu: Cpu,
    input: R,
    output: W,
    prompt: bool,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// Create a shell over the given input and output.
    pub fn new(cpu: Cpu, input: R, output: W) -> Self {
        Self { cpu, input, output, prompt: true }
    }

    /// Disable the `> ` prompt (for scripted input).
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    /// Read and execute commands until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let mut line = String::new();
        loop {
            if self.prompt {
                write!(self.output, "> ")?;
                self.output.flush()?;
            }

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            match Command::parse(&line) {
                Ok(Command::Quit) => return Ok(()),
                Ok(cmd) => self.execute(cmd)?,
                Err(e) => writeln!(self.output, "error: {}", e)?,
            }
        }
    }

    /// Execute a single command.
    pub fn execute(&mut self, cmd: Command) -> io::Result<()> {
        match cmd {
            Command::Load { addr, path } => match asm::load_program(&path) {
                Ok(program) => {
                    self.cpu.load(addr, &program.lines);
                    writeln!(
                        self.output,
                        "loaded {} lines at {} (end {})",
                        program.len(),
                        addr,
                        self.cpu.mem.end()
                    )?;
                }
                Err(e) => writeln!(self.output, "error: {}", e)?,
            },
            Command::Step(n) => {
                for _ in 0..n {
                    let pc = self.cpu.pc();
                    match self.cpu.step() {
                        Ok(op) => writeln!(self.output, "{:03}: {}", pc, op)?,
                        Err(e) => {
                            self.report(&e)?;
                            break;
                        }
                    }
                }
            }
            Command::Run(max) => match self.cpu.run_limited(max) {
                Ok(RunOutcome::Finished { cycles }) => {
                    writeln!(self.output, "program finished after {} cycles", cycles)?
                }
                Ok(RunOutcome::CycleLimit { cycles }) => {
                    writeln!(self.output, "stopped after {} cycles (limit reached)", cycles)?
                }
                Err(e) => self.report(&e)?,
            },
            Command::Regs => write!(self.output, "{}", disasm::format_registers(&self.cpu))?,
            Command::Flags => writeln!(self.output, "{}", disasm::format_flags(&self.cpu))?,
            Command::Mem { addr, size } => {
                write!(self.output, "{}", disasm::format_memory(&self.cpu, addr, size))?
            }
            Command::Inst(addr) => {
                writeln!(self.output, "{}", disasm::format_instruction(&self.cpu, addr))?
            }
            Command::Dis => write!(self.output, "{}", disasm::disassemble(&self.cpu))?,
            Command::Pc => writeln!(self.output, "pc: {}", self.cpu.pc())?,
            Command::Reset => {
                self.cpu.reset();
                writeln!(self.output, "reset")?;
            }
            Command::Save(path) => match asm::save_snapshot(&path, &self.cpu) {
                Ok(()) => writeln!(self.output, "saved {}", path)?,
                Err(e) => writeln!(self.output, "error: {}", e)?,
            },
            Command::Restore(path) => match asm::load_snapshot(&path) {
                Ok(cpu) => {
                    self.cpu = cpu;
                    writeln!(self.output, "restored {}", path)?;
                }
                Err(e) => writeln!(self.output, "error: {}", e)?,
            },
            Command::Help => writeln!(self.output, "{}", HELP)?,
            Command::Quit | Command::Empty => {}
        }
        Ok(())
    }

    fn report(&mut self, err: &CpuError) -> io::Result<()> {
        match err {
            CpuError::OutOfBounds { .. } => writeln!(self.output, "program finished"),
            e => writeln!(self.output, "error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn session(cpu: Cpu, script: &str) -> (Cpu, String) {
        let mut out = Vec::new();
        let cpu = {
            let mut shell = Shell::new(cpu, Cursor::new(script.as_bytes()), &mut out).without_prompt();
            shell.run().unwrap();
            shell.cpu
        };
        (cpu, String::from_utf8(out).unwrap())
    }

    fn scenario_cpu() -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load(0, &["ADD rax, 5", "JGE 3", "ADD rbx, 10", "ADD rbx, 20"]);
        cpu
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("step").unwrap(), Command::Step(1));
        assert_eq!(Command::parse("  step 4 ").unwrap(), Command::Step(4));
        assert_eq!(Command::parse("mem 2 8").unwrap(), Command::Mem { addr: 2, size: 8 });
        assert_eq!(Command::parse("").unwrap(), Command::Empty);
        assert_eq!(Command::parse("run").unwrap(), Command::Run(DEFAULT_MAX_CYCLES));
        assert_eq!(Command::parse("jump 3"), Err(ShellError::UnknownCommand("jump".into())));
        assert_eq!(Command::parse("mem 2"), Err(ShellError::Usage("mem".into())));
        assert_eq!(Command::parse("inst x"), Err(ShellError::BadNumber("x".into())));
    }

    #[test]
    fn test_step_and_inspect() {
        let (cpu, out) = session(scenario_cpu(), "step 2\nregs\nflags\npc\n");
        assert_eq!(cpu.pc(), 3);
        assert!(out.contains("000: ADD rax, 5\n"));
        assert!(out.contains("001: JGE 3\n"));
        assert!(out.contains("rax: 5\n"));
        assert!(out.contains("ZF=0 SF=0 CF=0 OF=0\n"));
        assert!(out.contains("pc: 3\n"));
    }

    #[test]
    fn test_run_reports_finish() {
        let (cpu, out) = session(scenario_cpu(), "run\nstep\n");
        assert_eq!(cpu.regs.rbx, 20);
        assert!(out.contains("program finished after 3 cycles\n"));
        assert!(out.ends_with("program finished\n"));
    }

    #[test]
    fn test_errors_keep_session_alive() {
        let mut cpu = Cpu::new();
        cpu.load(0, &["ADD rax, nope"]);
        let (cpu, out) = session(cpu, "bogus\nstep\ninst 0\nquit\nregs\n");

        assert!(out.contains("error: unknown command: bogus"));
        assert!(out.contains("error: invalid operand: nope\n"));
        assert!(out.contains("Instruction at 0: ADD rax, nope\n"));
        // Nothing after quit is executed.
        assert!(!out.contains("Registers:"));
        assert_eq!(cpu.pc(), 0);
    }

    #[test]
    fn test_load_and_save_restore() {
        let dir = std::env::temp_dir();
        let program = dir.join(format!("flagsim-shell-{}.txt", std::process::id()));
        let snapshot = dir.join(format!("flagsim-shell-{}.json", std::process::id()));
        std::fs::write(&program, "ADD rcx, 2\nADD rcx, rcx\n").unwrap();

        let script = format!(
            "load 0 {p}\nrun\nsave {s}\nreset\nrestore {s}\nregs\n",
            p = program.display(),
            s = snapshot.display()
        );
        let (cpu, out) = session(Cpu::new(), &script);

        assert!(out.contains("loaded 2 lines at 0 (end 2)"));
        assert!(out.contains("rcx: 4\n"));
        assert_eq!(cpu.regs.rcx, 4);

        std::fs::remove_file(&program).unwrap();
        std::fs::remove_file(&snapshot).unwrap();
    }

    #[test]
    fn test_load_at_huge_address_keeps_session() {
        let program = std::env::temp_dir().join(format!("flagsim-high-{}.txt", std::process::id()));
        std::fs::write(&program, "ADD rax, 1\n").unwrap();

        let script = format!(
            "load 18446744073709551615 {p}\npc\nload 1099511627776 {p}\ndis\npc\n",
            p = program.display()
        );
        let (cpu, out) = session(Cpu::new(), &script);

        assert!(out.contains("loaded 1 lines at 18446744073709551615 (end 18446744073709551615)\n"));
        assert!(out.contains("loaded 1 lines at 1099511627776 (end 1099511627777)\n"));
        assert!(out.contains("  1099511627776: ADD rax, 1\n"));
        assert_eq!(out.matches("pc: 0\n").count(), 2);
        assert_eq!(cpu.mem.occupied(), 2);

        std::fs::remove_file(&program).unwrap();
    }

    #[test]
    fn test_huge_mem_listing_is_clamped() {
        let (_, out) = session(scenario_cpu(), "mem 0 18446744073709551615\npc\n");

        assert!(out.contains("Instruction at 1: JGE 3\n"));
        assert!(out.contains("more slots not shown\n"));
        assert!(out.lines().count() < disasm::MAX_LISTING + 4);
        assert!(out.ends_with("pc: 0\n"));
    }

    #[test]
    fn test_prompt() {
        let mut out = Vec::new();
        {
            let mut shell = Shell::new(Cpu::new(), Cursor::new(&b"pc\n"[..]), &mut out);
            shell.run().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "> pc: 0\n> ");
    }
}
