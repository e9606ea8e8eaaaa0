//! flagsim - CLI Entry Point
//!
//! Commands:
//! - `flagsim run <program>` - Run a program until it leaves the loaded range
//! - `flagsim shell [program]` - Interactive command shell
//! - `flagsim debug <program>` - TUI debugger
//! - `flagsim disasm <program>` - List a program as the loader sees it

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flagsim")]
#[command(version = "0.1.0")]
#[command(about = "A tiny x86-flavoured instruction-set simulator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it finishes
    Run {
        /// Path to the program file
        program: String,
        /// Address to load the program at
        #[arg(short, long, default_value = "0")]
        addr: usize,
        /// Maximum number of cycles to run
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Write a JSON snapshot of the final state
        #[arg(short, long)]
        snapshot: Option<String>,
    },
    /// Interactive command shell
    Shell {
        /// Program file to load before the first prompt
        program: Option<String>,
        /// Address to load the program at
        #[arg(short, long, default_value = "0")]
        addr: usize,
    },
    /// Interactive TUI debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the program file
        program: String,
        /// Address to load the program at
        #[arg(short, long, default_value = "0")]
        addr: usize,
    },
    /// List a program with addresses
    Disasm {
        /// Path to the program file
        program: String,
        /// Address to load the program at
        #[arg(short, long, default_value = "0")]
        addr: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, addr, max_cycles, trace, snapshot }) => {
            run_program(&program, addr, max_cycles, trace, snapshot.as_deref());
        }
        Some(Commands::Shell { program, addr }) => {
            run_shell(program.as_deref(), addr);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program, addr }) => {
            debug_program(&program, addr);
        }
        Some(Commands::Disasm { program, addr }) => {
            disassemble_file(&program, addr);
        }
        None => {
            println!("flagsim v0.1.0");
            println!("A tiny x86-flavoured instruction-set simulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn read_program(path: &str) -> flagsim::ProgramFile {
    match flagsim::load_program(path) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, addr: usize, max_cycles: u64, trace: bool, snapshot: Option<&str>) {
    use flagsim::{Cpu, CpuError};
    use flagsim::asm::disasm::{format_flags, format_registers};

    println!("🔧 Running: {}", path);

    let program = read_program(path);
    if program.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    let mut cpu = Cpu::new();
    cpu.load(addr, &program.lines);
    cpu.regs.jump(addr);

    println!("📂 Loaded {} instructions at {}", program.len(), addr);
    println!();
    println!("━━━ Execution ━━━");

    let mut cycles = 0u64;
    let mut failed = false;
    while cycles < max_cycles {
        let pc = cpu.pc();
        match cpu.step() {
            Ok(op) => {
                if trace {
                    println!("{:03}: {:<16} {}", pc, op.to_string(), format_flags(&cpu));
                }
                cycles += 1;
            }
            Err(CpuError::OutOfBounds { .. }) => break,
            Err(e) => {
                eprintln!("❌ CPU error at PC={}: {}", pc, e);
                failed = true;
                break;
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    print!("{}", format_registers(&cpu));
    println!("Flags: {}", format_flags(&cpu));

    if cycles >= max_cycles && !cpu.is_finished() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }

    if let Some(out) = snapshot {
        match flagsim::save_snapshot(out, &cpu) {
            Ok(()) => println!("✓ Snapshot saved to {}", out),
            Err(e) => {
                eprintln!("❌ Failed to save snapshot: {}", e);
                std::process::exit(1);
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn run_shell(path: Option<&str>, addr: usize) {
    use flagsim::{Cpu, Shell};
    use std::io::{stdin, stdout};

    let mut cpu = Cpu::new();
    if let Some(path) = path {
        let program = read_program(path);
        cpu.load(addr, &program.lines);
        cpu.regs.jump(addr);
        println!("📂 Loaded {} instructions at {}", program.len(), addr);
    }
    println!("Type 'help' for commands.");

    let mut shell = Shell::new(cpu, stdin().lock(), stdout());
    if let Err(e) = shell.run() {
        eprintln!("❌ Shell I/O error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, addr: usize) {
    use flagsim::tui::run_debugger;

    println!("🔍 Loading: {}", path);

    let program = read_program(path);
    if program.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    if let Err(e) = run_debugger(program.lines, addr) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

fn disassemble_file(path: &str, addr: usize) {
    use flagsim::Cpu;
    use flagsim::asm::disasm::format_memory;

    let program = read_program(path);
    let mut cpu = Cpu::new();
    cpu.load(addr, &program.lines);

    print!("{}", format_memory(&cpu, addr, program.len()));
}
