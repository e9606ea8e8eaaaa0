//! Diagnostics and listings.
//!
//! Read-only text views over a [`Cpu`]: register and flag dumps, single
//! instruction lookups and memory listings.

use crate::cpu::{Cpu, Flag, Register};

/// Format the register file, one register per line.
pub fn format_registers(cpu: &Cpu) -> String {
    let mut output = String::from("Registers:\n");
    for reg in Register::ALL {
        output.push_str(&format!("{}: {}\n", reg, cpu.regs.get(reg)));
    }
    output.push_str(&format!("pc: {}\n", cpu.pc()));
    output
}

/// Format the flag set on a single line, e.g. `ZF=0 SF=1 CF=0 OF=0`.
pub fn format_flags(cpu: &Cpu) -> String {
    Flag::ALL
        .iter()
        .map(|&flag| format!("{}={}", flag, u8::from(cpu.regs.flags.get(flag))))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Describe the instruction at `addr`.
pub fn format_instruction(cpu: &Cpu, addr: usize) -> String {
    match cpu.instruction(addr) {
        Some(instr) => format!("Instruction at {}: {}", addr, instr),
        None => format!("No instruction at {}", addr),
    }
}

/// Most slots a single memory listing will print.
pub const MAX_LISTING: usize = 1024;

/// Describe `size` consecutive slots starting at `addr`.
///
/// At most [`MAX_LISTING`] slots are listed; a trailing line notes how many
/// were left out.
pub fn format_memory(cpu: &Cpu, addr: usize, size: usize) -> String {
    let shown = size.min(MAX_LISTING);
    let mut output = String::from("Memory:\n");
    for a in addr..addr.saturating_add(shown) {
        output.push_str(&format_instruction(cpu, a));
        output.push('\n');
    }
    if shown < size {
        output.push_str(&format!("... {} more slots not shown\n", size - shown));
    }
    output
}

/// List the occupied slots below the loaded bound, marking the pc.
///
/// Vacant slots are skipped, except the one under the pc.
pub fn disassemble(cpu: &Cpu) -> String {
    let pc = cpu.pc();
    let end = cpu.mem.end();
    let mut output = String::new();
    let mut line = |addr: usize, text: String| {
        let marker = if addr == pc { ">" } else { " " };
        output.push_str(&format!("{} {:03}: {}\n", marker, addr, text));
    };

    let mut pc_listed = pc >= end || cpu.mem.read(pc).is_some();
    for (addr, instr) in cpu.mem.loaded(0, end) {
        if !pc_listed && pc < addr {
            line(pc, "<empty>".into());
            pc_listed = true;
        }
        line(addr, instr.to_string());
    }
    if !pc_listed {
        line(pc, "<empty>".into());
    }
    output
}
