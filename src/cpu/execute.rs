//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//!
//! Values are 64-bit signed and results wrap on overflow. The flags are not
//! derived from the wraparound itself: each instruction computes them from
//! the sign combination of its operands and result, as documented on the
//! individual executors.

use crate::cpu::decode::{Instruction, Op};
use crate::cpu::memory::Memory;
use crate::cpu::operand;
use crate::cpu::registers::{Flag, Flags, Register, Registers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The pc left the loaded range.
    Finished { cycles: u64 },
    /// The cycle budget ran out first.
    CycleLimit { cycles: u64 },
}

impl RunOutcome {
    pub fn cycles(&self) -> u64 {
        match *self {
            RunOutcome::Finished { cycles } | RunOutcome::CycleLimit { cycles } => cycles,
        }
    }
}

/// The simulated CPU: registers, flags and instruction memory.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Cpu {
    /// Registers, flags and pc.
    pub regs: Registers,
    /// Instruction memory.
    pub mem: Memory,
    /// Instructions executed successfully (for profiling).
    pub cycles: u64,
    /// Last executed operation (for debugging).
    #[serde(default)]
    last_op: Option<Op>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset registers, flags and memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.cycles = 0;
        self.last_op = None;
    }

    /// Load program lines at `addr`. The pc is not touched.
    pub fn load<S: AsRef<str>>(&mut self, addr: usize, lines: &[S]) {
        let end = self.mem.load(addr, lines);
        tracing::debug!(addr, count = lines.len(), end, "program loaded");
    }

    /// Execute a single instruction.
    ///
    /// Returns the operation that was executed. On error the pc is left
    /// where the failing instruction put it, so a failed arithmetic
    /// instruction is retried by the next call.
    pub fn step(&mut self) -> Result<Op, CpuError> {
        let pc = self.regs.pc;
        let result = self.step_inner();
        match &result {
            Ok(op) => tracing::trace!(pc, next = self.regs.pc, op = %op, "executed"),
            Err(CpuError::OutOfBounds { end, .. }) => {
                tracing::debug!(pc, end, "program counter left loaded range")
            }
            Err(e) => tracing::warn!(pc, "step failed: {e}"),
        }
        result
    }

    fn step_inner(&mut self) -> Result<Op, CpuError> {
        let pc = self.regs.pc;
        let end = self.mem.end();
        if pc >= end {
            return Err(CpuError::OutOfBounds { pc, end });
        }

        // Fetch
        let instr = self.mem.fetch(pc);

        // Decode
        let op = Op::decode(&instr)?;

        // Execute
        self.execute(&op)?;
        if !op.is_control_flow() {
            self.regs.advance_pc();
        }

        self.cycles += 1;
        self.last_op = Some(op.clone());

        Ok(op)
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// Leaving the loaded range is the normal way for a program to finish
    /// and is reported as [`RunOutcome::Finished`]; every other error is
    /// returned.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<RunOutcome, CpuError> {
        let mut executed = 0;

        while executed < max_cycles {
            match self.step() {
                Ok(_) => executed += 1,
                Err(CpuError::OutOfBounds { .. }) => {
                    return Ok(RunOutcome::Finished { cycles: executed });
                }
                Err(e) => return Err(e),
            }
        }

        if self.is_finished() {
            Ok(RunOutcome::Finished { cycles: executed })
        } else {
            Ok(RunOutcome::CycleLimit { cycles: executed })
        }
    }

    fn execute(&mut self, op: &Op) -> Result<(), CpuError> {
        match op {
            Op::Add { dst, src } => self.execute_add(dst, src),
            Op::Sbb { dst, src } => self.execute_sbb(dst, src),
            Op::Adox { dst, src } => self.execute_adox(dst, src),
            Op::Jmp { target } => self.execute_jmp(target),
            Op::Jge { target } => self.execute_jge(target),
        }
    }

    /// Resolve both operands of a two-operand arithmetic instruction.
    fn arith_operands(&self, dst: &str, src: &str) -> Result<(Register, i64, i64), CpuError> {
        let value = operand::resolve(&self.regs, src)?;
        let reg = operand::destination(dst)?;
        Ok((reg, self.regs.get(reg), value))
    }

    /// ADD: dst := dst + src.
    ///
    /// CF is set when the result is below the old destination value, OF when
    /// both operands share a sign and the result does not.
    fn execute_add(&mut self, dst: &str, src: &str) -> Result<(), CpuError> {
        let (reg, before, value) = self.arith_operands(dst, src)?;
        let result = before.wrapping_add(value);

        self.regs.set(reg, result);
        self.regs.flags = Flags {
            zf: result == 0,
            sf: result < 0,
            cf: result < before,
            of: (before < 0) == (value < 0) && (result < 0) != (before < 0),
        };
        Ok(())
    }

    /// SBB: dst := dst - src - CF.
    ///
    /// CF is set when the old destination is below `src + borrow`, OF when
    /// the destination and `src + borrow` differ in sign and the result's
    /// sign differs from the old destination.
    fn execute_sbb(&mut self, dst: &str, src: &str) -> Result<(), CpuError> {
        let (reg, before, value) = self.arith_operands(dst, src)?;
        let borrow = i64::from(self.regs.flags.cf);
        let result = before.wrapping_sub(value).wrapping_sub(borrow);
        let subtrahend = i128::from(value) + i128::from(borrow);

        self.regs.set(reg, result);
        self.regs.flags = Flags {
            zf: result == 0,
            sf: result < 0,
            cf: i128::from(before) < subtrahend,
            of: (before < 0) != (subtrahend < 0) && (result < 0) != (before < 0),
        };
        Ok(())
    }

    /// ADOX: dst := dst + src, touching OF only.
    fn execute_adox(&mut self, dst: &str, src: &str) -> Result<(), CpuError> {
        let (reg, before, value) = self.arith_operands(dst, src)?;
        let result = before.wrapping_add(value);

        self.regs.set(reg, result);
        self.regs.flags.of = result < before;
        Ok(())
    }

    fn execute_jmp(&mut self, target: &str) -> Result<(), CpuError> {
        let addr = operand::address(&self.regs, target)?;
        self.regs.jump(addr);
        Ok(())
    }

    /// JGE: jump when SF == OF, otherwise fall through. The target is only
    /// resolved when the jump is taken.
    fn execute_jge(&mut self, target: &str) -> Result<(), CpuError> {
        let flags = self.regs.flags;
        if flags.sf == flags.of {
            let addr = operand::address(&self.regs, target)?;
            self.regs.jump(addr);
        } else {
            self.regs.advance_pc();
        }
        Ok(())
    }

    /// Current program counter.
    pub fn pc(&self) -> usize {
        self.regs.pc
    }

    /// Register value by name.
    pub fn register(&self, name: &str) -> Result<i64, CpuError> {
        name.parse::<Register>()
            .map(|reg| self.regs.get(reg))
            .map_err(|_| CpuError::UnknownRegister(name.to_string()))
    }

    /// Flag value by name.
    pub fn flag(&self, name: &str) -> Result<bool, CpuError> {
        name.parse::<Flag>()
            .map(|flag| self.regs.flags.get(flag))
            .map_err(|_| CpuError::UnknownFlag(name.to_string()))
    }

    /// Instruction at `addr`, or `None` if nothing was loaded there.
    pub fn instruction(&self, addr: usize) -> Option<&Instruction> {
        self.mem.read(addr)
    }

    /// Get the last executed operation.
    pub fn last_op(&self) -> Option<&Op> {
        self.last_op.as_ref()
    }

    /// Check whether the pc has left the loaded range.
    pub fn is_finished(&self) -> bool {
        self.regs.pc >= self.mem.end()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("program counter out of bounds (pc={pc}, end={end})")]
    OutOfBounds { pc: usize, end: usize },

    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("{mnemonic} requires {expected} parameters")]
    OperandCountMismatch { mnemonic: String, expected: usize },

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("unknown register: {0}")]
    UnknownRegister(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),
}
