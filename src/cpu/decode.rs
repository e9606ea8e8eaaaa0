//! Instruction decoder.
//!
//! A program line is stored as a raw [`Instruction`]: a mnemonic token plus
//! the operand tokens that follow it. Nothing is validated at load time.
//! When the stepper reaches an instruction it is decoded into an [`Op`],
//! the closed set of operations the engine knows how to execute.

use crate::cpu::execute::CpuError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters stripped from both ends of every token.
const TOKEN_TRIM: &[char] = &[',', ' '];

/// A raw, undecoded program line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Mnemonic token, e.g. `ADD`. Empty for a blank line.
    pub mnemonic: String,
    /// Operand tokens in source order.
    pub operands: Vec<String>,
}

impl Instruction {
    /// Split a program line into mnemonic and operand tokens.
    ///
    /// Tokens are separated by whitespace and trimmed of stray commas and
    /// spaces, so `ADD rax, 5` yields `ADD` with operands `rax` and `5`.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line
            .split_whitespace()
            .map(|t| t.trim_matches(TOKEN_TRIM).to_string());

        let mnemonic = tokens.next().unwrap_or_default();
        Self {
            mnemonic,
            operands: tokens.collect(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// Decoded operation.
///
/// Operand tokens are kept unresolved; register values are read at
/// execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // ==================== Arithmetic ====================

    /// dst := dst + src, updates ZF/SF/CF/OF
    Add { dst: String, src: String },

    /// dst := dst - src - CF, updates ZF/SF/CF/OF
    Sbb { dst: String, src: String },

    /// dst := dst + src, updates OF only
    Adox { dst: String, src: String },

    // ==================== Control Flow ====================

    /// pc := target
    Jmp { target: String },

    /// pc := target if SF == OF, else pc + 1
    Jge { target: String },
}

impl Op {
    /// Decode a raw instruction. Mnemonics are matched case-sensitively.
    pub fn decode(instr: &Instruction) -> Result<Op, CpuError> {
        let (expected, build): (usize, fn(&[String]) -> Op) = match instr.mnemonic.as_str() {
            "ADD" => (2, |o| Op::Add { dst: o[0].clone(), src: o[1].clone() }),
            "SBB" => (2, |o| Op::Sbb { dst: o[0].clone(), src: o[1].clone() }),
            "ADOX" => (2, |o| Op::Adox { dst: o[0].clone(), src: o[1].clone() }),
            "JMP" => (1, |o| Op::Jmp { target: o[0].clone() }),
            "JGE" => (1, |o| Op::Jge { target: o[0].clone() }),
            _ => return Err(CpuError::UnknownInstruction(instr.mnemonic.clone())),
        };

        if instr.operands.len() != expected {
            return Err(CpuError::OperandCountMismatch {
                mnemonic: instr.mnemonic.clone(),
                expected,
            });
        }

        Ok(build(&instr.operands))
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Add { .. } => "ADD",
            Op::Sbb { .. } => "SBB",
            Op::Adox { .. } => "ADOX",
            Op::Jmp { .. } => "JMP",
            Op::Jge { .. } => "JGE",
        }
    }

    /// Control-flow ops set the next pc themselves.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, Op::Jmp { .. } | Op::Jge { .. })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Add { dst, src } | Op::Sbb { dst, src } | Op::Adox { dst, src } => {
                write!(f, "{} {}, {}", self.mnemonic(), dst, src)
            }
            Op::Jmp { target } | Op::Jge { target } => write!(f, "{} {}", self.mnemonic(), target),
        }
    }
}
