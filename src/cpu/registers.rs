//! Register file and flag set.
//!
//! The machine has four general purpose registers:
//! - rax, rbx, rcx, rdx: 64-bit signed values
//!
//! plus the four arithmetic flags (ZF, SF, CF, OF) and the program counter.
//! Both sets are fixed, so they live in named fields rather than a map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A general purpose register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
}

impl Register {
    /// All registers, in display order.
    pub const ALL: [Register; 4] = [Register::Rax, Register::Rbx, Register::Rcx, Register::Rdx];

    pub fn name(self) -> &'static str {
        match self {
            Register::Rax => "rax",
            Register::Rbx => "rbx",
            Register::Rcx => "rcx",
            Register::Rdx => "rdx",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Register::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// An arithmetic flag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// Zero flag
    Zf,
    /// Sign flag
    Sf,
    /// Carry flag
    Cf,
    /// Overflow flag
    Of,
}

impl Flag {
    /// All flags, in display order.
    pub const ALL: [Flag; 4] = [Flag::Zf, Flag::Sf, Flag::Cf, Flag::Of];

    pub fn name(self) -> &'static str {
        match self {
            Flag::Zf => "ZF",
            Flag::Sf => "SF",
            Flag::Cf => "CF",
            Flag::Of => "OF",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flag {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flag::ALL
            .into_iter()
            .find(|flag| flag.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A register or flag name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown name: {0}")]
pub struct UnknownName(pub String);

/// The flag set. Only arithmetic instructions write it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub zf: bool,
    pub sf: bool,
    pub cf: bool,
    pub of: bool,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Zf => self.zf,
            Flag::Sf => self.sf,
            Flag::Cf => self.cf,
            Flag::Of => self.of,
        }
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Zf => self.zf = value,
            Flag::Sf => self.sf = value,
            Flag::Cf => self.cf = value,
            Flag::Of => self.of = value,
        }
    }
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub rax: i64,
    pub rbx: i64,
    pub rcx: i64,
    pub rdx: i64,

    /// ZF/SF/CF/OF
    pub flags: Flags,

    /// Address of the next instruction to fetch.
    pub pc: usize,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers, flags and the program counter to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, reg: Register) -> i64 {
        match reg {
            Register::Rax => self.rax,
            Register::Rbx => self.rbx,
            Register::Rcx => self.rcx,
            Register::Rdx => self.rdx,
        }
    }

    pub fn set(&mut self, reg: Register, value: i64) {
        match reg {
            Register::Rax => self.rax = value,
            Register::Rbx => self.rbx = value,
            Register::Rcx => self.rcx = value,
            Register::Rdx => self.rdx = value,
        }
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> usize {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: usize) {
        self.pc = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names_roundtrip() {
        for reg in Register::ALL {
            assert_eq!(reg.name().parse::<Register>().unwrap(), reg);
        }
        assert!("RAX".parse::<Register>().is_err());
        assert!("rex".parse::<Register>().is_err());
    }

    #[test]
    fn test_flag_names() {
        assert_eq!("ZF".parse::<Flag>().unwrap(), Flag::Zf);
        assert_eq!("OF".parse::<Flag>().unwrap(), Flag::Of);
        assert_eq!("zf".parse::<Flag>(), Err(UnknownName("zf".into())));
    }

    #[test]
    fn test_get_set() {
        let mut regs = Registers::new();
        regs.set(Register::Rcx, -7);
        assert_eq!(regs.get(Register::Rcx), -7);
        assert_eq!(regs.rcx, -7);

        regs.flags.set(Flag::Cf, true);
        assert!(regs.flags.get(Flag::Cf));
        assert!(!regs.flags.get(Flag::Zf));
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc();
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 11);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.rdx = 3;
        regs.flags.of = true;
        regs.jump(9);
        regs.reset();
        assert_eq!(regs, Registers::new());
    }
}
