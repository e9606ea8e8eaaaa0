//! Operand resolution.
//!
//! An operand token is either a base-10 signed literal or a register name.

use crate::cpu::execute::CpuError;
use crate::cpu::registers::{Register, Registers};

/// Resolve a source operand to its value. Never mutates state.
pub fn resolve(regs: &Registers, token: &str) -> Result<i64, CpuError> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value);
    }
    token
        .parse::<Register>()
        .map(|reg| regs.get(reg))
        .map_err(|_| CpuError::InvalidOperand(token.to_string()))
}

/// Resolve a destination operand, which must name a register.
pub fn destination(token: &str) -> Result<Register, CpuError> {
    token
        .parse::<Register>()
        .map_err(|_| CpuError::InvalidOperand(token.to_string()))
}

/// Resolve a jump target. Negative values are not addresses.
pub fn address(regs: &Registers, token: &str) -> Result<usize, CpuError> {
    let value = resolve(regs, token)?;
    usize::try_from(value).map_err(|_| CpuError::InvalidOperand(token.to_string()))
}
