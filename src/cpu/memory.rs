//! Instruction memory.
//!
//! Memory is sparse: only loaded slots are stored, keyed by address, so a
//! program can sit anywhere in the address space. `end` is the exclusive
//! bound of the most recent load and is the only thing the stepper checks
//! against.

use crate::cpu::decode::Instruction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat, integer-addressed instruction memory.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    cells: BTreeMap<usize, Instruction>,
    end: usize,
}

impl Memory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load program lines starting at `addr`.
    ///
    /// Each line overwrites one slot. `end` is set to `addr + lines.len()`,
    /// even when that is lower than the bound of an earlier load. Lines
    /// that would land past `usize::MAX` are dropped and the bound
    /// saturates there. Returns the new end.
    pub fn load<S: AsRef<str>>(&mut self, addr: usize, lines: &[S]) -> usize {
        for (i, line) in lines.iter().enumerate() {
            let Some(slot) = addr.checked_add(i) else {
                tracing::warn!(addr, dropped = lines.len() - i, "program runs past the address space");
                break;
            };
            self.cells.insert(slot, Instruction::parse(line.as_ref()));
        }

        self.end = addr.saturating_add(lines.len());
        self.end
    }

    /// Read a slot. `None` if nothing was ever loaded there.
    pub fn read(&self, addr: usize) -> Option<&Instruction> {
        self.cells.get(&addr)
    }

    /// Fetch for execution. A vacant slot yields the empty instruction.
    pub fn fetch(&self, addr: usize) -> Instruction {
        self.read(addr).cloned().unwrap_or_default()
    }

    /// Exclusive upper bound of the last load.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Occupied slots in `[start, end)`, in address order.
    pub fn loaded(&self, start: usize, end: usize) -> impl Iterator<Item = (usize, &Instruction)> {
        let end = end.max(start);
        self.cells.range(start..end).map(|(&addr, instr)| (addr, instr))
    }

    /// Clear all slots and the bound.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.end = 0;
    }

    /// Dump a range of slots (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Option<&Instruction>)> {
        (start..start.saturating_add(count))
            .map(|addr| (addr, self.read(addr)))
            .collect()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("occupied", &self.occupied())
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_sequential() {
        let mut mem = Memory::new();
        let end = mem.load(2, &["ADD rax, 1", "JMP 2"]);

        assert_eq!(end, 4);
        assert_eq!(mem.end(), 4);
        assert!(mem.read(0).is_none());
        assert!(mem.read(1).is_none());
        assert_eq!(mem.read(2).unwrap().mnemonic, "ADD");
        assert_eq!(mem.read(3).unwrap().operands, vec!["2"]);
        assert!(mem.read(4).is_none());
    }

    #[test]
    fn test_vacant_fetch_is_empty() {
        let mut mem = Memory::new();
        mem.load(3, &["ADD rax, 1"]);
        assert_eq!(mem.fetch(0), Instruction::default());
    }

    #[test]
    fn test_second_load_overwrites_bound() {
        let mut mem = Memory::new();
        mem.load(10, &["ADD rax, 1", "ADD rax, 2"]);
        mem.load(0, &["ADD rbx, 1"]);

        // Earlier instructions stay in memory but fall outside the bound.
        assert_eq!(mem.end(), 1);
        assert!(mem.read(10).is_some());
        assert_eq!(mem.occupied(), 3);
    }

    #[test]
    fn test_load_overwrites_slots() {
        let mut mem = Memory::new();
        mem.load(0, &["ADD rax, 1", "ADD rax, 2"]);
        mem.load(1, &["SBB rcx, 4"]);
        assert_eq!(mem.read(1).unwrap().mnemonic, "SBB");
        assert_eq!(mem.end(), 2);
    }

    #[test]
    fn test_load_high_address() {
        let mut mem = Memory::new();
        let base = 1usize << 40;
        let end = mem.load(base, &["ADD rax, 1", "JMP 0"]);

        assert_eq!(end, base + 2);
        assert_eq!(mem.occupied(), 2);
        assert_eq!(mem.read(base + 1).unwrap().mnemonic, "JMP");
        assert!(mem.read(base - 1).is_none());
    }

    #[test]
    fn test_load_at_top_of_address_space() {
        let mut mem = Memory::new();
        let end = mem.load(usize::MAX, &["ADD rax, 1", "ADD rbx, 2", "ADD rcx, 3"]);

        // Only the first line fits; the bound saturates.
        assert_eq!(end, usize::MAX);
        assert_eq!(mem.occupied(), 1);
        assert_eq!(mem.read(usize::MAX).unwrap().operands, vec!["rax", "1"]);

        let end = mem.load(usize::MAX - 1, &["JMP 0", "JMP 1"]);
        assert_eq!(end, usize::MAX);
        assert_eq!(mem.read(usize::MAX).unwrap().mnemonic, "JMP");
    }

    #[test]
    fn test_loaded_range() {
        let mut mem = Memory::new();
        mem.load(5, &["ADD rax, 1", "ADD rax, 2", "ADD rax, 3"]);
        let addrs: Vec<usize> = mem.loaded(0, 7).map(|(addr, _)| addr).collect();
        assert_eq!(addrs, vec![5, 6]);
        assert_eq!(mem.loaded(7, 2).count(), 0);
    }

    #[test]
    fn test_dump_and_clear() {
        let mut mem = Memory::new();
        mem.load(1, &["JMP 0"]);
        let dump = mem.dump(0, 3);
        assert_eq!(dump.len(), 3);
        assert!(dump[0].1.is_none());
        assert!(dump[1].1.is_some());

        mem.clear();
        assert_eq!(mem.end(), 0);
        assert_eq!(mem.occupied(), 0);
    }
}
