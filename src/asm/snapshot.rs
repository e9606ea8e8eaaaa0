//! Machine snapshots.
//!
//! The full CPU state (registers, flags, pc, memory and bound) is written
//! as pretty-printed JSON so a session can be saved and resumed.

use crate::cpu::Cpu;
use std::path::Path;
use thiserror::Error;

/// Serialize a CPU to a JSON string.
pub fn to_json(cpu: &Cpu) -> Result<String, SnapshotError> {
    serde_json::to_string_pretty(cpu).map_err(|e| SnapshotError::Format(e.to_string()))
}

/// Restore a CPU from a JSON string.
pub fn from_json(json: &str) -> Result<Cpu, SnapshotError> {
    serde_json::from_str(json).map_err(|e| SnapshotError::Format(e.to_string()))
}

/// Save a snapshot to disk.
pub fn save_snapshot<P: AsRef<Path>>(path: P, cpu: &Cpu) -> Result<(), SnapshotError> {
    let json = to_json(cpu)?;
    std::fs::write(path.as_ref(), json).map_err(|e| SnapshotError::Io(e.to_string()))?;
    tracing::debug!(path = %path.as_ref().display(), "snapshot saved");
    Ok(())
}

/// Load a snapshot from disk.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Cpu, SnapshotError> {
    let json = std::fs::read_to_string(path.as_ref()).map_err(|e| SnapshotError::Io(e.to_string()))?;
    from_json(&json)
}

/// Errors that can occur during snapshot operations.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("snapshot format error: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_restores_state() {
        let mut cpu = Cpu::new();
        cpu.load(0, &["ADD rax, -5", "JGE 3", "ADD rbx, 10", "ADD rbx, 20"]);
        cpu.step().unwrap();

        let json = to_json(&cpu).unwrap();
        let mut restored = from_json(&json).unwrap();

        assert_eq!(restored.regs, cpu.regs);
        assert_eq!(restored.mem.end(), 4);
        assert_eq!(restored.cycles, 1);

        // Execution resumes where it left off.
        restored.step().unwrap();
        assert_eq!(restored.pc(), 2);
    }

    #[test]
    fn test_snapshot_file() {
        let path = std::env::temp_dir().join(format!("flagsim-snapshot-{}.json", std::process::id()));
        let mut cpu = Cpu::new();
        cpu.load(3, &["SBB rcx, 2"]);

        save_snapshot(&path, &cpu).unwrap();
        let restored = load_snapshot(&path).unwrap();
        assert_eq!(restored.instruction(3).unwrap().mnemonic, "SBB");
        assert!(restored.instruction(0).is_none());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(from_json("{ not json"), Err(SnapshotError::Format(_))));
    }
}
