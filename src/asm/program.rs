//! Program text files.
//!
//! A program file is plain text with one instruction per line:
//! - the mnemonic comes first, operands follow, separated by whitespace
//! - trailing commas on operands are allowed
//! - every line occupies one address, blank lines included

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFile {
    /// Program lines, in address order.
    pub lines: Vec<String>,
}

impl ProgramFile {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split source text into program lines. Line endings (LF or CRLF)
    /// are dropped; nothing else is altered.
    pub fn parse(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    /// Add a line.
    pub fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<ProgramFile, ProgramError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| ProgramError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let program = ProgramFile::parse(&source);
    tracing::debug!(path = %path.display(), lines = program.len(), "read program file");
    Ok(program)
}

/// Save a program file to disk.
pub fn save_program<P: AsRef<Path>>(path: P, program: &ProgramFile) -> Result<(), ProgramError> {
    let path = path.as_ref();
    let io_err = |e: std::io::Error| ProgramError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut file = std::fs::File::create(path).map_err(io_err)?;
    for line in &program.lines {
        writeln!(file, "{}", line).map_err(io_err)?;
    }
    Ok(())
}

/// Errors that can occur while reading or writing program files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let program = ProgramFile::parse("ADD rax, 5\r\nJGE 3\n\nADD rbx, 10\n");
        assert_eq!(program.len(), 4);
        assert_eq!(program.lines[0], "ADD rax, 5");
        assert_eq!(program.lines[2], "");
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("flagsim-program-{}.txt", std::process::id()));

        let mut program = ProgramFile::new();
        program.push("ADD rax, 1");
        program.push("JMP 0");
        save_program(&path, &program).unwrap();

        let loaded = load_program(&path).unwrap();
        assert_eq!(loaded, program);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = load_program("/definitely/not/here.txt").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
