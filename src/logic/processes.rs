//! Process Snapshots
//!
//! Lấy danh sách process đang chạy (name + command line) mỗi tick.
//! Polling sits behind `ProcessSource` so an event-driven tracker can replace it.

use sysinfo::System;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One running process. Either field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: Option<String>,
    pub command_line: Option<String>,
}

impl ProcessEntry {
    pub fn new(name: Option<&str>, command_line: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            command_line: command_line.map(str::to_string),
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(Some(name), None)
    }
}

/// Point-in-time process list, discarded after evaluation
pub type ProcessSnapshot = Vec<ProcessEntry>;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Process enumeration is not available on this system
    Unsupported,
    /// `snapshot` before `prepare`
    NotPrepared,
    Other(String),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Unsupported => write!(f, "Process enumeration is not supported on this system"),
            ProcessError::NotPrepared => write!(f, "Process enumeration was not prepared"),
            ProcessError::Other(msg) => write!(f, "Process enumeration failed: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}

// ============================================================================
// PROCESS SOURCE
// ============================================================================

/// Supplies process snapshots to the matcher
pub trait ProcessSource: Send {
    /// Acquire whatever handles enumeration needs
    fn prepare(&mut self) -> Result<(), ProcessError>;

    fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError>;

    /// Drop held handles; `prepare` may be called again later
    fn release(&mut self);
}

/// `sysinfo`-backed enumeration
#[derive(Default)]
pub struct SysinfoProcesses {
    system: Option<System>,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessSource for SysinfoProcesses {
    fn prepare(&mut self) -> Result<(), ProcessError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProcessError::Unsupported);
        }
        if self.system.is_none() {
            self.system = Some(System::new());
            log::debug!("Process enumeration prepared");
        }
        Ok(())
    }

    fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError> {
        let sys = self.system.as_mut().ok_or(ProcessError::NotPrepared)?;
        sys.refresh_processes();

        let snapshot = sys
            .processes()
            .values()
            .map(|process| {
                let name = process.name();
                let cmd = process.cmd().join(" ");
                ProcessEntry {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    command_line: (!cmd.is_empty()).then_some(cmd),
                }
            })
            .collect();

        Ok(snapshot)
    }

    fn release(&mut self) {
        if self.system.take().is_some() {
            log::debug!("Process enumeration released");
        }
    }
}

impl Drop for SysinfoProcesses {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_requires_prepare() {
        let mut source = SysinfoProcesses::new();
        assert_eq!(source.snapshot(), Err(ProcessError::NotPrepared));
    }

    #[test]
    fn test_prepare_snapshot_release() {
        let mut source = SysinfoProcesses::new();
        if source.prepare().is_err() {
            // Unsupported platform: nothing else to check
            return;
        }

        let snapshot = source.snapshot().unwrap();
        assert!(!snapshot.is_empty(), "at least the test process is running");

        source.release();
        assert_eq!(source.snapshot(), Err(ProcessError::NotPrepared));
    }
}
