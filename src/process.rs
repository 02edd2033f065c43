//! Process control block shared by every queue, engine and balancer.

use serde::{Serialize, Serializer};
use std::fmt;

/// Width of the fixed process-name field in the workload file.
pub const NAME_LEN: usize = 32;

/// Identifier stored in the workload file (unique within one file).
pub type ProcessId = i32;

/// Execution status of a process. The numeric values match the on-disk byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessStatus {
    Finished = 0,
    Running = 1,
}

impl ProcessStatus {
    /// Decode the on-disk status byte; any nonzero value means running.
    pub const fn from_byte(byte: u8) -> ProcessStatus {
        if byte == 0 {
            ProcessStatus::Finished
        } else {
            ProcessStatus::Running
        }
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Fixed-width, NUL-padded process label.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessName([u8; NAME_LEN]);

impl ProcessName {
    pub const fn from_bytes(bytes: [u8; NAME_LEN]) -> ProcessName {
        ProcessName(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Label up to the first NUL byte, with invalid UTF-8 replaced.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl From<&str> for ProcessName {
    /// Truncates labels longer than [`NAME_LEN`] bytes.
    fn from(value: &str) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let len = value.len().min(NAME_LEN);
        bytes[..len].copy_from_slice(&value.as_bytes()[..len]);
        ProcessName(bytes)
    }
}

impl fmt::Debug for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl Serialize for ProcessName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

/// One simulated process.
///
/// A record is created once by the loader and afterwards only mutated in place: the
/// scheduler engine consumes `burst` and flips `status`, the aging monitor bumps
/// `priority`, and the balancer copies the whole record into another queue's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    /// Smaller values are scheduled first by the priority discipline.
    pub priority: i8,
    pub name: ProcessName,
    pub id: ProcessId,
    pub status: ProcessStatus,
    /// Remaining work units.
    pub burst: i32,
    pub base_register: i32,
    pub limit_register: i64,
    pub process_type: u8,
    pub file_count: i32,
}

impl ProcessRecord {
    /// Build a running process with zeroed register/accounting fields.
    pub fn new(id: ProcessId, name: &str, burst: i32, priority: i8) -> ProcessRecord {
        ProcessRecord {
            priority,
            name: ProcessName::from(name),
            id,
            status: ProcessStatus::Running,
            burst,
            base_register: 0,
            limit_register: 0,
            process_type: 0,
            file_count: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }

    /// Clamp the burst to zero and mark the process finished.
    pub fn finish(&mut self) {
        self.burst = 0;
        self.status = ProcessStatus::Finished;
    }

    /// Bring a freshly loaded record into a consistent state: running iff work remains.
    pub(crate) fn normalize(&mut self) {
        if self.burst > 0 {
            self.status = ProcessStatus::Running;
        } else {
            self.finish();
        }
    }
}
