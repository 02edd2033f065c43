//! Reader (and fixture writer) for the packed binary workload format.
//!
//! Each record is 59 bytes, little-endian, with no padding:
//!
//! | field          | type | bytes |
//! |----------------|------|-------|
//! | priority       | i8   | 1     |
//! | name           | u8   | 32    |
//! | id             | i32  | 4     |
//! | status         | u8   | 1     |
//! | burst          | i32  | 4     |
//! | base register  | i32  | 4     |
//! | limit register | i64  | 8     |
//! | process type   | u8   | 1     |
//! | file count     | i32  | 4     |

use crate::error::LoadError;
use crate::process::{ProcessName, ProcessRecord, ProcessStatus, NAME_LEN};
use std::path::Path;
use tracing::{info, warn};

/// Size in bytes of one packed record.
pub const RECORD_SIZE: usize = 1 + NAME_LEN + 4 + 1 + 4 + 4 + 8 + 1 + 4;

/// Read and decode every complete record in `path`.
pub fn load_workload(path: &Path) -> Result<Vec<ProcessRecord>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = decode_records(&bytes);
    info!(
        file = %path.display(),
        bytes = bytes.len(),
        processes = records.len(),
        "loaded workload"
    );
    Ok(records)
}

/// Decode as many whole records as `bytes` holds.
///
/// The record count is `bytes.len() / RECORD_SIZE`; a trailing partial record is ignored.
pub fn decode_records(bytes: &[u8]) -> Vec<ProcessRecord> {
    let trailing = bytes.len() % RECORD_SIZE;
    if trailing != 0 {
        warn!(
            trailing,
            record_size = RECORD_SIZE,
            "workload length is not a multiple of the record size; ignoring trailing bytes"
        );
    }
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(decode_record)
        .collect()
}

fn decode_record(chunk: &[u8]) -> ProcessRecord {
    let mut cursor = Cursor { buf: chunk, pos: 0 };
    ProcessRecord {
        priority: i8::from_le_bytes(cursor.take()),
        name: ProcessName::from_bytes(cursor.take()),
        id: i32::from_le_bytes(cursor.take()),
        status: ProcessStatus::from_byte(u8::from_le_bytes(cursor.take())),
        burst: i32::from_le_bytes(cursor.take()),
        base_register: i32::from_le_bytes(cursor.take()),
        limit_register: i64::from_le_bytes(cursor.take()),
        process_type: u8::from_le_bytes(cursor.take()),
        file_count: i32::from_le_bytes(cursor.take()),
    }
}

/// Encode records into the packed on-disk layout.
pub fn encode_records(records: &[ProcessRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        out.extend_from_slice(&record.priority.to_le_bytes());
        out.extend_from_slice(record.name.as_bytes());
        out.extend_from_slice(&record.id.to_le_bytes());
        out.push(record.status.as_byte());
        out.extend_from_slice(&record.burst.to_le_bytes());
        out.extend_from_slice(&record.base_register.to_le_bytes());
        out.extend_from_slice(&record.limit_register.to_le_bytes());
        out.push(record.process_type);
        out.extend_from_slice(&record.file_count.to_le_bytes());
    }
    out
}

/// Write `records` to `path` in the packed layout.
pub fn write_workload(path: &Path, records: &[ProcessRecord]) -> Result<(), LoadError> {
    std::fs::write(path, encode_records(records)).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Fixed-width field reader over one record; callers only hand it `RECORD_SIZE` chunks.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut field = [0u8; N];
        field.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        field
    }
}
