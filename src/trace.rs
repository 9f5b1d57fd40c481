//! Reading branch traces from disk.
//!
//! A trace is a flat array of little-endian records, five 32-bit words each:
//! address, opcode, flags, outcome, target.

use std::path::Path;

use thiserror::Error;

use crate::branch::*;

/// Size of one on-disk record in bytes.
pub const RECORD_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace length {0} is not a multiple of the record size")]
    Truncated(usize),
}

/// A branch trace loaded into memory.
pub struct BinaryTrace {
    pub name: String,
    records: Vec<BranchRecord>,
}
impl BinaryTrace {
    /// Create a [BinaryTrace] from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = std::fs::read(path)?;
        Ok(Self {
            name,
            records: Self::parse(&data)?,
        })
    }

    /// Decode records from raw trace bytes.
    pub fn parse(data: &[u8]) -> Result<Vec<BranchRecord>, TraceError> {
        if data.len() % RECORD_SIZE != 0 {
            return Err(TraceError::Truncated(data.len()));
        }

        let word = |chunk: &[u8], i: usize| {
            u32::from_le_bytes(chunk[i * 4..i * 4 + 4].try_into().unwrap())
        };
        let records = data.chunks_exact(RECORD_SIZE)
            .map(|chunk| BranchRecord {
                address: word(chunk, 0),
                opcode: word(chunk, 1),
                flags: BranchFlags::new(word(chunk, 2)),
                outcome: match word(chunk, 3) {
                    0 => Outcome::N,
                    _ => Outcome::T,
                },
                target: word(chunk, 4),
            })
            .collect();
        Ok(records)
    }

    /// Return the number of records.
    pub fn num_entries(&self) -> usize {
        self.records.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] {
        &self.records
    }
}
