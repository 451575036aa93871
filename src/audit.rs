//! Audit records for keyset operations.
//!
//! The keyset router emits one [`AuditRecord`] per encrypt or decrypt call.
//! Records carry the key id and input length, never plaintext, ciphertext or
//! key bytes. Sinks are pluggable: keep records in memory with [`AuditLog`],
//! or append them as JSON lines with [`FileAuditSink`].

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A sink that receives audit records. Implement this to forward records
/// to a file, database, or log pipeline.
pub trait AuditSink: Send {
    /// Append a record. Called once per keyset operation.
    fn append(&mut self, record: AuditRecord);
}

/// Which keyset operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

/// One keyset operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation: Operation,
    /// The key that produced the output. `None` when the call failed.
    pub key_id: Option<u32>,
    /// Input length in bytes.
    pub input_len: usize,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(operation: Operation, key_id: Option<u32>, input_len: usize, success: bool) -> Self {
        Self {
            operation,
            key_id,
            input_len,
            success,
            timestamp: Utc::now(),
        }
    }
}

/// An append-only in-memory log.
/// Can forward records to additional sinks via `add_forward_sink`.
#[derive(Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to receive a copy of every record.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }

    /// Number of records for failed operations.
    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| !r.success).count()
    }
}

impl AuditSink for AuditLog {
    fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        self.records.push(record);
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        let written = serde_json::to_string(&record)
            .map_err(std::io::Error::from)
            .and_then(|line| {
                writeln!(self.file, "{line}")?;
                self.file.flush()
            });
        if let Err(err) = written {
            warn!(error = %err, "dropping audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_counts_and_forwards() {
        let mut inner = AuditLog::new();
        inner.append(AuditRecord::new(Operation::Encrypt, Some(7), 3, true));
        assert_eq!(inner.len(), 1);

        let mut log = AuditLog::new();
        log.add_forward_sink(Box::new(AuditLog::new()));
        log.append(AuditRecord::new(Operation::Decrypt, None, 10, false));
        log.append(AuditRecord::new(Operation::Encrypt, Some(1), 10, true));
        assert_eq!(log.len(), 2);
        assert_eq!(log.failures(), 1);
        assert!(format!("{:?}", log).contains("forward_sinks: 1"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = AuditRecord::new(Operation::Encrypt, Some(42), 6, true);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["operation"], "encrypt");
        assert_eq!(value["key_id"], 42);
        assert_eq!(value["input_len"], 6);
        assert_eq!(value["success"], true);
        assert!(value["timestamp"].is_string());
    }
}
