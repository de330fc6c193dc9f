use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::audit::entry::AuditEntry;
use crate::error::AuditWriteError;

/// Append-only destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuditWriteError`] if the entry was not durably written.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError>;
}

/// Appends one JSON object per line to a file, syncing after every entry
pub struct JsonLinesAuditSink {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonLinesAuditSink {
    /// Open (or create) the audit file in append mode
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened for appending.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

/// Log target every audit line is written to
pub const AUDIT_LOG_TARGET: &str = "audit";

/// Writes entries to the `audit` log target
///
/// Only as durable as the installed logger. A filtered target is reported as
/// a write failure rather than dropping the entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl LogAuditSink {
    /// Whether the installed logger keeps `audit` lines at info level
    #[must_use]
    pub fn is_enabled() -> bool {
        log::log_enabled!(target: AUDIT_LOG_TARGET, log::Level::Info)
    }
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        if !Self::is_enabled() {
            return Err(AuditWriteError::TargetDisabled(AUDIT_LOG_TARGET));
        }
        let line = serde_json::to_string(entry)?;
        log::info!(target: AUDIT_LOG_TARGET, "{line}");
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}
