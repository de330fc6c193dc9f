//! Security audit trail
//!
//! Every authorization attempt, success and failure is appended to an
//! [`AuditSink`]. Entries are never mutated or deleted by the broker.

pub mod entry;
pub mod recorder;
pub mod sink;

pub use entry::{AuditEntry, AuditEventType};
pub use recorder::AuditRecorder;
pub use sink::{AuditSink, JsonLinesAuditSink, LogAuditSink, MemoryAuditSink};

use std::sync::Arc;

use crate::settings::{AuditSettings, AuditSinkKind};

/// Build the sink selected in configuration
///
/// # Errors
///
/// Returns the I/O error if the JSON-lines file cannot be opened, or an
/// error if the log sink is selected while the `audit` target is filtered out.
pub async fn sink_from_settings(settings: &AuditSettings) -> std::io::Result<Arc<dyn AuditSink>> {
    let sink: Arc<dyn AuditSink> = match settings.sink {
        AuditSinkKind::Jsonl => Arc::new(JsonLinesAuditSink::open(&settings.log_path).await?),
        AuditSinkKind::Log => {
            if !LogAuditSink::is_enabled() {
                return Err(std::io::Error::other(
                    "audit sink \"log\" selected but the audit log target is filtered out",
                ));
            }
            Arc::new(LogAuditSink)
        }
        AuditSinkKind::Memory => Arc::new(MemoryAuditSink::new()),
    };
    Ok(sink)
}
