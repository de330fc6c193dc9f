use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of security-relevant action being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AuthAttempt,
    AuthSuccess,
    AuthFailure,
    DataAccess,
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Option<String>,
    pub event_type: AuditEventType,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(
        actor_id: Option<&str>,
        event_type: AuditEventType,
        resource_type: &str,
        resource_id: Option<&str>,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: actor_id.map(ToString::to_string),
            event_type,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.map(ToString::to_string),
            metadata,
            timestamp: Utc::now(),
        }
    }
}
