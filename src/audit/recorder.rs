use std::sync::Arc;

use serde_json::{json, Value};

use crate::audit::entry::{AuditEntry, AuditEventType};
use crate::audit::sink::AuditSink;
use crate::error::AuthFailureReason;
use crate::oauth::AuthorizationResult;

/// Records security-relevant actions without ever failing the caller
///
/// A sink failure is written to the operational log together with the full
/// entry so it can be reconciled later.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    resource_type: String,
}

impl AuditRecorder {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, resource_type: impl Into<String>) -> Self {
        Self {
            sink,
            resource_type: resource_type.into(),
        }
    }

    pub async fn record(
        &self,
        actor_id: Option<&str>,
        event_type: AuditEventType,
        resource_type: &str,
        resource_id: Option<&str>,
        metadata: Value,
    ) {
        let entry = AuditEntry::new(actor_id, event_type, resource_type, resource_id, metadata);
        if let Err(e) = self.sink.append(&entry).await {
            let serialized = serde_json::to_string(&entry)
                .unwrap_or_else(|_| format!("{entry:?}"));
            log::error!(
                target: "audit",
                "Failed to write audit entry {}: {e}; entry pending reconciliation: {serialized}",
                entry.id
            );
        }
    }

    /// `auth_attempt`, only when the actor is known
    pub async fn auth_attempt(&self, actor_id: Option<&str>, provider: &str) {
        let Some(actor_id) = actor_id else {
            log::debug!("Anonymous authorization attempt; not attributed in audit trail");
            return;
        };
        self.record(
            Some(actor_id),
            AuditEventType::AuthAttempt,
            &self.resource_type,
            None,
            json!({ "provider": provider }),
        )
        .await;
    }

    /// `auth_success` carrying only non-secret fields of the result
    pub async fn auth_success(
        &self,
        actor_id: Option<&str>,
        provider: &str,
        result: &AuthorizationResult,
    ) {
        self.record(
            actor_id,
            AuditEventType::AuthSuccess,
            &self.resource_type,
            result.patient_context.as_deref(),
            json!({
                "provider": provider,
                "patient_context": result.patient_context,
                "scope": result.scope,
                "expires_in": result.expires_in,
            }),
        )
        .await;
    }

    /// `auth_failure` for a terminal branch of the callback
    pub async fn auth_failure(
        &self,
        actor_id: Option<&str>,
        provider: &str,
        reason: AuthFailureReason,
    ) {
        self.record(
            actor_id,
            AuditEventType::AuthFailure,
            &self.resource_type,
            None,
            json!({ "provider": provider, "reason": reason.as_str() }),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::sink::MemoryAuditSink;
    use crate::testing::{FailingAuditSink, TestFixtures};

    fn recorder() -> (AuditRecorder, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        (AuditRecorder::new(sink.clone(), "epic_fhir"), sink)
    }

    #[tokio::test]
    async fn test_anonymous_attempt_is_not_recorded() {
        let (recorder, sink) = recorder();
        recorder.auth_attempt(None, "epic").await;
        assert!(sink.entries().is_empty());

        recorder.auth_attempt(Some("user-1"), "epic").await;
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, AuditEventType::AuthAttempt);
        assert_eq!(entries[0].actor_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_success_never_contains_tokens() {
        let (recorder, sink) = recorder();
        let result = TestFixtures::authorization_result();
        recorder.auth_success(Some("user-1"), "epic", &result).await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_id.as_deref(), Some(TestFixtures::PATIENT_ID));
        assert_eq!(entries[0].metadata["patient_context"], TestFixtures::PATIENT_ID);

        let serialized = serde_json::to_string(&entries[0]).unwrap();
        assert!(!serialized.contains(&result.access_token));
        assert!(!serialized.contains(result.refresh_token.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_failure_carries_reason() {
        let (recorder, sink) = recorder();
        recorder
            .auth_failure(None, "epic", AuthFailureReason::InvalidState)
            .await;

        let entries = sink.entries();
        assert_eq!(entries[0].event_type, AuditEventType::AuthFailure);
        assert_eq!(entries[0].metadata["reason"], "invalid_state");
        assert!(entries[0].actor_id.is_none());
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_propagate() {
        let sink = Arc::new(FailingAuditSink::default());
        let recorder = AuditRecorder::new(sink.clone(), "epic_fhir");

        recorder
            .auth_success(Some("user-1"), "epic", &TestFixtures::authorization_result())
            .await;
        assert_eq!(sink.attempts(), 1);
    }
}
