//! Fake collaborators for isolated handshake tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::{AuditWriteError, ExchangeError, TokenStoreError};
use crate::oauth::{AuthorizationResult, CallbackParams, TokenExchanger};
use crate::session::TokenStore;

/// Callback query parameters as the provider would send them
pub struct MockCallback;

impl MockCallback {
    #[must_use]
    pub fn success(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            ..CallbackParams::default()
        }
    }

    #[must_use]
    pub fn error(error: &str) -> CallbackParams {
        CallbackParams {
            error: Some(error.to_string()),
            error_description: Some("The resource owner denied the request".to_string()),
            ..CallbackParams::default()
        }
    }
}

enum ExchangeBehavior {
    Grant(AuthorizationResult),
    RejectWithStatus(u16),
    Timeout(u64),
}

/// Token exchanger that records the codes it was given
pub struct FakeTokenExchanger {
    behavior: ExchangeBehavior,
    codes: Mutex<Vec<String>>,
}

impl FakeTokenExchanger {
    #[must_use]
    pub fn succeeding(result: AuthorizationResult) -> Self {
        Self::with_behavior(ExchangeBehavior::Grant(result))
    }

    #[must_use]
    pub fn rejecting(status: u16) -> Self {
        Self::with_behavior(ExchangeBehavior::RejectWithStatus(status))
    }

    #[must_use]
    pub fn timing_out(seconds: u64) -> Self {
        Self::with_behavior(ExchangeBehavior::Timeout(seconds))
    }

    fn with_behavior(behavior: ExchangeBehavior) -> Self {
        Self {
            behavior,
            codes: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.codes().len()
    }

    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TokenExchanger for FakeTokenExchanger {
    async fn exchange(&self, code: &str) -> Result<AuthorizationResult, ExchangeError> {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code.to_string());

        match &self.behavior {
            ExchangeBehavior::Grant(result) => Ok(result.clone()),
            ExchangeBehavior::RejectWithStatus(status) => Err(ExchangeError::Status(*status)),
            ExchangeBehavior::Timeout(seconds) => Err(ExchangeError::Timeout(*seconds)),
        }
    }
}

/// Audit sink whose every write fails
#[derive(Debug, Default)]
pub struct FailingAuditSink {
    attempts: AtomicUsize,
}

impl FailingAuditSink {
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _entry: &AuditEntry) -> Result<(), AuditWriteError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditWriteError::Io(std::io::Error::other("disk full")))
    }
}

/// Token store that refuses every authorization
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTokenStore;

#[async_trait]
impl TokenStore for FailingTokenStore {
    async fn store(
        &self,
        _actor_id: Option<&str>,
        _result: AuthorizationResult,
    ) -> Result<(), TokenStoreError> {
        Err(TokenStoreError::Rejected("store unavailable".to_string()))
    }
}
