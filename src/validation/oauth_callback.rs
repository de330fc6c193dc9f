//! OAuth callback validation
//!
//! Checks run in a fixed order: provider `error`, then presence of `code` and
//! `state`, then the state match. Each check is terminal.

use std::sync::Arc;

use log::{debug, warn};

use crate::error::BrokerError;
use crate::oauth::state::{state_matches, ConsumedStateCache};
use crate::oauth::CallbackParams;

/// Terminal state of one callback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Provider answered with `error`; nothing else is inspected
    ErrorFromProvider { error: String },
    /// `code` or `state` absent or blank
    MissingParams,
    /// No bound state, a different state, or a state already consumed
    StateMismatch,
    /// Safe to exchange `code`
    Verified { code: String },
}

impl CallbackOutcome {
    /// The authorization code, or the error that ends the flow
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Protocol`], [`BrokerError::IncompleteCallback`]
    /// or [`BrokerError::Csrf`] for every outcome other than `Verified`.
    pub fn into_code(self) -> Result<String, BrokerError> {
        match self {
            Self::Verified { code } => Ok(code),
            Self::ErrorFromProvider { error } => Err(BrokerError::Protocol(format!(
                "provider returned error `{error}`"
            ))),
            Self::MissingParams => Err(BrokerError::IncompleteCallback(
                "code or state is missing".to_string(),
            )),
            Self::StateMismatch => Err(BrokerError::Csrf(
                "returned state is not bound to this browser".to_string(),
            )),
        }
    }
}

/// Verifies callbacks against the state bound to the browser
#[derive(Debug, Clone, Default)]
pub struct CallbackVerifier {
    consumed: Option<Arc<ConsumedStateCache>>,
}

impl CallbackVerifier {
    /// Verifier relying on the state cookie alone
    #[must_use]
    pub fn new() -> Self {
        Self { consumed: None }
    }

    /// Verifier that also refuses any state seen before
    #[must_use]
    pub fn with_single_use_cache(cache: Arc<ConsumedStateCache>) -> Self {
        Self {
            consumed: Some(cache),
        }
    }

    #[must_use]
    pub fn verify(&self, params: &CallbackParams, bound_state: Option<&str>) -> CallbackOutcome {
        if let Some(error) = &params.error {
            warn!("Provider returned an error in the callback");
            debug!(
                "Provider error: {error}, description: {:?}",
                params.error_description
            );
            return CallbackOutcome::ErrorFromProvider {
                error: error.clone(),
            };
        }

        let (Some(code), Some(received_state)) = (
            non_blank(params.code.as_deref()),
            non_blank(params.state.as_deref()),
        ) else {
            warn!("Callback is missing code or state");
            return CallbackOutcome::MissingParams;
        };

        let Some(bound_state) = bound_state else {
            warn!("Callback arrived without a bound state cookie; possible CSRF");
            return CallbackOutcome::StateMismatch;
        };

        if !state_matches(bound_state, received_state) {
            warn!("Callback state does not match the bound state; possible CSRF");
            return CallbackOutcome::StateMismatch;
        }

        if let Some(cache) = &self.consumed {
            if !cache.consume(bound_state) {
                warn!("Callback state was already consumed; rejecting replay");
                return CallbackOutcome::StateMismatch;
            }
        }

        debug!("Callback state verified");
        CallbackOutcome::Verified {
            code: code.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
