//! Error taxonomy for the authorization broker
//!
//! Every terminal failure of the handshake is reduced to an [`AuthFailureReason`]
//! before it reaches the browser. The richer error values only ever go to the
//! operational log.

use std::fmt;

use thiserror::Error;

/// Failure to produce a state token from the operating-system entropy source
#[derive(Debug, Error)]
pub enum StateTokenError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Failure while exchanging an authorization code at the token endpoint
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token endpoint did not answer within {0} seconds")]
    Timeout(u64),
    #[error("token endpoint request failed: {0}")]
    Network(String),
    #[error("token endpoint returned HTTP {0}")]
    Status(u16),
    #[error("token endpoint returned a malformed body: {0}")]
    MalformedResponse(String),
}

/// Failure to append an entry to the audit sink
#[derive(Debug, Error)]
pub enum AuditWriteError {
    #[error("audit sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit entry could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("audit log target `{0}` is filtered out at info level")]
    TargetDisabled(&'static str),
}

/// Failure to hand an authorization result to the token store
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store rejected the authorization: {0}")]
    Rejected(String),
}

/// Top-level broker error
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Missing or invalid provider configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Returned state did not match the cookie-bound state
    #[error("CSRF check failed: {0}")]
    Csrf(String),
    /// Provider answered the authorization request with `error`
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Callback arrived without `code` or `state`
    #[error("incomplete callback: {0}")]
    IncompleteCallback(String),
    /// Callback query string could not be decoded
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
    #[error(transparent)]
    Entropy(#[from] StateTokenError),
}

/// Coarse, machine-readable reason carried by `?error=` on the login redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailureReason {
    ProviderError,
    MissingParams,
    InvalidState,
    TokenExchangeFailed,
    CallbackError,
}

impl AuthFailureReason {
    pub const ALL: [Self; 5] = [
        Self::ProviderError,
        Self::MissingParams,
        Self::InvalidState,
        Self::TokenExchangeFailed,
        Self::CallbackError,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderError => "provider_error",
            Self::MissingParams => "missing_params",
            Self::InvalidState => "invalid_state",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::CallbackError => "callback_error",
        }
    }

    /// Parse a reason code as found in the login page query string
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.as_str() == code)
    }

    /// Sentence shown in the login page error banner
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::ProviderError => {
                "The health record provider did not grant access. Please try again."
            }
            Self::MissingParams => "The sign-in response was incomplete. Please start again.",
            // Deliberately generic: must not tell an attacker which check failed.
            Self::InvalidState => "Authentication failed. Please start the sign-in again.",
            Self::TokenExchangeFailed => {
                "We could not complete the connection to your health record. Please try again."
            }
            Self::CallbackError => "Something went wrong while signing you in. Please try again.",
        }
    }
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&BrokerError> for AuthFailureReason {
    fn from(err: &BrokerError) -> Self {
        match err {
            BrokerError::Csrf(_) => Self::InvalidState,
            BrokerError::Protocol(_) => Self::ProviderError,
            BrokerError::IncompleteCallback(_) => Self::MissingParams,
            BrokerError::Exchange(_) => Self::TokenExchangeFailed,
            BrokerError::Configuration(_)
            | BrokerError::MalformedCallback(_)
            | BrokerError::TokenStore(_)
            | BrokerError::Entropy(_) => Self::CallbackError,
        }
    }
}
