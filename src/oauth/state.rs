//! CSRF state tokens
//!
//! A state token is 256 bits from the operating-system CSPRNG, base64url encoded
//! without padding. It is bound to the browser through the `auth_state` cookie
//! and must come back unchanged in the provider callback.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, TryRngCore};
use subtle::ConstantTimeEq;

use crate::error::StateTokenError;

/// Bytes of entropy per state token
pub const STATE_TOKEN_BYTES: usize = 32;

/// Lifetime of a state token and of the cookie that carries it
pub const STATE_TTL_SECONDS: i64 = 600;

/// Generate a fresh, unguessable state token
///
/// # Errors
///
/// Returns [`StateTokenError::EntropyUnavailable`] if the operating system
/// cannot supply random bytes. There is no fallback generator.
pub fn generate_state_token() -> Result<String, StateTokenError> {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| StateTokenError::EntropyUnavailable(e.to_string()))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Constant-time comparison of a returned state against the bound one
#[must_use]
pub fn state_matches(bound: &str, received: &str) -> bool {
    bound.as_bytes().ct_eq(received.as_bytes()).into()
}

/// One outstanding authorization initiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationState {
    /// Issue a new state with a fresh token, valid for ten minutes
    ///
    /// # Errors
    ///
    /// Propagates [`StateTokenError`] from the entropy source.
    pub fn issue() -> Result<Self, StateTokenError> {
        let token = generate_state_token()?;
        Ok(Self::with_token(token, Utc::now()))
    }

    #[must_use]
    pub fn with_token(token: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            token,
            issued_at,
            expires_at: issued_at + Duration::seconds(STATE_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Server-side record of consumed state tokens
///
/// Optional hardening: cookies alone cannot stop a replay of a captured
/// `(cookie, state)` pair. Entries are kept until the token could no longer be
/// valid anyway and pruned lazily.
#[derive(Debug, Default)]
pub struct ConsumedStateCache {
    consumed: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ConsumedStateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `token` consumed. Returns `false` if it had already been consumed.
    pub fn consume(&self, token: &str) -> bool {
        self.consume_at(token, Utc::now())
    }

    pub fn consume_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut consumed = self
            .consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        consumed.retain(|_, forget_at| *forget_at > now);

        if consumed.contains_key(token) {
            return false;
        }
        consumed.insert(
            token.to_string(),
            now + Duration::seconds(STATE_TTL_SECONDS),
        );
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
