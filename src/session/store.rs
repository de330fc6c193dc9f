use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TokenStoreError;
use crate::oauth::AuthorizationResult;

/// Takes ownership of the tokens once the exchange succeeded
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TokenStoreError`] if the tokens could not be persisted.
    async fn store(
        &self,
        actor_id: Option<&str>,
        result: AuthorizationResult,
    ) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Clone)]
pub struct StoredAuthorization {
    pub actor_id: Option<String>,
    pub result: AuthorizationResult,
    pub stored_at: DateTime<Utc>,
}

/// Process-local token store keyed by patient context, falling back to actor
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    entries: Mutex<HashMap<String, StoredAuthorization>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredAuthorization> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store(
        &self,
        actor_id: Option<&str>,
        result: AuthorizationResult,
    ) -> Result<(), TokenStoreError> {
        let key = result
            .patient_context
            .clone()
            .or_else(|| actor_id.map(ToString::to_string))
            .ok_or_else(|| {
                TokenStoreError::Rejected("no patient context or actor to key tokens by".to_string())
            })?;

        let stored = StoredAuthorization {
            actor_id: actor_id.map(ToString::to_string),
            result,
            stored_at: Utc::now(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, stored);
        Ok(())
    }
}
