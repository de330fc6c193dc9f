//! Pre-built test data

use std::collections::HashMap;
use std::sync::Arc;

use crate::audit::MemoryAuditSink;
use crate::broker::BrokerCollaborators;
use crate::oauth::AuthorizationResult;
use crate::session::{AnonymousIdentity, InMemoryTokenStore};
use crate::settings::{AuditSinkKind, BrokerSettings, ResolvedProvider};
use crate::testing::mock::FakeTokenExchanger;

pub struct TestFixtures;

/// Handles on the fakes wired into [`TestFixtures::collaborators`]
#[derive(Clone)]
pub struct TestCollaborators {
    pub exchanger: Arc<FakeTokenExchanger>,
    pub audit: Arc<MemoryAuditSink>,
    pub tokens: Arc<InMemoryTokenStore>,
}

impl TestFixtures {
    pub const CLIENT_ID: &'static str = "test-client-id";
    pub const CLIENT_SECRET: &'static str = "test-client-secret";
    pub const REDIRECT_URI: &'static str = "https://broker.example.org/auth/callback";
    pub const AUTHORIZE_ENDPOINT: &'static str = "https://fhir.example.org/oauth2/authorize";
    pub const TOKEN_ENDPOINT: &'static str = "https://fhir.example.org/oauth2/token";
    pub const FHIR_BASE_URL: &'static str = "https://fhir.example.org/api/FHIR/R4";
    pub const SCOPE: &'static str = "launch/patient openid patient/*.read";
    pub const PATIENT_ID: &'static str = "eq081-VQEgP8drUUqCWzHfw3";

    /// Fully resolved Epic-style provider
    ///
    /// # Panics
    ///
    /// Panics if the fixture endpoints are not valid URLs.
    #[must_use]
    pub fn resolved_provider() -> ResolvedProvider {
        ResolvedProvider {
            name: "epic".to_string(),
            client_id: Self::CLIENT_ID.to_string(),
            client_secret: Self::CLIENT_SECRET.to_string(),
            authorize_endpoint: url::Url::parse(Self::AUTHORIZE_ENDPOINT).unwrap(),
            token_endpoint: url::Url::parse(Self::TOKEN_ENDPOINT).unwrap(),
            redirect_uri: Self::REDIRECT_URI.to_string(),
            scope: Self::SCOPE.to_string(),
            fhir_base_url: Some(Self::FHIR_BASE_URL.to_string()),
            extra_auth_params: HashMap::new(),
        }
    }

    /// Development settings with a complete provider and an in-memory audit sink
    #[must_use]
    pub fn settings() -> BrokerSettings {
        let mut settings = BrokerSettings::default();
        settings.provider.client_id = Some(Self::CLIENT_ID.to_string());
        settings.provider.client_secret = Some(Self::CLIENT_SECRET.to_string());
        settings.provider.authorize_endpoint = Some(Self::AUTHORIZE_ENDPOINT.to_string());
        settings.provider.token_endpoint = Some(Self::TOKEN_ENDPOINT.to_string());
        settings.provider.redirect_uri = Some(Self::REDIRECT_URI.to_string());
        settings.provider.scope = Self::SCOPE.to_string();
        settings.provider.fhir_base_url = Some(Self::FHIR_BASE_URL.to_string());
        settings.audit.sink = AuditSinkKind::Memory;
        settings
    }

    #[must_use]
    pub fn authorization_result() -> AuthorizationResult {
        AuthorizationResult {
            access_token: "access-token-value".to_string(),
            refresh_token: Some("refresh-token-value".to_string()),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            scope: Some(Self::SCOPE.to_string()),
            patient_context: Some(Self::PATIENT_ID.to_string()),
        }
    }

    /// Fakes for every broker collaborator, with handles for inspection
    #[must_use]
    pub fn collaborators() -> (BrokerCollaborators, TestCollaborators) {
        Self::collaborators_with(FakeTokenExchanger::succeeding(Self::authorization_result()))
    }

    #[must_use]
    pub fn collaborators_with(
        exchanger: FakeTokenExchanger,
    ) -> (BrokerCollaborators, TestCollaborators) {
        let handles = TestCollaborators {
            exchanger: Arc::new(exchanger),
            audit: Arc::new(MemoryAuditSink::new()),
            tokens: Arc::new(InMemoryTokenStore::new()),
        };
        let collaborators = BrokerCollaborators {
            exchanger: handles.exchanger.clone(),
            audit_sink: handles.audit.clone(),
            token_store: handles.tokens.clone(),
            identity: Arc::new(AnonymousIdentity),
        };
        (collaborators, handles)
    }
}
