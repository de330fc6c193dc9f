//! Authorization code exchange
//!
//! Exactly one POST to the token endpoint per callback. Authorization codes are
//! single-use upstream, so a failed exchange is final and the browser has to
//! start the flow again.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{BrokerError, ExchangeError};
use crate::settings::ResolvedProvider;
use crate::utils::logging::LoggingHelper;

/// Largest token endpoint body that is read before giving up
pub const MAX_TOKEN_RESPONSE_BYTES: usize = 64 * 1024;

/// Tokens granted by the provider
///
/// Ownership moves to the token store. `Debug` never prints the tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    /// Provider-specific id of the authorized subject (Epic `patient`)
    pub patient_context: Option<String>,
}

impl fmt::Debug for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationResult")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("patient_context", &self.patient_context)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    patient: Option<String>,
}

impl TokenResponse {
    fn into_result(self) -> Result<AuthorizationResult, ExchangeError> {
        if self.access_token.trim().is_empty() {
            return Err(ExchangeError::MalformedResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(AuthorizationResult {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: self.expires_in,
            scope: self.scope,
            patient_context: self.patient,
        })
    }
}

/// Exchanges an authorization code for tokens
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExchangeError`] on timeout, transport failure, non-success
    /// status, or an unparseable body. Callers must not retry with the same code.
    async fn exchange(&self, code: &str) -> Result<AuthorizationResult, ExchangeError>;
}

/// [`TokenExchanger`] that talks to the provider's token endpoint over HTTPS
#[derive(Clone)]
pub struct HttpTokenExchangeClient {
    provider: ResolvedProvider,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpTokenExchangeClient {
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] if the HTTP client cannot be built.
    pub fn new(provider: ResolvedProvider, timeout: Duration) -> Result<Self, BrokerError> {
        // A redirect would turn the POST into extra requests
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BrokerError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            provider,
            http_client,
            timeout,
        })
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> ExchangeError {
        if err.is_timeout() {
            ExchangeError::Timeout(self.timeout.as_secs())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<String, ExchangeError> {
        if response
            .content_length()
            .is_some_and(|len| len > MAX_TOKEN_RESPONSE_BYTES as u64)
        {
            return Err(oversized_body());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_transport_error(&e))?
        {
            if body.len() + chunk.len() > MAX_TOKEN_RESPONSE_BYTES {
                return Err(oversized_body());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn oversized_body() -> ExchangeError {
    ExchangeError::MalformedResponse(format!(
        "body exceeds {MAX_TOKEN_RESPONSE_BYTES} bytes"
    ))
}

#[async_trait]
impl TokenExchanger for HttpTokenExchangeClient {
    async fn exchange(&self, code: &str) -> Result<AuthorizationResult, ExchangeError> {
        let provider = &self.provider;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", provider.redirect_uri.as_str()),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
        ];

        LoggingHelper::log_token_exchange_start(&provider.name);
        let response = self
            .http_client
            .post(provider.token_endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if !status.is_success() {
            LoggingHelper::log_token_exchange_rejected(&provider.name, status.as_u16(), &body);
            return Err(ExchangeError::Status(status.as_u16()));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;
        let result = token_response.into_result()?;

        LoggingHelper::log_token_exchange_summary(&provider.name, &result);
        Ok(result)
    }
}
