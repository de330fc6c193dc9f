// Centralized logging for the handshake. Tokens never reach these lines.
use log::{debug, error, info, warn};

use crate::error::{AuthFailureReason, BrokerError};
use crate::oauth::AuthorizationResult;

pub struct LoggingHelper;

impl LoggingHelper {
    pub fn log_provider_configured(provider: &str, authorize_endpoint: &str) {
        info!("✅ {provider} authorization configured ({authorize_endpoint})");
    }

    pub fn log_authorization_url_built(provider: &str, scope: &str) {
        debug!("Built {provider} authorization URL with scope: {scope}");
    }

    pub fn log_redirect_issued(provider: &str, attributed: bool) {
        info!(
            "Redirecting to {provider} for authorization ({})",
            if attributed { "attributed" } else { "anonymous" }
        );
    }

    pub fn log_token_exchange_start(provider: &str) {
        info!("Exchanging authorization code for tokens with {provider}");
    }

    /// Provider error bodies go to debug only; they may echo request data
    pub fn log_token_exchange_rejected(provider: &str, status: u16, body: &str) {
        warn!("Token exchange with {provider} rejected with HTTP {status}");
        debug!("{provider} token endpoint error body: {body}");
    }

    pub fn log_token_exchange_summary(provider: &str, result: &AuthorizationResult) {
        info!(
            "Token exchange summary for {provider}: refresh_token={}, token_type={}, scope={:?}, expires_in={:?}, patient_context={}",
            result.refresh_token.as_ref().map_or("missing", |_| "present"),
            result.token_type,
            result.scope,
            result.expires_in,
            result.patient_context.as_ref().map_or("missing", |_| "present"),
        );
    }

    pub fn log_callback_failed(provider: &str, reason: AuthFailureReason, err: &BrokerError) {
        warn!("Authorization callback for {provider} ended with {reason}: {err}");
    }

    pub fn log_callback_succeeded(provider: &str) {
        info!("Authorization with {provider} completed; session indicator issued");
    }

    pub fn log_fatal(context: &str, err: &dyn std::fmt::Display) {
        error!("{context}: {err}");
    }
}
