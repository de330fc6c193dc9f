//! Authorization broker
//!
//! Composes the handshake components. Everything is built from explicit
//! configuration at startup and shared read-only across requests; the only
//! per-flow state lives in the browser's cookies.

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse};

use crate::audit::{sink_from_settings, AuditRecorder, AuditSink};
use crate::error::{AuthFailureReason, BrokerError};
use crate::oauth::{
    AuthorizationRedirectBuilder, CallbackParams, ConsumedStateCache, HttpTokenExchangeClient,
    TokenExchanger,
};
use crate::session::{
    bound_state, has_session_indicator, AnonymousIdentity, CookieFactory, HeaderIdentity,
    IdentityLookup, InMemoryTokenStore, SessionCookieIssuer, TokenStore,
};
use crate::settings::BrokerSettings;
use crate::utils::logging::LoggingHelper;
use crate::utils::response_builder::ResponseBuilder;
use crate::validation::CallbackVerifier;

/// External collaborators of the broker
pub struct BrokerCollaborators {
    pub exchanger: Arc<dyn TokenExchanger>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub token_store: Arc<dyn TokenStore>,
    pub identity: Arc<dyn IdentityLookup>,
}

#[derive(Clone)]
pub struct AuthBroker {
    provider_name: String,
    redirects: AuthorizationRedirectBuilder,
    verifier: CallbackVerifier,
    exchanger: Arc<dyn TokenExchanger>,
    audit: AuditRecorder,
    tokens: Arc<dyn TokenStore>,
    identity: Arc<dyn IdentityLookup>,
    issuer: SessionCookieIssuer,
}

impl AuthBroker {
    /// Build the production broker from settings
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] if the provider configuration is
    /// incomplete, the HTTP client cannot be built, or the audit sink cannot
    /// be opened.
    pub async fn from_settings(settings: &BrokerSettings) -> Result<Self, BrokerError> {
        let provider = settings.resolve_provider()?;
        let exchanger = HttpTokenExchangeClient::new(provider, settings.exchange_timeout())?;
        let audit_sink = sink_from_settings(&settings.audit).await.map_err(|e| {
            BrokerError::Configuration(format!(
                "cannot open {:?} audit sink: {e}",
                settings.audit.sink
            ))
        })?;
        let identity: Arc<dyn IdentityLookup> = match &settings.audit.actor_header {
            Some(header) => Arc::new(HeaderIdentity::new(header.clone())),
            None => Arc::new(AnonymousIdentity),
        };

        Self::with_collaborators(
            settings,
            BrokerCollaborators {
                exchanger: Arc::new(exchanger),
                audit_sink,
                token_store: Arc::new(InMemoryTokenStore::new()),
                identity,
            },
        )
    }

    /// Build a broker around caller-supplied collaborators
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] if the provider configuration is
    /// incomplete.
    pub fn with_collaborators(
        settings: &BrokerSettings,
        collaborators: BrokerCollaborators,
    ) -> Result<Self, BrokerError> {
        let provider = settings.resolve_provider()?;
        let cookies = CookieFactory::new(settings.cookie_secure());

        let verifier = if settings.state.enforce_single_use {
            CallbackVerifier::with_single_use_cache(Arc::new(ConsumedStateCache::new()))
        } else {
            CallbackVerifier::new()
        };

        LoggingHelper::log_provider_configured(
            &provider.name,
            provider.authorize_endpoint.as_str(),
        );

        Ok(Self {
            provider_name: provider.name.clone(),
            redirects: AuthorizationRedirectBuilder::new(provider, cookies),
            verifier,
            exchanger: collaborators.exchanger,
            audit: AuditRecorder::new(
                collaborators.audit_sink,
                settings.audit.resource_type.clone(),
            ),
            tokens: collaborators.token_store,
            identity: collaborators.identity,
            issuer: SessionCookieIssuer::new(
                cookies,
                settings.application.login_path.clone(),
                settings.application.landing_path.clone(),
            ),
        })
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Issue a state cookie and redirect the browser to the provider
    pub async fn start(&self, req: &HttpRequest) -> HttpResponse {
        let actor_id = self.identity.actor_id(req);

        let redirect = match self.redirects.build_redirect() {
            Ok(redirect) => redirect,
            Err(e) => {
                let err = BrokerError::from(e);
                LoggingHelper::log_fatal("Cannot issue authorization state", &err);
                return ResponseBuilder::internal_error();
            }
        };

        self.audit
            .auth_attempt(actor_id.as_deref(), &self.provider_name)
            .await;
        LoggingHelper::log_redirect_issued(&self.provider_name, actor_id.is_some());

        ResponseBuilder::redirect(&redirect.url, vec![redirect.state_cookie])
    }

    /// Verify the provider callback, exchange the code, and issue the session
    pub async fn callback(&self, req: &HttpRequest) -> HttpResponse {
        let actor_id = self.identity.actor_id(req);
        let actor_id = actor_id.as_deref();

        let params = match CallbackParams::from_query(req.query_string()) {
            Ok(params) => params,
            Err(e) => {
                let err = BrokerError::MalformedCallback(e.to_string());
                return self.fail(actor_id, &err).await;
            }
        };

        let outcome = self.verifier.verify(&params, bound_state(req).as_deref());
        let code = match outcome.into_code() {
            Ok(code) => code,
            Err(err) => return self.fail(actor_id, &err).await,
        };

        let result = match self.exchanger.exchange(&code).await {
            Ok(result) => result,
            Err(e) => return self.fail(actor_id, &BrokerError::from(e)).await,
        };

        let audited = result.clone();
        if let Err(e) = self.tokens.store(actor_id, result).await {
            return self.fail(actor_id, &BrokerError::from(e)).await;
        }

        self.audit
            .auth_success(actor_id, &self.provider_name, &audited)
            .await;
        LoggingHelper::log_callback_succeeded(&self.provider_name);
        self.issuer.complete()
    }

    /// Clear the session indicator
    #[must_use]
    pub fn sign_out(&self, req: &HttpRequest) -> HttpResponse {
        if !has_session_indicator(req) {
            log::debug!("Sign-out requested without a session indicator");
        }
        self.issuer.sign_out()
    }

    async fn fail(&self, actor_id: Option<&str>, err: &BrokerError) -> HttpResponse {
        let reason = AuthFailureReason::from(err);
        LoggingHelper::log_callback_failed(&self.provider_name, reason, err);
        self.audit
            .auth_failure(actor_id, &self.provider_name, reason)
            .await;
        self.issuer.fail(reason)
    }
}
