use actix_web::cookie::Cookie;

use crate::error::StateTokenError;
use crate::oauth::state::AuthorizationState;
use crate::session::cookie::CookieFactory;
use crate::settings::ResolvedProvider;
use crate::utils::logging::LoggingHelper;

/// Everything the `/auth/start` response needs
#[derive(Debug)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: AuthorizationState,
    pub state_cookie: Cookie<'static>,
}

/// Builds the provider authorization URL from trusted configuration only
#[derive(Debug, Clone)]
pub struct AuthorizationRedirectBuilder {
    provider: ResolvedProvider,
    cookies: CookieFactory,
}

impl AuthorizationRedirectBuilder {
    #[must_use]
    pub fn new(provider: ResolvedProvider, cookies: CookieFactory) -> Self {
        Self { provider, cookies }
    }

    /// Issue a fresh state and build the redirect that carries it
    ///
    /// # Errors
    ///
    /// Returns [`StateTokenError`] if no state token can be generated.
    pub fn build_redirect(&self) -> Result<AuthorizationRedirect, StateTokenError> {
        let state = AuthorizationState::issue()?;
        Ok(self.build_redirect_for(state))
    }

    /// Build the redirect for an already issued state
    #[must_use]
    pub fn build_redirect_for(&self, state: AuthorizationState) -> AuthorizationRedirect {
        let provider = &self.provider;
        let mut url = provider.authorize_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &provider.client_id)
                .append_pair("redirect_uri", &provider.redirect_uri)
                .append_pair("scope", &provider.scope)
                .append_pair("state", &state.token);
            if let Some(aud) = &provider.fhir_base_url {
                query.append_pair("aud", aud);
            }

            // Sorted so the URL is stable across runs
            let mut extra: Vec<_> = provider.extra_auth_params.iter().collect();
            extra.sort();
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }

        LoggingHelper::log_authorization_url_built(&provider.name, &provider.scope);

        let state_cookie = self.cookies.create_state_cookie(&state);
        AuthorizationRedirect {
            url: url.into(),
            state,
            state_cookie,
        }
    }
}
