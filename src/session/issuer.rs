use actix_web::HttpResponse;

use crate::error::AuthFailureReason;
use crate::session::cookie::{CookieFactory, SESSION_COOKIE_NAME, STATE_COOKIE_NAME};
use crate::utils::response_builder::ResponseBuilder;

/// Produces the terminal responses of the handshake
///
/// Every response from the callback clears the state cookie in the same 302 so
/// a stale state never outlives its callback.
#[derive(Debug, Clone)]
pub struct SessionCookieIssuer {
    cookies: CookieFactory,
    login_path: String,
    landing_path: String,
}

impl SessionCookieIssuer {
    #[must_use]
    pub fn new(
        cookies: CookieFactory,
        login_path: impl Into<String>,
        landing_path: impl Into<String>,
    ) -> Self {
        Self {
            cookies,
            login_path: login_path.into(),
            landing_path: landing_path.into(),
        }
    }

    /// Clear the state cookie and set the session indicator, then land
    #[must_use]
    pub fn complete(&self) -> HttpResponse {
        ResponseBuilder::redirect(
            &self.landing_path,
            vec![
                self.cookies.create_expired_cookie(STATE_COOKIE_NAME),
                self.cookies.create_session_indicator_cookie(),
            ],
        )
    }

    /// Clear the state cookie and send the browser to the login page
    #[must_use]
    pub fn fail(&self, reason: AuthFailureReason) -> HttpResponse {
        ResponseBuilder::error_redirect(
            &self.login_path,
            reason,
            vec![self.cookies.create_expired_cookie(STATE_COOKIE_NAME)],
        )
    }

    /// Clear the session indicator
    #[must_use]
    pub fn sign_out(&self) -> HttpResponse {
        ResponseBuilder::redirect(
            &self.login_path,
            vec![self.cookies.create_expired_cookie(SESSION_COOKIE_NAME)],
        )
    }
}
