use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::oauth::state::{AuthorizationState, STATE_TTL_SECONDS};

/// Transient cookie binding the CSRF state to the browser
pub const STATE_COOKIE_NAME: &str = "auth_state";
/// Post-handshake session indicator
pub const SESSION_COOKIE_NAME: &str = "authenticated";

/// Lifetime of the session indicator cookie
pub const SESSION_INDICATOR_HOURS: i64 = 24;

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            // The callback is a cross-site top-level navigation from the
            // provider, which Strict would strip the state cookie from.
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: Duration::hours(SESSION_INDICATOR_HOURS),
        }
    }
}

/// Builds every cookie the broker emits with consistent security attributes
#[derive(Debug, Clone, Copy)]
pub struct CookieFactory {
    cookie_secure: bool,
}

impl CookieFactory {
    #[must_use]
    pub fn new(cookie_secure: bool) -> Self {
        Self { cookie_secure }
    }

    #[must_use]
    pub fn create_cookie(&self, name: &str, value: &str, options: CookieOptions) -> Cookie<'static> {
        Cookie::build(name.to_owned(), value.to_owned())
            .http_only(options.http_only)
            .secure(self.cookie_secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    /// `auth_state=<token>` for ten minutes
    #[must_use]
    pub fn create_state_cookie(&self, state: &AuthorizationState) -> Cookie<'static> {
        self.create_cookie(
            STATE_COOKIE_NAME,
            &state.token,
            CookieOptions {
                max_age: Duration::seconds(STATE_TTL_SECONDS),
                ..Default::default()
            },
        )
    }

    /// `authenticated=true` for 24 hours. Never carries a token.
    #[must_use]
    pub fn create_session_indicator_cookie(&self) -> Cookie<'static> {
        self.create_cookie(SESSION_COOKIE_NAME, "true", CookieOptions::default())
    }

    /// Cookie that clears `name` in the browser (`Max-Age=0`)
    #[must_use]
    pub fn create_expired_cookie(&self, name: &str) -> Cookie<'static> {
        self.create_cookie(
            name,
            "",
            CookieOptions {
                max_age: Duration::ZERO,
                ..Default::default()
            },
        )
    }
}

/// State token bound to this browser, if any
#[must_use]
pub fn bound_state(req: &HttpRequest) -> Option<String> {
    req.cookie(STATE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Whether the browser presents the session indicator
#[must_use]
pub fn has_session_indicator(req: &HttpRequest) -> bool {
    req.cookie(SESSION_COOKIE_NAME)
        .is_some_and(|cookie| cookie.value() == "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::Utc;

    #[test]
    fn test_state_cookie_attributes() {
        let factory = CookieFactory::new(true);
        let state = AuthorizationState::with_token("abc123".to_string(), Utc::now());
        let cookie = factory.create_state_cookie(&state);

        assert_eq!(cookie.name(), STATE_COOKIE_NAME);
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(600)));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_cookies_not_secure_outside_production() {
        let factory = CookieFactory::new(false);
        let cookie = factory.create_session_indicator_cookie();
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[test]
    fn test_session_indicator_cookie() {
        let cookie = CookieFactory::new(true).create_session_indicator_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "true");
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
    }

    #[test]
    fn test_expired_cookie_has_zero_max_age() {
        let cookie = CookieFactory::new(false).create_expired_cookie(STATE_COOKIE_NAME);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(cookie.to_string().contains("Max-Age=0"));
    }

    #[test]
    fn test_bound_state_reads_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(STATE_COOKIE_NAME, "xyz"))
            .to_http_request();
        assert_eq!(bound_state(&req).as_deref(), Some("xyz"));

        let empty = TestRequest::default()
            .cookie(Cookie::new(STATE_COOKIE_NAME, ""))
            .to_http_request();
        assert!(bound_state(&empty).is_none());

        assert!(bound_state(&TestRequest::default().to_http_request()).is_none());
    }

    #[test]
    fn test_has_session_indicator() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "true"))
            .to_http_request();
        assert!(has_session_indicator(&req));
        assert!(!has_session_indicator(&TestRequest::default().to_http_request()));
    }
}
