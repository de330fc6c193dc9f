//! Browser-side session handling
//!
//! - [`cookie`] - state and session indicator cookies
//! - [`issuer`] - terminal redirects of the handshake
//! - [`identity`] - optional lookup of the signed-in user for audit attribution
//! - [`store`] - persistence collaborator for granted tokens

pub mod cookie;
pub mod identity;
pub mod issuer;
pub mod store;

pub use cookie::{
    bound_state, has_session_indicator, CookieFactory, CookieOptions, SESSION_COOKIE_NAME,
    STATE_COOKIE_NAME,
};
pub use identity::{AnonymousIdentity, HeaderIdentity, IdentityLookup};
pub use issuer::SessionCookieIssuer;
pub use store::{InMemoryTokenStore, StoredAuthorization, TokenStore};
