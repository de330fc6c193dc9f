//! OAuth authorization-code handshake
//!
//! State tokens, the outgoing authorization redirect, and the code exchange
//! against the provider's token endpoint.

pub mod exchange;
pub mod redirect;
pub mod state;

pub use exchange::{AuthorizationResult, HttpTokenExchangeClient, TokenExchanger};
pub use redirect::{AuthorizationRedirect, AuthorizationRedirectBuilder};
pub use state::{generate_state_token, AuthorizationState, ConsumedStateCache};

use serde::Deserialize;

/// Query parameters the provider sends back to the callback endpoint
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for query strings that cannot be
    /// decoded, e.g. a parameter given twice.
    pub fn from_query(query: &str) -> Result<Self, actix_web::error::QueryPayloadError> {
        actix_web::web::Query::<Self>::from_query(query).map(actix_web::web::Query::into_inner)
    }
}
