//! Validation of inbound provider callbacks
//!
//! - [`oauth_callback`] - callback state machine and CSRF state check

pub mod oauth_callback;

pub use oauth_callback::{CallbackOutcome, CallbackVerifier};
