#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the broker
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod audit;
pub mod broker;
pub mod error;
pub mod handlers;
pub mod oauth;
pub mod session;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;
pub mod validation;

/// Re-export commonly used items
pub use broker::{AuthBroker, BrokerCollaborators};
pub use error::{AuthFailureReason, BrokerError};
pub use handlers::{auth_callback, auth_logout, auth_start, configure_routes, health};
pub use settings::BrokerSettings;
