//! Shared test helpers
//!
//! - [`fixtures`] - provider configuration and granted tokens
//! - [`mock`] - fake collaborators for the handshake
//! - [`assertions`] - helpers for inspecting redirect responses
//!
//! Compiled for unit tests and behind the `testing` feature.
//!
//! ```rust
//! use fhir_auth_broker::testing::{TestFixtures, FakeTokenExchanger};
//!
//! let provider = TestFixtures::resolved_provider();
//! let exchanger = FakeTokenExchanger::succeeding(TestFixtures::authorization_result());
//! assert_eq!(provider.name, "epic");
//! assert_eq!(exchanger.calls(), 0);
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use fixtures::{TestCollaborators, TestFixtures};
pub use mock::{FailingAuditSink, FailingTokenStore, FakeTokenExchanger, MockCallback};
