//! # Credential Issuer
//!
//! Passwordless credential issuance: one-time challenge codes, single-use
//! verification tokens, long-lived device sessions and short-lived RS256
//! access tokens signed by a rotating key ring.
//!
//! ## Flow
//!
//! ```text
//! issue_challenge ──► code via CodeNotifier
//! verify_challenge ──► verification token (single use, 15 min)
//! create_session ──► refresh token + access token
//! refresh_session ──► new access token
//! GET /.well-known/jwks.json ──► public keys for third-party verification
//! ```
//!
//! ## Components
//!
//! - [`challenge::ChallengeStore`]: issues and verifies one-time codes
//! - [`verification::VerificationTokenStore`]: bridges challenge and session
//! - [`keys::KeyRing`]: RSA key pairs, rotation, cleanup, JWKS export
//! - [`token::TokenIssuer`]: signs and verifies access tokens
//! - [`session::SessionManager`]: creates, refreshes and ends sessions
//! - [`service::CredentialService`]: owns all of the above
//!
//! Persistence and code delivery are injected through the traits in
//! [`providers`]. In-memory implementations live in [`stores`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use credential_issuer::prelude::*;
//!
//! let service = CredentialService::builder(
//!     Arc::new(InMemoryUserRepository::new()),
//!     Arc::new(ConsoleNotifier::new()),
//!     Arc::new(InMemorySessionStore::new()),
//! )
//! .build()?;
//!
//! service.issue_challenge("user@example.com").await?;
//! let verified = service.verify_challenge("user@example.com", "482193").await?;
//! let grant = service
//!     .create_session(verified.user_id, "secret", &verified.verification_token, DeviceInfo::default())
//!     .await?;
//! assert_eq!(service.authenticate(&grant.access_token.token)?, verified.user_id);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod challenge;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod providers;
pub mod secret;
pub mod service;
pub mod session;
pub mod state;
pub mod stores;
pub mod token;
pub mod utils;
pub mod verification;

mod task;

// Mock implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// HTTP surface
#[cfg(feature = "axum")]
pub mod handlers;
#[cfg(feature = "axum")]
pub mod router;

// Re-export main types for convenience
pub use clock::{Clock, SystemClock};
pub use config::CredentialConfig;
pub use error::{AuthError, PublicError, Result};
pub use service::{CredentialService, CredentialServiceBuilder};
pub use state::{AccessToken, DeviceId, DeviceInfo, Session, SessionId, UserId};

/// Common imports.
pub mod prelude {
    pub use crate::config::{
        ChallengeConfig, CredentialConfig, KeyRingConfig, SessionConfig, TokenConfig,
        VerificationConfig,
    };
    pub use crate::error::{AuthError, PublicError, Result};
    pub use crate::providers::{CodeNotifier, ConsoleNotifier, SessionStore, UserRepository};
    pub use crate::service::CredentialService;
    pub use crate::state::{
        AccessToken, ChallengeVerified, DeviceInfo, RefreshGrant, SessionGrant, UserId,
    };
    pub use crate::stores::{InMemorySessionStore, InMemoryUserRepository};
    pub use std::sync::Arc;
}
