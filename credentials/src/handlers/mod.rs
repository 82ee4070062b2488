//! Axum handlers for the credential endpoints.
//!
//! Handlers are generic over the collaborator types and take the service as
//! `State<Arc<CredentialService<U, N, S>>>`. See [`crate::router`] for the
//! route table.

use serde::{Deserialize, Serialize};

pub mod challenge;
pub mod error;
pub mod extractors;
pub mod keys;
pub mod session;

pub use error::{ApiError, ErrorResponse};
pub use extractors::{AuthenticatedUser, BearerToken, ClientContext};

/// Body of endpoints that only report success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OkResponse {
    /// Always `true`.
    pub ok: bool,
}

impl OkResponse {
    /// `{"ok": true}`
    #[must_use]
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}
