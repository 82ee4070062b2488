//! Router composition.
//!
//! The public and administrative routes are separate routers so that the
//! administrative ones can be bound to a private listener.

use crate::handlers::{challenge, keys, session};
use crate::providers::{CodeNotifier, SessionStore, UserRepository};
use crate::service::CredentialService;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Public credential endpoints.
///
/// # Routes
///
/// ## Challenge
/// - `POST /challenge` - Send a code
/// - `POST /challenge/resend` - Send a fresh code
/// - `POST /challenge/verify` - Exchange a code for a verification token
///
/// ## Sessions
/// - `POST /sessions` - Create a session
/// - `POST /sessions/refresh` - Get a new access token
/// - `POST /sessions/terminate` - End a session
/// - `GET /me` - Describe the bearer of an access token
///
/// ## Keys
/// - `GET /.well-known/jwks.json` - Published verification keys
///
/// # Example
///
/// ```rust,ignore
/// let service = Arc::new(CredentialService::builder(users, notifier, sessions).build()?);
///
/// let app = Router::new()
///     .nest("/api/v1/auth", public_router(service.clone()))
///     .layer(TraceLayer::new_for_http());
/// ```
pub fn public_router<U, N, S>(service: Arc<CredentialService<U, N, S>>) -> Router
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        // Challenge routes
        .route("/challenge", post(challenge::issue_challenge::<U, N, S>))
        .route("/challenge/resend", post(challenge::resend_challenge::<U, N, S>))
        .route("/challenge/verify", post(challenge::verify_challenge::<U, N, S>))

        // Session routes
        .route("/sessions", post(session::create_session::<U, N, S>))
        .route("/sessions/refresh", post(session::refresh_session::<U, N, S>))
        .route("/sessions/terminate", post(session::terminate_session::<U, N, S>))
        .route("/me", get(session::current_user::<U, N, S>))

        // Key publication
        .route("/.well-known/jwks.json", get(keys::jwks::<U, N, S>))

        .with_state(service)
}

/// Administrative key endpoints.
///
/// # Routes
///
/// - `POST /admin/keys/rotate` - Make a freshly generated key current
/// - `POST /admin/keys/cleanup` - Remove old non-current keys
pub fn admin_router<U, N, S>(service: Arc<CredentialService<U, N, S>>) -> Router
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/admin/keys/rotate", post(keys::rotate_keys::<U, N, S>))
        .route("/admin/keys/cleanup", post(keys::cleanup_keys::<U, N, S>))
        .with_state(service)
}
