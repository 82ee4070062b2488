//! Challenge handlers.
//!
//! Issue and resend always answer `{"ok": true}` on success; the code itself
//! only ever travels through the notifier.

use super::OkResponse;
use super::error::ApiError;
use crate::providers::{CodeNotifier, SessionStore, UserRepository};
use crate::service::CredentialService;
use crate::state::UserId;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to issue or resend a code.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Email address or phone number.
    pub user_key: String,
}

/// Request to verify a code.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChallengeRequest {
    /// Email address or phone number.
    pub user_key: String,
    /// Code as received.
    pub code: String,
}

/// Response after a successful verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChallengeResponse {
    /// Verified user.
    pub user_id: UserId,
    /// Single-use token for session creation.
    pub verification_token: String,
}

/// Send a code.
///
/// ```text
/// POST /challenge
/// {"userKey": "user@example.com"}
/// ```
pub async fn issue_challenge<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    service.issue_challenge(&request.user_key).await?;

    Ok(Json(OkResponse::ok()))
}

/// Send a fresh code, replacing the pending one.
///
/// ```text
/// POST /challenge/resend
/// {"userKey": "user@example.com"}
/// ```
pub async fn resend_challenge<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    service.resend_challenge(&request.user_key).await?;

    Ok(Json(OkResponse::ok()))
}

/// Verify a code.
///
/// ```text
/// POST /challenge/verify
/// {"userKey": "user@example.com", "code": "482193"}
/// ```
///
/// # Response
///
/// ```json
/// {"userId": 7, "verificationToken": "..."}
/// ```
pub async fn verify_challenge<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<VerifyChallengeRequest>, JsonRejection>,
) -> Result<Json<VerifyChallengeResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    let verified = service
        .verify_challenge(&request.user_key, &request.code)
        .await?;

    Ok(Json(VerifyChallengeResponse {
        user_id: verified.user_id,
        verification_token: verified.verification_token,
    }))
}
