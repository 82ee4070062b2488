//! Session handlers.

use super::OkResponse;
use super::error::ApiError;
use super::extractors::{AuthenticatedUser, ClientContext};
use crate::error::PublicError;
use crate::providers::{CodeNotifier, SessionStore, UserRepository};
use crate::service::CredentialService;
use crate::state::{DeviceId, DeviceInfo, SessionId, UserId};
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to create a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// User the verification token was issued to.
    pub user_id: UserId,
    /// Client-chosen secret bound to the session.
    pub session_secret: String,
    /// Token from `/challenge/verify`.
    pub verification_token: String,
    /// Device the client reports for itself.
    #[serde(default)]
    pub device_id: Option<DeviceId>,
}

/// Response with a new session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Session identifier.
    pub session_id: SessionId,
    /// Refresh token for `/sessions/refresh`.
    pub refresh_token: String,
    /// Signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_token_expires_at: DateTime<Utc>,
}

/// Request to refresh a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSessionRequest {
    /// Refresh token from session creation.
    pub refresh_token: String,
    /// Secret given at session creation.
    pub session_secret: String,
}

/// Response with a new access token.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSessionResponse {
    /// Session owner.
    pub user_id: UserId,
    /// Signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_token_expires_at: DateTime<Utc>,
    /// Refresh token to use next time.
    pub refresh_token: String,
}

/// Request to end a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateSessionRequest {
    /// Refresh token of the session to end.
    pub refresh_token: String,
}

/// Authenticated caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    /// User identifier.
    pub user_id: UserId,
    /// Normalized email address or phone number.
    pub user_key: String,
    /// Whether a challenge was ever completed.
    pub verified: bool,
}

/// Create a session.
///
/// ```text
/// POST /sessions
/// {"userId": 7, "sessionSecret": "...", "verificationToken": "..."}
/// ```
pub async fn create_session<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    client: ClientContext,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    if request.session_secret.is_empty() {
        return Err(ApiError::bad_request());
    }

    let device = DeviceInfo {
        device_id: request.device_id,
        user_agent: client.user_agent,
        ip: client.ip,
    };

    let grant = service
        .create_session(
            request.user_id,
            &request.session_secret,
            &request.verification_token,
            device,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: grant.session_id,
            refresh_token: grant.refresh_token,
            access_token: grant.access_token.token,
            access_token_expires_at: grant.access_token.expires_at,
        }),
    ))
}

/// Issue a new access token.
///
/// ```text
/// POST /sessions/refresh
/// {"refreshToken": "...", "sessionSecret": "..."}
/// ```
pub async fn refresh_session<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<RefreshSessionRequest>, JsonRejection>,
) -> Result<Json<RefreshSessionResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    let grant = service
        .refresh_session(&request.refresh_token, &request.session_secret)
        .await?;

    Ok(Json(RefreshSessionResponse {
        user_id: grant.user_id,
        access_token: grant.access_token.token,
        access_token_expires_at: grant.access_token.expires_at,
        refresh_token: grant.refresh_token,
    }))
}

/// End a session. Succeeds whether or not the session existed.
///
/// ```text
/// POST /sessions/terminate
/// {"refreshToken": "..."}
/// ```
pub async fn terminate_session<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<TerminateSessionRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    service.terminate_session(&request.refresh_token).await?;

    Ok(Json(OkResponse::ok()))
}

/// Describe the caller behind the bearer token.
///
/// ```text
/// GET /me
/// Authorization: Bearer <access token>
/// ```
pub async fn current_user<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<CurrentUserResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Some(user) = service.find_user(user_id).await? else {
        tracing::warn!(user_id = %user_id, "Valid token for unknown user");
        return Err(ApiError::new(PublicError::InvalidToken));
    };

    Ok(Json(CurrentUserResponse {
        user_id: user.id,
        user_key: user.user_key,
        verified: user.verified,
    }))
}
