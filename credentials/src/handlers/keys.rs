//! Key publication and administration handlers.

use super::error::ApiError;
use crate::keys::jwks::Jwks;
use crate::providers::{CodeNotifier, SessionStore, UserRepository};
use crate::service::CredentialService;
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::header, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response after a rotation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateKeysResponse {
    /// Kid of the new current key.
    pub new_kid: String,
}

/// Request to retire old keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupKeysRequest {
    /// Keys created more than this many days ago are removed.
    pub max_age_days: u32,
}

/// Response after a cleanup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupKeysResponse {
    /// Always `true`.
    pub ok: bool,
    /// Kids that were removed.
    pub retired: Vec<String>,
}

/// Publish the verification keys.
///
/// ```text
/// GET /.well-known/jwks.json
/// ```
pub async fn jwks<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
) -> Result<impl IntoResponse, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let document: Jwks = service.jwks()?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(document),
    ))
}

/// Generate a new signing key and make it current.
///
/// ```text
/// POST /admin/keys/rotate
/// ```
pub async fn rotate_keys<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
) -> Result<Json<RotateKeysResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let new_kid = service.rotate_keys().await?;

    Ok(Json(RotateKeysResponse { new_kid }))
}

/// Remove non-current keys past the given age.
///
/// ```text
/// POST /admin/keys/cleanup
/// {"maxAgeDays": 7}
/// ```
pub async fn cleanup_keys<U, N, S>(
    State(service): State<Arc<CredentialService<U, N, S>>>,
    payload: Result<Json<CleanupKeysRequest>, JsonRejection>,
) -> Result<Json<CleanupKeysResponse>, ApiError>
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    let Json(request) = payload?;
    let retired = service.cleanup_keys(request.max_age_days)?;

    Ok(Json(CleanupKeysResponse { ok: true, retired }))
}
