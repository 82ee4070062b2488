//! Request extractors.
//!
//! - [`BearerToken`]: raw token from `Authorization: Bearer ...`
//! - [`AuthenticatedUser`]: bearer token verified against the key ring
//! - [`ClientContext`]: user agent and client address for session records

use super::error::ApiError;
use crate::providers::{CodeNotifier, SessionStore, UserRepository};
use crate::service::CredentialService;
use crate::state::UserId;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Bearer token from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing authorization header");
                ApiError::unauthorized()
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::debug!("Malformed authorization header");
                ApiError::unauthorized()
            })?;

        Ok(Self(token.to_string()))
    }
}

/// Caller whose access token verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<U, N, S> FromRequestParts<Arc<CredentialService<U, N, S>>> for AuthenticatedUser
where
    U: UserRepository + 'static,
    N: CodeNotifier + 'static,
    S: SessionStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        service: &Arc<CredentialService<U, N, S>>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, service).await?;
        let user_id = service.authenticate(&token)?;

        Ok(Self(user_id))
    }
}

/// Client details recorded on new sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// `User-Agent` header, if present.
    pub user_agent: Option<String>,
    /// Client address, if one could be determined.
    pub ip: Option<IpAddr>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        let ip = client_ip(&parts.headers).or_else(|| connect_info.map(|c| c.0.ip()));

        Ok(Self { user_agent, ip })
    }
}

/// First address of `X-Forwarded-For`, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
