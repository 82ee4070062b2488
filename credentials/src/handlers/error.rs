//! HTTP error responses.
//!
//! Every failure leaving a handler goes through [`ApiError`], which only
//! ever carries a [`PublicError`]. The detailed [`AuthError`] is logged at
//! the conversion point and then dropped.

use crate::error::{AuthError, PublicError};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub code: String,
    /// User-facing message.
    pub message: String,
}

/// Handler error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError(PublicError);

impl ApiError {
    /// Wrap a public error category.
    #[must_use]
    pub const fn new(error: PublicError) -> Self {
        Self(error)
    }

    /// Missing or malformed bearer credentials.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self(PublicError::InvalidToken)
    }

    /// Malformed request input.
    #[must_use]
    pub const fn bad_request() -> Self {
        Self(PublicError::BadRequest)
    }

    /// The wrapped category.
    #[must_use]
    pub const fn public(&self) -> PublicError {
        self.0
    }

    /// HTTP status for the wrapped category.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        status_for(self.0)
    }
}

/// HTTP status for a public error category.
#[must_use]
pub const fn status_for(error: PublicError) -> StatusCode {
    match error {
        PublicError::BadRequest => StatusCode::BAD_REQUEST,
        PublicError::InvalidChallenge
        | PublicError::InvalidVerification
        | PublicError::KeyNotFound
        | PublicError::InvalidToken
        | PublicError::InvalidSecret => StatusCode::UNAUTHORIZED,
        PublicError::SessionNotFound => StatusCode::NOT_FOUND,
        PublicError::ChallengeExpired | PublicError::SessionExpired => StatusCode::GONE,
        PublicError::NoActiveKey | PublicError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let public = err.public();
        if public.is_server_fault() {
            tracing::error!(error = %err, code = public.code(), "Request failed");
        } else {
            tracing::warn!(error = %err, code = public.code(), "Request rejected");
        }
        Self(public)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Unreadable request body");
        Self::bad_request()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.0.code().to_string(),
            message: self.0.message().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::VerificationFailure;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::InvalidChallenge).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::ChallengeExpired).status(),
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidUserKey).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::SessionNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AuthError::NoActiveKey).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::DeliveryFailed("smtp".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_verification_reasons_collapse() {
        let mismatch = ApiError::from(AuthError::InvalidVerification {
            reason: VerificationFailure::TokenUserMismatch,
        });
        let missing = ApiError::from(AuthError::InvalidVerification {
            reason: VerificationFailure::TokenNotFound,
        });

        assert_eq!(mismatch, missing);
        assert_eq!(mismatch.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_body_never_contains_detail() {
        let err = ApiError::from(AuthError::KeyNotFound {
            kid: "secret-kid".to_string(),
        });

        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body.code, "KEY_NOT_FOUND");
        assert_eq!(body.message, "Unauthorized");
        assert!(!String::from_utf8_lossy(&bytes).contains("secret-kid"));
    }
}
