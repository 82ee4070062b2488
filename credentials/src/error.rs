//! Error types for credential operations.
//!
//! [`AuthError`] carries the full internal cause of a failure and is what
//! every operation returns. It is meant for logs. Anything leaving the
//! process (HTTP responses, RPC replies) should go through
//! [`AuthError::public`], which collapses the detail into the coarse
//! [`PublicError`] taxonomy so callers cannot use responses as an oracle for
//! enumeration or brute force.

use thiserror::Error;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a verification token was rejected.
///
/// Only ever logged. Externally every variant is reported as
/// [`PublicError::InvalidVerification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    /// No live token with this value.
    TokenNotFound,

    /// The token is bound to a different user.
    TokenUserMismatch,

    /// The token exists but its expiry has passed.
    TokenExpired,
}

impl VerificationFailure {
    /// Short machine-readable label, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TokenNotFound => "not_found",
            Self::TokenUserMismatch => "user_mismatch",
            Self::TokenExpired => "expired",
        }
    }
}

impl std::fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detailed error taxonomy for credential issuance and verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Challenge Errors
    // ═══════════════════════════════════════════════════════════

    /// No pending code for this identity, or the code did not match.
    #[error("Invalid challenge code")]
    InvalidChallenge,

    /// The pending code expired. It has been cleared and must be reissued.
    #[error("Challenge code has expired")]
    ChallengeExpired,

    /// The user key is neither an email address nor a phone number.
    #[error("Invalid user key")]
    InvalidUserKey,

    // ═══════════════════════════════════════════════════════════
    // Verification Token Errors
    // ═══════════════════════════════════════════════════════════

    /// The verification token could not be consumed.
    #[error("Invalid verification token ({reason})")]
    InvalidVerification {
        /// Internal cause.
        reason: VerificationFailure,
    },

    // ═══════════════════════════════════════════════════════════
    // Signing Key / Access Token Errors
    // ═══════════════════════════════════════════════════════════

    /// The key ring has no current signing key.
    #[error("No active signing key")]
    NoActiveKey,

    /// The token references a key that is unknown or has been retired.
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key id taken from the token header.
        kid: String,
    },

    /// Signature, claims or format check failed.
    #[error("Invalid access token: {reason}")]
    InvalidToken {
        /// Which check failed.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// No session matches the refresh token.
    #[error("Session not found")]
    SessionNotFound,

    /// The session is past its expiry.
    #[error("Session has expired")]
    SessionExpired,

    /// The session secret does not match the stored hash.
    #[error("Invalid session secret")]
    InvalidSecret,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Key pair generation or encoding failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Session secret hashing failed.
    #[error("Secret hashing failed: {0}")]
    Hashing(String),

    /// A storage collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The code could not be handed to the delivery collaborator.
    #[error("Code delivery failed: {0}")]
    DeliveryFailed(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse error category safe to return to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicError {
    /// Wrong or missing challenge code.
    InvalidChallenge,
    /// Challenge code expired.
    ChallengeExpired,
    /// Malformed request input.
    BadRequest,
    /// Verification token rejected, cause withheld.
    InvalidVerification,
    /// No signing key is available.
    NoActiveKey,
    /// Token signed by an unknown or retired key.
    KeyNotFound,
    /// Token rejected, cause withheld.
    InvalidToken,
    /// Session not found.
    SessionNotFound,
    /// Session expired.
    SessionExpired,
    /// Session secret rejected.
    InvalidSecret,
    /// Any infrastructure failure.
    Internal,
}

impl PublicError {
    /// Stable machine-readable code for this category.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidChallenge => "INVALID_CHALLENGE",
            Self::ChallengeExpired => "CHALLENGE_EXPIRED",
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidVerification => "INVALID_VERIFICATION",
            Self::NoActiveKey => "NO_ACTIVE_KEY",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::InvalidSecret => "INVALID_SECRET",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// User-facing message for this category.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidChallenge => "Invalid code",
            Self::ChallengeExpired => "Code has expired, request a new one",
            Self::BadRequest => "Invalid request",
            Self::InvalidVerification => "Verification failed",
            Self::KeyNotFound | Self::InvalidToken => "Unauthorized",
            Self::SessionNotFound => "Session not found",
            Self::SessionExpired => "Session has expired",
            Self::InvalidSecret => "Invalid session secret",
            Self::NoActiveKey | Self::Internal => "Internal error",
        }
    }

    /// Returns `true` when the failure is on the server side (5xx).
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(self, Self::NoActiveKey | Self::Internal)
    }
}

impl AuthError {
    /// Collapse this error into the category that may leave the process.
    ///
    /// # Examples
    ///
    /// ```
    /// # use credential_issuer::error::{AuthError, PublicError, VerificationFailure};
    /// let err = AuthError::InvalidVerification {
    ///     reason: VerificationFailure::TokenUserMismatch,
    /// };
    /// assert_eq!(err.public(), PublicError::InvalidVerification);
    /// ```
    #[must_use]
    pub const fn public(&self) -> PublicError {
        match self {
            Self::InvalidChallenge => PublicError::InvalidChallenge,
            Self::ChallengeExpired => PublicError::ChallengeExpired,
            Self::InvalidUserKey => PublicError::BadRequest,
            Self::InvalidVerification { .. } => PublicError::InvalidVerification,
            Self::NoActiveKey => PublicError::NoActiveKey,
            Self::KeyNotFound { .. } => PublicError::KeyNotFound,
            Self::InvalidToken { .. } => PublicError::InvalidToken,
            Self::SessionNotFound => PublicError::SessionNotFound,
            Self::SessionExpired => PublicError::SessionExpired,
            Self::InvalidSecret => PublicError::InvalidSecret,
            Self::KeyGeneration(_)
            | Self::Hashing(_)
            | Self::Storage(_)
            | Self::DeliveryFailed(_)
            | Self::InternalError(_) => PublicError::Internal,
        }
    }

    /// Returns `true` if this error should surface as a server-side fault.
    ///
    /// # Examples
    ///
    /// ```
    /// # use credential_issuer::AuthError;
    /// assert!(AuthError::NoActiveKey.is_server_fault());
    /// assert!(!AuthError::InvalidSecret.is_server_fault());
    /// ```
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        self.public().is_server_fault()
    }

    /// Shorthand for [`AuthError::InvalidToken`].
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Lock poisoning is reported as an internal error.
    pub(crate) fn lock_poisoned(what: &str) -> Self {
        Self::InternalError(format!("{what} lock poisoned"))
    }
}
