//! Credential state types.
//!
//! Identifiers, session rows and the grants handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Opaque numeric user identifier, owned by the external user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub uuid::Uuid);

impl DeviceId {
    /// Generate a new random `DeviceId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// Client details captured when a session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Client-supplied device id. Generated when absent.
    pub device_id: Option<DeviceId>,

    /// User agent string.
    pub user_agent: Option<String>,

    /// Client IP address.
    pub ip: Option<IpAddr>,
}

/// Durable session row.
///
/// Never holds the plaintext session secret, only its Argon2 PHC hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,

    /// Owner of the session.
    pub user_id: UserId,

    /// Argon2id hash of the session secret (PHC string format).
    pub hashed_session_secret: String,

    /// Long-lived refresh token. Lookup key for refreshes.
    pub refresh_token: String,

    /// Device the session was created from.
    pub device_id: DeviceId,

    /// User agent at creation time.
    pub user_agent: Option<String>,

    /// IP address at creation time.
    pub ip: Option<IpAddr>,

    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Absolute expiry; refreshes after this fail.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` once `now` is past the session expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Grants
// ═══════════════════════════════════════════════════════════════════════

/// A signed access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Compact JWS.
    pub token: String,

    /// Key id the token was signed with.
    pub kid: String,

    /// Expiry of the token.
    pub expires_at: DateTime<Utc>,
}

/// An issued challenge code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    /// Identity the code was issued to.
    pub user_id: UserId,

    /// The code that was sent.
    pub code: String,

    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful challenge verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeVerified {
    /// Verified user.
    pub user_id: UserId,

    /// Single-use bridging token for [`crate::session::SessionManager::create_session`].
    pub verification_token: String,
}

/// Result of session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// New session id.
    pub session_id: SessionId,

    /// Refresh token for the session.
    pub refresh_token: String,

    /// First access token.
    pub access_token: AccessToken,
}

/// Result of a session refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    /// Session owner.
    pub user_id: UserId,

    /// Newly signed access token.
    pub access_token: AccessToken,

    /// The session's refresh token, unchanged.
    pub refresh_token: String,
}
