//! Credential constants.
//!
//! This module contains constant values used throughout the credential system.

/// Default `iss` claim for access tokens.
pub const DEFAULT_ISSUER: &str = "credential-issuer";

/// Default `aud` claim for access tokens.
pub const DEFAULT_AUDIENCE: &str = "api";

/// Smallest RSA modulus the key ring will generate.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Shortest period the verification token sweeper will tick at.
pub const MIN_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);

/// Bytes of randomness in a key id (hex encoded, so twice as many characters).
pub const KID_BYTES: usize = 16;

/// JSON Web Key field values.
pub mod jwk {
    /// `kty` for RSA keys.
    pub const KEY_TYPE_RSA: &str = "RSA";

    /// `use` for signature keys.
    pub const USE_SIGNATURE: &str = "sig";
}

/// Metric names emitted by this crate.
pub mod metrics {
    /// Challenge codes issued (including resends).
    pub const CHALLENGES_ISSUED: &str = "credentials.challenges.issued";
    /// Challenge codes verified successfully.
    pub const CHALLENGES_VERIFIED: &str = "credentials.challenges.verified";
    /// Challenge verifications rejected, labelled by `reason`.
    pub const CHALLENGES_REJECTED: &str = "credentials.challenges.rejected";
    /// Verification tokens issued.
    pub const VERIFICATION_ISSUED: &str = "credentials.verification_tokens.issued";
    /// Verification tokens consumed successfully.
    pub const VERIFICATION_CONSUMED: &str = "credentials.verification_tokens.consumed";
    /// Verification token consumes rejected, labelled by `reason`.
    pub const VERIFICATION_REJECTED: &str = "credentials.verification_tokens.rejected";
    /// Verification tokens removed by the background sweep.
    pub const VERIFICATION_SWEPT: &str = "credentials.verification_tokens.swept";
    /// Sessions created.
    pub const SESSIONS_CREATED: &str = "credentials.sessions.created";
    /// Sessions refreshed.
    pub const SESSIONS_REFRESHED: &str = "credentials.sessions.refreshed";
    /// Refreshes rejected, labelled by `reason`.
    pub const SESSIONS_REJECTED: &str = "credentials.sessions.rejected";
    /// Sessions terminated.
    pub const SESSIONS_TERMINATED: &str = "credentials.sessions.terminated";
    /// Access tokens signed.
    pub const TOKENS_SIGNED: &str = "credentials.access_tokens.signed";
    /// Access tokens rejected, labelled by `reason`.
    pub const TOKENS_REJECTED: &str = "credentials.access_tokens.rejected";
    /// Signing keys generated (startup and rotation).
    pub const KEYS_GENERATED: &str = "credentials.keys.generated";
    /// Signing keys retired by cleanup.
    pub const KEYS_RETIRED: &str = "credentials.keys.retired";
}
