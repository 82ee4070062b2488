//! Credential configuration.
//!
//! One configuration struct per component, aggregated in
//! [`CredentialConfig`]. Values are supplied by the application. The
//! defaults match the lifetimes the flow was designed around.

use chrono::Duration;
use jsonwebtoken::Algorithm;

/// One-time code challenge configuration.
#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    /// How long an issued code stays valid.
    ///
    /// Default: 10 minutes
    pub code_ttl: Duration,

    /// Number of decimal digits in a code (leading zeros allowed).
    ///
    /// Default: 6
    pub code_digits: u32,
}

impl ChallengeConfig {
    /// Create a challenge configuration with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
            code_digits: 6,
        }
    }

    /// Set code time-to-live.
    #[must_use]
    pub const fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    /// Set code length in digits.
    #[must_use]
    pub const fn with_code_digits(mut self, digits: u32) -> Self {
        self.code_digits = digits;
        self
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Verification (bridging) token configuration.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long a verification token stays consumable.
    ///
    /// Default: 15 minutes
    pub token_ttl: Duration,

    /// Random bytes per token before encoding.
    ///
    /// Default: 32
    pub token_bytes: usize,

    /// Period of the background sweep that drops expired tokens.
    ///
    /// Default: 5 minutes
    pub sweep_interval: std::time::Duration,
}

impl VerificationConfig {
    /// Create a verification token configuration with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            token_ttl: Duration::minutes(15),
            token_bytes: 32,
            sweep_interval: std::time::Duration::from_secs(5 * 60),
        }
    }

    /// Set token time-to-live.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set sweep period.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Signing key ring configuration.
#[derive(Debug, Clone)]
pub struct KeyRingConfig {
    /// RSA modulus size for generated keys. Values below 2048 are rejected.
    ///
    /// Default: 2048
    pub key_bits: usize,

    /// JWS algorithm advertised in the JWKS and used for signing.
    ///
    /// Default: `RS256`
    pub algorithm: Algorithm,
}

impl KeyRingConfig {
    /// Create a key ring configuration with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key_bits: 2048,
            algorithm: Algorithm::RS256,
        }
    }

    /// Set RSA modulus size.
    #[must_use]
    pub const fn with_key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }
}

impl Default for KeyRingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Access token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// `iss` claim written and required.
    pub issuer: String,

    /// `aud` claim written and required.
    pub audience: String,

    /// Access token lifetime.
    ///
    /// Default: 15 minutes
    pub access_token_ttl: Duration,
}

impl TokenConfig {
    /// Create access token configuration.
    ///
    /// # Arguments
    ///
    /// * `issuer` - Issuer identifier (e.g., `https://auth.example.com`)
    /// * `audience` - Audience the tokens are minted for (e.g., `api`)
    #[must_use]
    pub const fn new(issuer: String, audience: String) -> Self {
        Self {
            issuer,
            audience,
            access_token_ttl: Duration::minutes(15),
        }
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_ISSUER.to_string(),
            crate::constants::DEFAULT_AUDIENCE.to_string(),
        )
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Absolute session lifetime.
    ///
    /// Default: 30 days
    pub session_duration: Duration,

    /// Random bytes per refresh token before encoding.
    ///
    /// Default: 32
    pub refresh_token_bytes: usize,
}

impl SessionConfig {
    /// Create a session configuration with the default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_duration: Duration::days(30),
            refresh_token_bytes: 32,
        }
    }

    /// Set session duration.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the whole credential service.
#[derive(Debug, Clone, Default)]
pub struct CredentialConfig {
    /// Challenge codes.
    pub challenge: ChallengeConfig,
    /// Verification tokens.
    pub verification: VerificationConfig,
    /// Signing keys.
    pub keys: KeyRingConfig,
    /// Access tokens.
    pub tokens: TokenConfig,
    /// Sessions.
    pub sessions: SessionConfig,
}
