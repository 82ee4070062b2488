//! Server configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is read first when present.

use chrono::Duration;
use credential_issuer::config::{
    CredentialConfig, KeyRingConfig, SessionConfig, TokenConfig, VerificationConfig,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

/// Accepted range for `ACCESS_TOKEN_TTL_SECS`: one second to one day.
const ACCESS_TOKEN_TTL_SECS_RANGE: (i64, i64) = (1, 24 * 60 * 60);

/// Accepted range for `SESSION_TTL_DAYS`: one day to ten years.
const SESSION_TTL_DAYS_RANGE: (i64, i64) = (1, 10 * 365);

/// Accepted range for `SWEEP_INTERVAL_SECS`: one second to one day.
const SWEEP_INTERVAL_SECS_RANGE: (u64, u64) = (1, 24 * 60 * 60);

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public listener address (`BIND_ADDR`, default `0.0.0.0:8080`).
    pub bind_addr: SocketAddr,
    /// Admin listener address (`ADMIN_BIND_ADDR`, default `127.0.0.1:9090`).
    pub admin_bind_addr: SocketAddr,
    /// `iss` claim (`TOKEN_ISSUER`).
    pub token_issuer: String,
    /// `aud` claim (`TOKEN_AUDIENCE`).
    pub token_audience: String,
    /// Access token lifetime in seconds (`ACCESS_TOKEN_TTL_SECS`, default 900, at most a day).
    pub access_token_ttl_secs: i64,
    /// Session lifetime in days (`SESSION_TTL_DAYS`, default 30, 1 to 3650).
    pub session_ttl_days: i64,
    /// RSA modulus size (`RSA_KEY_BITS`, default 2048).
    pub rsa_key_bits: usize,
    /// Verification token sweep period in seconds (`SWEEP_INTERVAL_SECS`, default 300, at least 1).
    pub sweep_interval_secs: u64,
    /// Grace period for background tasks on shutdown (`SHUTDOWN_TIMEOUT_SECS`, default 10).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: parse_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080))),
            admin_bind_addr: parse_or("ADMIN_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 9090))),
            token_issuer: env::var("TOKEN_ISSUER")
                .unwrap_or_else(|_| credential_issuer::constants::DEFAULT_ISSUER.to_string()),
            token_audience: env::var("TOKEN_AUDIENCE")
                .unwrap_or_else(|_| credential_issuer::constants::DEFAULT_AUDIENCE.to_string()),
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", 15 * 60),
            session_ttl_days: parse_or("SESSION_TTL_DAYS", 30),
            rsa_key_bits: parse_or("RSA_KEY_BITS", 2048),
            sweep_interval_secs: parse_or("SWEEP_INTERVAL_SECS", 5 * 60),
            shutdown_timeout_secs: parse_or("SHUTDOWN_TIMEOUT_SECS", 10),
        }
    }

    /// Library configuration derived from these settings.
    ///
    /// Lifetimes and the sweep period outside their accepted range are
    /// clamped to it with a warning.
    #[must_use]
    pub fn credential_config(&self) -> CredentialConfig {
        let (min, max) = SWEEP_INTERVAL_SECS_RANGE;
        let sweep_secs = clamp("SWEEP_INTERVAL_SECS", self.sweep_interval_secs, min, max);
        let (min, max) = ACCESS_TOKEN_TTL_SECS_RANGE;
        let access_secs = clamp("ACCESS_TOKEN_TTL_SECS", self.access_token_ttl_secs, min, max);
        let (min, max) = SESSION_TTL_DAYS_RANGE;
        let session_days = clamp("SESSION_TTL_DAYS", self.session_ttl_days, min, max);

        CredentialConfig {
            verification: VerificationConfig::default()
                .with_sweep_interval(std::time::Duration::from_secs(sweep_secs)),
            keys: KeyRingConfig::default().with_key_bits(self.rsa_key_bits),
            tokens: TokenConfig::new(self.token_issuer.clone(), self.token_audience.clone())
                .with_access_token_ttl(Duration::seconds(access_secs)),
            sessions: SessionConfig::default()
                .with_session_duration(Duration::days(session_days)),
            ..CredentialConfig::default()
        }
    }

    /// Grace period for background tasks on shutdown.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parse `key` from the environment, falling back to `default` when unset
/// or unparsable.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            default
        }),
        Err(_) => default,
    }
}

/// Clamp `value` into `min..=max`, warning when it had to move.
fn clamp<T: PartialOrd + Copy + Display>(key: &str, value: T, min: T, max: T) -> T {
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        return value;
    };
    tracing::warn!(key, value = %value, using = %clamped, "Setting out of range, clamped");
    clamped
}
