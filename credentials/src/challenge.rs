//! One-time code challenges.
//!
//! # Flow
//!
//! ```text
//! issue(user_key)          verify(user_key, code)
//!   │                        │
//!   ├─ generate code         ├─ no pending code ──────► InvalidChallenge
//!   ├─ store + expiry        ├─ now > expires_at ─────► ChallengeExpired (code cleared)
//!   └─ send via notifier     ├─ code mismatch ────────► InvalidChallenge (code kept)
//!                            └─ complete_challenge
//!                                 ├─ lost the race ───► InvalidChallenge
//!                                 └─ Ok(user_id)
//! ```
//!
//! A mismatch leaves the pending code in place so a typo does not force a
//! resend. Brute force is bounded by the code lifetime and by whatever rate
//! limiting the caller puts in front of this store.

use crate::clock::Clock;
use crate::config::ChallengeConfig;
use crate::constants::metrics as metric_names;
use crate::error::{AuthError, Result};
use crate::providers::{CodeNotifier, UserRepository};
use crate::state::{IssuedChallenge, UserId};
use crate::utils::normalize_user_key;
use constant_time_eq::constant_time_eq;
use rand::Rng;
use rand::rngs::OsRng;
use std::sync::Arc;

/// Longest code [`RandomCodeGenerator`] produces; `10^18` still fits a `u64`.
const MAX_CODE_DIGITS: u32 = 18;

/// Source of one-time codes.
pub trait CodeGenerator: Send + Sync {
    /// Produce a code of `digits` decimal digits.
    fn generate(&self, digits: u32) -> String;
}

/// Uniform random numeric codes from the OS RNG. Leading zeros are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, digits: u32) -> String {
        let digits = digits.clamp(1, MAX_CODE_DIGITS);
        let value = OsRng.gen_range(0..10u64.pow(digits));
        format!("{value:0width$}", width = digits as usize)
    }
}

/// Issues and checks one-time codes.
pub struct ChallengeStore<U, N> {
    users: Arc<U>,
    notifier: Arc<N>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    config: ChallengeConfig,
}

impl<U: UserRepository, N: CodeNotifier> ChallengeStore<U, N> {
    /// Create a challenge store.
    #[must_use]
    pub fn new(
        users: Arc<U>,
        notifier: Arc<N>,
        generator: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
        config: ChallengeConfig,
    ) -> Self {
        Self {
            users,
            notifier,
            generator,
            clock,
            config,
        }
    }

    /// Issue a code for `user_key`, replacing any pending one, and send it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidUserKey`] if the key is neither email nor phone
    /// - [`AuthError::DeliveryFailed`] if the notifier fails
    /// - Storage errors from the user repository
    pub async fn issue(&self, user_key: &str) -> Result<IssuedChallenge> {
        let user_key = normalize_user_key(user_key).ok_or(AuthError::InvalidUserKey)?;

        let code = self.generator.generate(self.config.code_digits);
        let expires_at = self.clock.now() + self.config.code_ttl;

        let user_id = self
            .users
            .store_challenge(&user_key, &code, expires_at)
            .await?;
        self.notifier
            .send_code(&user_key, &code, expires_at)
            .await?;

        metrics::counter!(metric_names::CHALLENGES_ISSUED).increment(1);
        tracing::debug!(user_id = %user_id, expires_at = %expires_at, "Challenge issued");

        Ok(IssuedChallenge {
            user_id,
            code,
            expires_at,
        })
    }

    /// Issue a fresh code regardless of any earlier verification.
    ///
    /// # Errors
    ///
    /// Same as [`ChallengeStore::issue`].
    pub async fn reissue(&self, user_key: &str) -> Result<IssuedChallenge> {
        tracing::debug!("Challenge resend requested");
        self.issue(user_key).await
    }

    /// Check `code` against the pending code for `user_key`.
    ///
    /// On success the code is cleared and the identity marked verified in a
    /// single conditional update, so a code verifies at most once. A wrong
    /// guess burns the code as well; the user has to request a new one.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidUserKey`] if the key is neither email nor phone
    /// - [`AuthError::InvalidChallenge`] if there is no pending code or it
    ///   does not match (it is cleared)
    /// - [`AuthError::ChallengeExpired`] if the code expired (it is cleared)
    pub async fn verify(&self, user_key: &str, code: &str) -> Result<UserId> {
        let user_key = normalize_user_key(user_key).ok_or(AuthError::InvalidUserKey)?;

        let Some(pending) = self.users.pending_challenge(&user_key).await? else {
            Self::reject(&user_key, "no_pending");
            return Err(AuthError::InvalidChallenge);
        };

        if self.clock.now() > pending.expires_at {
            self.users.clear_challenge(&user_key, &pending.code).await?;
            Self::reject(&user_key, "expired");
            return Err(AuthError::ChallengeExpired);
        }

        if !constant_time_eq(pending.code.as_bytes(), code.as_bytes()) {
            self.users.clear_challenge(&user_key, &pending.code).await?;
            Self::reject(&user_key, "mismatch");
            return Err(AuthError::InvalidChallenge);
        }

        let Some(user_id) = self.users.complete_challenge(&user_key, code).await? else {
            Self::reject(&user_key, "already_consumed");
            return Err(AuthError::InvalidChallenge);
        };

        metrics::counter!(metric_names::CHALLENGES_VERIFIED).increment(1);
        tracing::debug!(user_id = %user_id, "Challenge verified");

        Ok(user_id)
    }

    fn reject(user_key: &str, reason: &'static str) {
        metrics::counter!(metric_names::CHALLENGES_REJECTED, "reason" => reason).increment(1);
        tracing::warn!(user_key = %user_key, reason, "Challenge rejected");
    }
}
