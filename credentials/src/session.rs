//! Session lifecycle.
//!
//! ```text
//! create_session(user, secret, verification_token, device)
//!   1. consume verification token   ── fail ─► InvalidVerification
//!   2. Argon2id(secret)               (blocking pool)
//!   3. random refresh token, expires = now + session_duration
//!   4. persist row
//!   5. sign access token              ── fail ─► row deleted, error returned
//!
//! refresh(refresh_token, secret)
//!   no row ─► SessionNotFound
//!   expired ─► SessionExpired
//!   hash mismatch ─► InvalidSecret
//!   otherwise new access token, same refresh token
//! ```
//!
//! Refresh tokens are not rotated on refresh. A leaked refresh token stays
//! usable (together with the secret) until the session expires or is
//! terminated.

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::constants::metrics as metric_names;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::secret::{hash_secret, verify_secret};
use crate::state::{DeviceInfo, RefreshGrant, Session, SessionGrant, SessionId, UserId};
use crate::task::run_blocking;
use crate::token::TokenIssuer;
use crate::verification::VerificationTokenStore;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;

/// Creates, refreshes and terminates sessions.
pub struct SessionManager<S> {
    store: Arc<S>,
    verification: VerificationTokenStore,
    tokens: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl<S: SessionStore> SessionManager<S> {
    /// Create a session manager.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        verification: VerificationTokenStore,
        tokens: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            verification,
            tokens,
            clock,
            config,
        }
    }

    /// Turn a verification token and a chosen secret into a session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidVerification`] if the token cannot be consumed
    ///   for `user_id`
    /// - [`AuthError::NoActiveKey`] if no access token can be signed; the
    ///   row is removed again
    /// - Hashing and storage errors
    pub async fn create_session(
        &self,
        user_id: UserId,
        session_secret: &str,
        verification_token: &str,
        device: DeviceInfo,
    ) -> Result<SessionGrant> {
        self.verification.consume(verification_token, user_id)?;

        let secret = session_secret.to_string();
        let hashed_session_secret = run_blocking("secret hashing", move || hash_secret(&secret)).await?;

        let now = self.clock.now();
        let session = Session {
            id: SessionId::new(),
            user_id,
            hashed_session_secret,
            refresh_token: self.generate_refresh_token(),
            device_id: device.device_id.unwrap_or_default(),
            user_agent: device.user_agent,
            ip: device.ip,
            created_at: now,
            expires_at: now + self.config.session_duration,
        };
        self.store.create(&session).await?;

        let access_token = match self.tokens.sign(user_id) {
            Ok(access_token) => access_token,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_by_refresh_token(&session.refresh_token).await {
                    tracing::error!(
                        session_id = %session.id,
                        error = %cleanup,
                        "Failed to remove session after signing failure"
                    );
                }
                return Err(e);
            }
        };

        metrics::counter!(metric_names::SESSIONS_CREATED).increment(1);
        tracing::info!(
            user_id = %user_id,
            session_id = %session.id,
            expires_at = %session.expires_at,
            "Session created"
        );

        Ok(SessionGrant {
            session_id: session.id,
            refresh_token: session.refresh_token,
            access_token,
        })
    }

    /// Issue a new access token for the session holding `refresh_token`.
    ///
    /// No token is issued on any failure.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SessionNotFound`] if no session holds the token
    /// - [`AuthError::SessionExpired`] if the session is past its expiry
    /// - [`AuthError::InvalidSecret`] if the secret does not match
    pub async fn refresh(&self, refresh_token: &str, session_secret: &str) -> Result<RefreshGrant> {
        let Some(session) = self.store.find_by_refresh_token(refresh_token).await? else {
            Self::reject(None, "not_found");
            return Err(AuthError::SessionNotFound);
        };

        if session.is_expired_at(self.clock.now()) {
            Self::reject(Some(session.user_id), "expired");
            return Err(AuthError::SessionExpired);
        }

        let secret = session_secret.to_string();
        let hash = session.hashed_session_secret.clone();
        let matches = run_blocking("secret verification", move || verify_secret(&secret, &hash)).await?;
        if !matches {
            Self::reject(Some(session.user_id), "invalid_secret");
            return Err(AuthError::InvalidSecret);
        }

        let access_token = self.tokens.sign(session.user_id)?;

        metrics::counter!(metric_names::SESSIONS_REFRESHED).increment(1);
        tracing::debug!(user_id = %session.user_id, session_id = %session.id, "Session refreshed");

        Ok(RefreshGrant {
            user_id: session.user_id,
            access_token,
            refresh_token: session.refresh_token,
        })
    }

    /// Delete the session holding `refresh_token`. Unknown tokens are not an
    /// error.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn terminate(&self, refresh_token: &str) -> Result<()> {
        if self.store.delete_by_refresh_token(refresh_token).await? {
            metrics::counter!(metric_names::SESSIONS_TERMINATED).increment(1);
            tracing::info!("Session terminated");
        } else {
            tracing::debug!("Terminate for unknown session ignored");
        }
        Ok(())
    }

    /// Delete every session owned by `user_id`. Returns how many went.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn terminate_user_sessions(&self, user_id: UserId) -> Result<usize> {
        let removed = self.store.delete_user_sessions(user_id).await?;

        metrics::counter!(metric_names::SESSIONS_TERMINATED).increment(removed as u64);
        tracing::info!(user_id = %user_id, removed, "All user sessions terminated");

        Ok(removed)
    }

    fn generate_refresh_token(&self) -> String {
        let mut bytes = vec![0u8; self.config.refresh_token_bytes];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn reject(user_id: Option<UserId>, reason: &'static str) {
        metrics::counter!(metric_names::SESSIONS_REJECTED, "reason" => reason).increment(1);
        match user_id {
            Some(user_id) => tracing::warn!(user_id = %user_id, reason, "Session refresh rejected"),
            None => tracing::warn!(reason, "Session refresh rejected"),
        }
    }
}

impl<S> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
