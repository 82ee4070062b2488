//! Credential service facade.
//!
//! Owns one instance of every component and wires them to the injected
//! collaborators. This is the type applications and the HTTP handlers hold,
//! usually behind an `Arc`.

use crate::challenge::{ChallengeStore, CodeGenerator, RandomCodeGenerator};
use crate::clock::{Clock, SystemClock};
use crate::config::CredentialConfig;
use crate::error::Result;
use crate::keys::KeyRing;
use crate::keys::jwks::Jwks;
use crate::providers::{CodeNotifier, SessionStore, UserRecord, UserRepository};
use crate::session::SessionManager;
use crate::state::{ChallengeVerified, DeviceInfo, RefreshGrant, SessionGrant, UserId};
use crate::task::run_blocking;
use crate::token::TokenIssuer;
use crate::verification::{SweeperHandle, VerificationTokenStore};
use std::sync::Arc;

/// Builder for [`CredentialService`].
pub struct CredentialServiceBuilder<U, N, S> {
    users: Arc<U>,
    notifier: Arc<N>,
    sessions: Arc<S>,
    config: CredentialConfig,
    clock: Arc<dyn Clock>,
    code_generator: Arc<dyn CodeGenerator>,
}

impl<U, N, S> CredentialServiceBuilder<U, N, S>
where
    U: UserRepository,
    N: CodeNotifier,
    S: SessionStore,
{
    /// Replace the default configuration.
    #[must_use]
    pub fn with_config(mut self, config: CredentialConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the random code generator.
    #[must_use]
    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.code_generator = generator;
        self
    }

    /// Build the service. Generates the first signing key, which takes a
    /// noticeable amount of CPU time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyGeneration`](crate::AuthError::KeyGeneration)
    /// if the key ring configuration is rejected or key generation fails.
    pub fn build(self) -> Result<CredentialService<U, N, S>> {
        let config = self.config;
        let clock = self.clock;

        let keys = Arc::new(KeyRing::new(config.keys.clone(), clock.clone())?);
        let tokens = Arc::new(TokenIssuer::new(
            keys.clone(),
            clock.clone(),
            config.tokens.clone(),
        ));
        let verification = VerificationTokenStore::new(config.verification.clone(), clock.clone());
        let challenges = ChallengeStore::new(
            self.users.clone(),
            self.notifier,
            self.code_generator,
            clock.clone(),
            config.challenge.clone(),
        );
        let sessions = SessionManager::new(
            self.sessions,
            verification.clone(),
            tokens.clone(),
            clock,
            config.sessions.clone(),
        );

        tracing::info!(
            issuer = %config.tokens.issuer,
            audience = %config.tokens.audience,
            key_bits = config.keys.key_bits,
            "Credential service ready"
        );

        Ok(CredentialService {
            config,
            users: self.users,
            keys,
            tokens,
            challenges,
            verification,
            sessions,
        })
    }
}

/// Entry point for every credential operation.
pub struct CredentialService<U, N, S> {
    config: CredentialConfig,
    users: Arc<U>,
    keys: Arc<KeyRing>,
    tokens: Arc<TokenIssuer>,
    challenges: ChallengeStore<U, N>,
    verification: VerificationTokenStore,
    sessions: SessionManager<S>,
}

impl<U, N, S> CredentialService<U, N, S>
where
    U: UserRepository,
    N: CodeNotifier,
    S: SessionStore,
{
    /// Start building a service over the given collaborators.
    #[must_use]
    pub fn builder(users: Arc<U>, notifier: Arc<N>, sessions: Arc<S>) -> CredentialServiceBuilder<U, N, S> {
        CredentialServiceBuilder {
            users,
            notifier,
            sessions,
            config: CredentialConfig::default(),
            clock: Arc::new(SystemClock),
            code_generator: Arc::new(RandomCodeGenerator),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Challenge
    // ═══════════════════════════════════════════════════════════════════

    /// Send a one-time code to `user_key`.
    ///
    /// # Errors
    ///
    /// See [`ChallengeStore::issue`].
    #[tracing::instrument(skip_all, name = "issue_challenge")]
    pub async fn issue_challenge(&self, user_key: &str) -> Result<()> {
        self.challenges.issue(user_key).await.map(|_| ())
    }

    /// Send a fresh code to `user_key`.
    ///
    /// # Errors
    ///
    /// See [`ChallengeStore::reissue`].
    #[tracing::instrument(skip_all, name = "resend_challenge")]
    pub async fn resend_challenge(&self, user_key: &str) -> Result<()> {
        self.challenges.reissue(user_key).await.map(|_| ())
    }

    /// Verify a code and hand out a single-use verification token.
    ///
    /// # Errors
    ///
    /// See [`ChallengeStore::verify`].
    #[tracing::instrument(skip_all, name = "verify_challenge")]
    pub async fn verify_challenge(&self, user_key: &str, code: &str) -> Result<ChallengeVerified> {
        let user_id = self.challenges.verify(user_key, code).await?;
        let verification_token = self.verification.issue(user_id)?;

        Ok(ChallengeVerified {
            user_id,
            verification_token,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Sessions
    // ═══════════════════════════════════════════════════════════════════

    /// Create a session from a verification token.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::create_session`].
    #[tracing::instrument(skip_all, name = "create_session", fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: UserId,
        session_secret: &str,
        verification_token: &str,
        device: DeviceInfo,
    ) -> Result<SessionGrant> {
        self.sessions
            .create_session(user_id, session_secret, verification_token, device)
            .await
    }

    /// Get a new access token for an existing session.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::refresh`].
    #[tracing::instrument(skip_all, name = "refresh_session")]
    pub async fn refresh_session(&self, refresh_token: &str, session_secret: &str) -> Result<RefreshGrant> {
        self.sessions.refresh(refresh_token, session_secret).await
    }

    /// End the session holding `refresh_token`.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::terminate`].
    #[tracing::instrument(skip_all, name = "terminate_session")]
    pub async fn terminate_session(&self, refresh_token: &str) -> Result<()> {
        self.sessions.terminate(refresh_token).await
    }

    /// End every session of `user_id`.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::terminate_user_sessions`].
    #[tracing::instrument(skip_all, name = "terminate_user_sessions", fields(user_id = %user_id))]
    pub async fn terminate_user_sessions(&self, user_id: UserId) -> Result<usize> {
        self.sessions.terminate_user_sessions(user_id).await
    }

    // ═══════════════════════════════════════════════════════════════════
    // Keys and access tokens
    // ═══════════════════════════════════════════════════════════════════

    /// Rotate the signing key on the blocking pool. Returns the new kid.
    ///
    /// # Errors
    ///
    /// See [`KeyRing::rotate`].
    #[tracing::instrument(skip(self))]
    pub async fn rotate_keys(&self) -> Result<String> {
        let keys = self.keys.clone();
        run_blocking("key rotation", move || keys.rotate()).await
    }

    /// Retire non-current keys older than `max_age_days`.
    ///
    /// # Errors
    ///
    /// See [`KeyRing::cleanup`].
    #[tracing::instrument(skip(self))]
    pub fn cleanup_keys(&self, max_age_days: u32) -> Result<Vec<String>> {
        self.keys.cleanup(max_age_days)
    }

    /// Current JWKS document.
    ///
    /// # Errors
    ///
    /// See [`KeyRing::export_jwks`].
    pub fn jwks(&self) -> Result<Jwks> {
        self.keys.export_jwks()
    }

    /// Verify a raw access token and return its subject.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::verify`].
    pub fn authenticate(&self, access_token: &str) -> Result<UserId> {
        self.tokens.verify(access_token)
    }

    /// Look up the user behind an authenticated id.
    ///
    /// # Errors
    ///
    /// Storage errors from the user repository.
    pub async fn find_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        self.users.find_user(user_id).await
    }

    // ═══════════════════════════════════════════════════════════════════
    // Background work and accessors
    // ═══════════════════════════════════════════════════════════════════

    /// Start the verification token sweeper.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        SweeperHandle::spawn(&self.verification)
    }

    /// Service configuration.
    #[must_use]
    pub const fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Signing key ring.
    #[must_use]
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Access token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Verification token store.
    #[must_use]
    pub const fn verification(&self) -> &VerificationTokenStore {
        &self.verification
    }
}

impl<U, N, S> std::fmt::Debug for CredentialService<U, N, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
