//! Single-use verification tokens.
//!
//! A verification token bridges a completed challenge and session creation.
//! Tokens live only in process memory: a restart drops them and the user
//! repeats the challenge.
//!
//! Consumption is a remove-then-check under one mutex guard. Whatever the
//! outcome, a token that was found is gone afterwards, so two concurrent
//! consumes can never both succeed.

use crate::clock::Clock;
use crate::config::VerificationConfig;
use crate::constants::MIN_SWEEP_INTERVAL;
use crate::constants::metrics as metric_names;
use crate::error::{AuthError, Result, VerificationFailure};
use crate::state::UserId;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
struct VerificationEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Process-local store of outstanding verification tokens.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone)]
pub struct VerificationTokenStore {
    entries: Arc<Mutex<HashMap<String, VerificationEntry>>>,
    clock: Arc<dyn Clock>,
    config: VerificationConfig,
}

impl VerificationTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: VerificationConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            config,
        }
    }

    /// Issue a token bound to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn issue(&self, user_id: UserId) -> Result<String> {
        let mut bytes = vec![0u8; self.config.token_bytes];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(&bytes);

        let expires_at = self.clock.now() + self.config.token_ttl;
        self.entries
            .lock()
            .map_err(|_| AuthError::lock_poisoned("verification tokens"))?
            .insert(
                token.clone(),
                VerificationEntry {
                    user_id,
                    expires_at,
                },
            );

        metrics::counter!(metric_names::VERIFICATION_ISSUED).increment(1);
        tracing::debug!(user_id = %user_id, expires_at = %expires_at, "Verification token issued");

        Ok(token)
    }

    /// Consume `token` on behalf of `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidVerification`] if the token is unknown,
    /// bound to another user or expired. The entry is deleted in the last
    /// two cases as well.
    pub fn consume(&self, token: &str, expected: UserId) -> Result<()> {
        let now = self.clock.now();

        let outcome = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| AuthError::lock_poisoned("verification tokens"))?;

            match entries.remove(token) {
                None => Err(VerificationFailure::TokenNotFound),
                Some(entry) if entry.user_id != expected => {
                    Err(VerificationFailure::TokenUserMismatch)
                }
                Some(entry) if now > entry.expires_at => Err(VerificationFailure::TokenExpired),
                Some(_) => Ok(()),
            }
        };

        match outcome {
            Ok(()) => {
                metrics::counter!(metric_names::VERIFICATION_CONSUMED).increment(1);
                tracing::debug!(user_id = %expected, "Verification token consumed");
                Ok(())
            }
            Err(reason) => {
                metrics::counter!(metric_names::VERIFICATION_REJECTED, "reason" => reason.as_str())
                    .increment(1);
                tracing::warn!(user_id = %expected, reason = %reason, "Verification token rejected");
                Err(AuthError::InvalidVerification { reason })
            }
        }
    }

    /// Delete every entry whose expiry has passed. Returns how many went.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now();

        let removed = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| AuthError::lock_poisoned("verification tokens"))?;
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at >= now);
            before - entries.len()
        };

        if removed > 0 {
            metrics::counter!(metric_names::VERIFICATION_SWEPT).increment(removed as u64);
            tracing::debug!(removed, "Expired verification tokens swept");
        }

        Ok(removed)
    }

    /// Number of outstanding tokens, expired ones included until swept.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| AuthError::lock_poisoned("verification tokens"))?
            .len())
    }

    /// Returns `true` if no tokens are outstanding.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Run [`VerificationTokenStore::sweep_expired`] every sweep interval
    /// until `shutdown` fires or its sender is dropped.
    ///
    /// Periods shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let store = self.clone();
        let configured = self.config.sweep_interval;
        let period = configured.max(MIN_SWEEP_INTERVAL);
        if period != configured {
            tracing::warn!(
                configured = ?configured,
                interval = ?period,
                "Sweep interval too short, using minimum"
            );
        }

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            tracing::info!(interval = ?period, "Verification token sweeper started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = store.sweep_expired() {
                            tracing::error!(error = %e, "Verification token sweep failed");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Verification token sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for VerificationTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationTokenStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Owner of a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Start a sweeper for `store` with its own shutdown channel.
    #[must_use]
    pub fn spawn(store: &VerificationTokenStore) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = store.spawn_sweeper(shutdown_rx);

        Self { shutdown_tx, task }
    }

    /// Returns `true` once the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            tracing::warn!("Sweeper already stopped");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sweeper task failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;
    use chrono::Duration;

    fn store(clock: &MockClock) -> VerificationTokenStore {
        VerificationTokenStore::new(VerificationConfig::default(), Arc::new(clock.clone()))
    }

    #[test]
    fn test_token_is_32_bytes_base64url() {
        let store = store(&MockClock::new());
        let token = store.issue(UserId(1)).unwrap();

        assert_eq!(token.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), 32);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_consume_succeeds_once() {
        let store = store(&MockClock::new());
        let token = store.issue(UserId(7)).unwrap();

        assert!(store.consume(&token, UserId(7)).is_ok());
        assert_eq!(
            store.consume(&token, UserId(7)),
            Err(AuthError::InvalidVerification {
                reason: VerificationFailure::TokenNotFound
            })
        );
    }

    #[test]
    fn test_user_mismatch_deletes_entry() {
        let store = store(&MockClock::new());
        let token = store.issue(UserId(7)).unwrap();

        assert_eq!(
            store.consume(&token, UserId(8)),
            Err(AuthError::InvalidVerification {
                reason: VerificationFailure::TokenUserMismatch
            })
        );
        assert_eq!(
            store.consume(&token, UserId(7)),
            Err(AuthError::InvalidVerification {
                reason: VerificationFailure::TokenNotFound
            })
        );
    }

    #[test]
    fn test_expired_token_rejected_and_deleted() {
        let clock = MockClock::new();
        let store = store(&clock);
        let token = store.issue(UserId(7)).unwrap();

        clock.advance(Duration::minutes(15) + Duration::seconds(1));

        assert_eq!(
            store.consume(&token, UserId(7)),
            Err(AuthError::InvalidVerification {
                reason: VerificationFailure::TokenExpired
            })
        );
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let clock = MockClock::new();
        let store = store(&clock);
        store.issue(UserId(1)).unwrap();
        clock.advance(Duration::minutes(10));
        let fresh = store.issue(UserId(2)).unwrap();
        clock.advance(Duration::minutes(6));

        assert_eq!(store.sweep_expired().unwrap(), 1);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.consume(&fresh, UserId(2)).is_ok());
    }

    #[test]
    fn test_sweep_keeps_token_at_exact_expiry() {
        let clock = MockClock::new();
        let store = store(&clock);
        store.issue(UserId(1)).unwrap();

        clock.advance(Duration::minutes(15));

        assert_eq!(store.sweep_expired().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_consumes_yield_exactly_one_success() {
        let store = store(&MockClock::new());
        let token = store.issue(UserId(7)).unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let token = token.clone();
                tokio::spawn(async move { store.consume(&token, UserId(7)).is_ok() })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_sweeper_runs_and_stops() {
        let clock = MockClock::new();
        let config = VerificationConfig::default()
            .with_sweep_interval(std::time::Duration::from_millis(20));
        let store = VerificationTokenStore::new(config, Arc::new(clock.clone()));
        store.issue(UserId(1)).unwrap();
        clock.advance(Duration::hours(1));

        let handle = SweeperHandle::spawn(&store);
        for _ in 0..50 {
            if store.is_empty().unwrap() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert!(store.is_empty().unwrap());
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweeper_with_zero_interval_still_sweeps() {
        let clock = MockClock::new();
        let config = VerificationConfig::default().with_sweep_interval(std::time::Duration::ZERO);
        let store = VerificationTokenStore::new(config, Arc::new(clock.clone()));
        store.issue(UserId(1)).unwrap();
        clock.advance(Duration::hours(1));

        let handle = SweeperHandle::spawn(&store);
        for _ in 0..50 {
            if store.is_empty().unwrap() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert!(store.is_empty().unwrap());
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }
}
