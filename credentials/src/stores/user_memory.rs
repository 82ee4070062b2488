//! In-memory user repository.

use crate::error::{AuthError, Result};
use crate::providers::{PendingChallenge, UserRecord, UserRepository};
use crate::state::UserId;
use crate::utils::normalize_user_key;
use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct UserEntry {
    id: UserId,
    verified: bool,
    pending: Option<(String, DateTime<Utc>)>,
}

#[derive(Debug, Default)]
struct UserTable {
    last_id: i64,
    by_key: HashMap<String, UserEntry>,
}

impl UserTable {
    fn allocate_id(&mut self) -> UserId {
        self.last_id += 1;
        UserId(self.last_id)
    }
}

/// User repository backed by a `HashMap` keyed by normalized user key.
///
/// Ids are allocated sequentially from 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<Mutex<UserTable>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing user under a fixed id.
    ///
    /// Later allocations continue after the highest id seen.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUserKey`] if `user_key` is not an email
    /// address or phone number.
    pub fn insert_user(&self, user_key: &str, user_id: UserId) -> Result<()> {
        let user_key = normalize_user_key(user_key).ok_or(AuthError::InvalidUserKey)?;
        let mut table = self.lock()?;

        table.last_id = table.last_id.max(user_id.0);
        table.by_key.insert(
            user_key,
            UserEntry {
                id: user_id,
                verified: false,
                pending: None,
            },
        );
        Ok(())
    }

    /// Number of known identities.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn user_count(&self) -> Result<usize> {
        Ok(self.lock()?.by_key.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UserTable>> {
        self.table
            .lock()
            .map_err(|_| AuthError::lock_poisoned("user table"))
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn store_challenge(
        &self,
        user_key: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<UserId> {
        let mut table = self.lock()?;

        if let Some(entry) = table.by_key.get_mut(user_key) {
            entry.pending = Some((code.to_string(), expires_at));
            return Ok(entry.id);
        }

        let id = table.allocate_id();
        table.by_key.insert(
            user_key.to_string(),
            UserEntry {
                id,
                verified: false,
                pending: Some((code.to_string(), expires_at)),
            },
        );
        Ok(id)
    }

    async fn pending_challenge(&self, user_key: &str) -> Result<Option<PendingChallenge>> {
        let table = self.lock()?;

        Ok(table.by_key.get(user_key).and_then(|entry| {
            entry
                .pending
                .as_ref()
                .map(|(code, expires_at)| PendingChallenge {
                    user_id: entry.id,
                    code: code.clone(),
                    expires_at: *expires_at,
                })
        }))
    }

    async fn clear_challenge(&self, user_key: &str, code: &str) -> Result<bool> {
        let mut table = self.lock()?;

        let Some(entry) = table.by_key.get_mut(user_key) else {
            return Ok(false);
        };
        let matches = entry
            .pending
            .as_ref()
            .is_some_and(|(stored, _)| constant_time_eq(stored.as_bytes(), code.as_bytes()));
        if matches {
            entry.pending = None;
        }
        Ok(matches)
    }

    async fn complete_challenge(&self, user_key: &str, code: &str) -> Result<Option<UserId>> {
        let mut table = self.lock()?;

        let Some(entry) = table.by_key.get_mut(user_key) else {
            return Ok(None);
        };
        let matches = entry
            .pending
            .as_ref()
            .is_some_and(|(stored, _)| constant_time_eq(stored.as_bytes(), code.as_bytes()));
        if !matches {
            return Ok(None);
        }

        entry.pending = None;
        entry.verified = true;
        Ok(Some(entry.id))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        let table = self.lock()?;

        Ok(table
            .by_key
            .iter()
            .find(|(_, entry)| entry.id == user_id)
            .map(|(user_key, entry)| UserRecord {
                id: entry.id,
                user_key: user_key.clone(),
                verified: entry.verified,
            }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_store_challenge_upserts_identity() {
        let users = InMemoryUserRepository::new();
        let expires_at = Utc::now() + Duration::minutes(10);

        let first = users
            .store_challenge("user@example.com", "111111", expires_at)
            .await
            .unwrap();
        let second = users
            .store_challenge("user@example.com", "222222", expires_at)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(users.user_count().unwrap(), 1);

        let pending = users.pending_challenge("user@example.com").await.unwrap().unwrap();
        assert_eq!(pending.code, "222222");
    }

    #[tokio::test]
    async fn test_inserted_user_keeps_its_id() {
        let users = InMemoryUserRepository::new();
        users.insert_user("user@example.com", UserId(7)).unwrap();

        let id = users
            .store_challenge("user@example.com", "482193", Utc::now())
            .await
            .unwrap();
        let other = users
            .store_challenge("other@example.com", "482193", Utc::now())
            .await
            .unwrap();

        assert_eq!(id, UserId(7));
        assert_eq!(other, UserId(8));
    }

    #[tokio::test]
    async fn test_complete_challenge_is_conditional() {
        let users = InMemoryUserRepository::new();
        let id = users
            .store_challenge("user@example.com", "123456", Utc::now())
            .await
            .unwrap();

        assert_eq!(
            users.complete_challenge("user@example.com", "654321").await.unwrap(),
            None
        );
        assert_eq!(
            users.complete_challenge("user@example.com", "123456").await.unwrap(),
            Some(id)
        );
        assert_eq!(
            users.complete_challenge("user@example.com", "123456").await.unwrap(),
            None
        );

        let record = users.find_user(id).await.unwrap().unwrap();
        assert!(record.verified);
        assert!(users.pending_challenge("user@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_challenge_on_unknown_key_is_noop() {
        let users = InMemoryUserRepository::new();

        assert!(!users.clear_challenge("nobody@example.com", "123456").await.unwrap());
        assert!(users.find_user(UserId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_challenge_spares_replacement_code() {
        let users = InMemoryUserRepository::new();
        let expires_at = Utc::now() + Duration::minutes(10);
        users
            .store_challenge("user@example.com", "111111", expires_at)
            .await
            .unwrap();

        // Resent between the caller's read and its clear.
        users
            .store_challenge("user@example.com", "222222", expires_at)
            .await
            .unwrap();

        assert!(!users.clear_challenge("user@example.com", "111111").await.unwrap());
        let pending = users.pending_challenge("user@example.com").await.unwrap().unwrap();
        assert_eq!(pending.code, "222222");

        assert!(users.clear_challenge("user@example.com", "222222").await.unwrap());
        assert!(users.pending_challenge("user@example.com").await.unwrap().is_none());
    }
}
