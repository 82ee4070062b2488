//! In-memory session store.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{Session, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Session store backed by a `HashMap` keyed by refresh token.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Sessions owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if the lock is poisoned.
    pub fn sessions_for(&self, user_id: UserId) -> Result<Vec<Session>> {
        Ok(self
            .lock()?
            .values()
            .filter(|session| session.user_id == user_id)
            .cloned()
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::lock_poisoned("session table"))
    }
}

impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self.lock()?;

        if sessions.contains_key(&session.refresh_token) {
            return Err(AuthError::Storage(
                "refresh token already in use".to_string(),
            ));
        }
        sessions.insert(session.refresh_token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        Ok(self.lock()?.get(refresh_token).cloned())
    }

    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        Ok(self.lock()?.remove(refresh_token).is_some())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        Ok(before - sessions.len())
    }
}
