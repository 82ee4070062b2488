//! Session store trait.

use crate::error::Result;
use crate::state::{Session, UserId};

/// Durable storage for session rows.
///
/// Rows are looked up by refresh token. Implementations should index that
/// column.
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn create(&self, session: &Session) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Find the session holding `refresh_token`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<Option<Session>>> + Send;

    /// Delete the session holding `refresh_token`.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Delete every session owned by `user_id`.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_user_sessions(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}
