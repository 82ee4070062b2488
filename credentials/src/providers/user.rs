//! User repository trait.

use crate::error::Result;
use crate::state::UserId;
use chrono::{DateTime, Utc};

/// A code waiting to be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    /// Identity the code belongs to.
    pub user_id: UserId,

    /// The expected code.
    pub code: String,

    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// The slice of a user record this crate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User identifier.
    pub id: UserId,

    /// Normalized email address or phone number.
    pub user_key: String,

    /// Whether a challenge has ever been completed for this identity.
    pub verified: bool,
}

/// User repository.
///
/// Owned by the application; this crate only touches the pending code, its
/// expiry and the verified flag.
pub trait UserRepository: Send + Sync {
    /// Store a pending code for `user_key`, replacing any previous one.
    ///
    /// Creates the identity if it does not exist yet, so callers cannot
    /// tell new users from returning ones.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn store_challenge(
        &self,
        user_key: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;

    /// Get the pending code for `user_key`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn pending_challenge(
        &self,
        user_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<PendingChallenge>>> + Send;

    /// Drop the pending code for `user_key`, but only if it still equals
    /// `code`.
    ///
    /// Returns `true` when a code was cleared. A code replaced since it was
    /// read stays pending.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn clear_challenge(
        &self,
        user_key: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Complete a challenge as one atomic conditional update.
    ///
    /// Only if the stored code still equals `code`: clear the code and its
    /// expiry, mark the identity verified and return its id. Otherwise
    /// change nothing and return `None`.
    ///
    /// Of two concurrent calls with the same correct code, exactly one
    /// returns `Some`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn complete_challenge(
        &self,
        user_key: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserId>>> + Send;

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_user(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserRecord>>> + Send;
}
