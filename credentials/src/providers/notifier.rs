//! Code delivery trait.

use crate::error::Result;
use chrono::{DateTime, Utc};

/// Delivers challenge codes to users.
///
/// This trait abstracts over email and SMS delivery services.
pub trait CodeNotifier: Send + Sync {
    /// Send `code` to `user_key`.
    ///
    /// # Arguments
    ///
    /// - `user_key`: Normalized email address or phone number
    /// - `code`: The one-time code
    /// - `expires_at`: When the code stops being accepted
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DeliveryFailed`](crate::AuthError::DeliveryFailed)
    /// if the delivery service rejects the message.
    fn send_code(
        &self,
        user_key: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
