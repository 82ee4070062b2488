//! Recording code notifier.

use crate::error::{AuthError, Result};
use crate::providers::CodeNotifier;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A delivered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    /// Recipient.
    pub user_key: String,
    /// Code that was sent.
    pub code: String,
    /// Expiry passed to the notifier.
    pub expires_at: DateTime<Utc>,
}

/// Notifier that keeps every delivery in memory.
///
/// Can be switched into a failing mode to exercise delivery errors.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentCode>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts every delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful delivery so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Most recent code delivered to `user_key`.
    #[must_use]
    pub fn last_code_for(&self, user_key: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|sent| sent.user_key == user_key)
            .map(|sent| sent.code)
    }
}

impl CodeNotifier for RecordingNotifier {
    fn send_code(
        &self,
        user_key: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        let outcome = if self.failing.load(Ordering::SeqCst) {
            Err(AuthError::DeliveryFailed(format!("recipient {user_key} rejected")))
        } else {
            self.sent
                .lock()
                .map(|mut sent| {
                    sent.push(SentCode {
                        user_key: user_key.to_string(),
                        code: code.to_string(),
                        expires_at,
                    });
                })
                .map_err(|_| AuthError::lock_poisoned("notifier"))
        };

        async move { outcome }
    }
}
