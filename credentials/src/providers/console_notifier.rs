//! Console code notifier for development and testing.

use crate::error::Result;
use crate::providers::CodeNotifier;
use chrono::{DateTime, Utc};
use tracing::info;

/// Console code notifier.
///
/// This notifier logs codes to the console instead of delivering them.
/// Useful for development where you don't want to send real emails or SMS.
///
/// # Examples
///
/// ```ignore
/// use credential_issuer::providers::ConsoleNotifier;
///
/// let notifier = ConsoleNotifier::new();
/// notifier.send_code(
///     "user@example.com",
///     "482193",
///     Utc::now() + chrono::Duration::minutes(10),
/// ).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CodeNotifier for ConsoleNotifier {
    async fn send_code(&self, user_key: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let expires_minutes = (expires_at - Utc::now()).num_minutes();

        info!(
            to = %user_key,
            code = %code,
            expires_in = %expires_minutes,
            "Verification code (development mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   VERIFICATION CODE                          ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ To: {user_key:<57}║");
        println!("║ Code: {code:<55}║");
        println!("║ Expires in: {:<49}║", format!("{expires_minutes} minutes"));
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        Ok(())
    }
}
