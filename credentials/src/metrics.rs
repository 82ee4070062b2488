//! Metric descriptions.
//!
//! Counters are emitted through the `metrics` facade wherever the event
//! happens. Nothing is recorded until the application installs a recorder
//! (the server binary installs a Prometheus exporter). Call
//! [`describe_metrics`] once after installing it so the exporter can attach
//! help text.

use crate::constants::metrics::{
    CHALLENGES_ISSUED, CHALLENGES_REJECTED, CHALLENGES_VERIFIED, KEYS_GENERATED, KEYS_RETIRED,
    SESSIONS_CREATED, SESSIONS_REFRESHED, SESSIONS_REJECTED, SESSIONS_TERMINATED, TOKENS_REJECTED,
    TOKENS_SIGNED, VERIFICATION_CONSUMED, VERIFICATION_ISSUED, VERIFICATION_REJECTED,
    VERIFICATION_SWEPT,
};
use metrics::describe_counter;

/// Register help text for every counter this crate emits.
pub fn describe_metrics() {
    // Challenges
    describe_counter!(CHALLENGES_ISSUED, "One-time codes issued, resends included");
    describe_counter!(CHALLENGES_VERIFIED, "One-time codes verified successfully");
    describe_counter!(CHALLENGES_REJECTED, "One-time code verifications rejected, by reason");

    // Verification tokens
    describe_counter!(VERIFICATION_ISSUED, "Verification tokens issued");
    describe_counter!(VERIFICATION_CONSUMED, "Verification tokens consumed successfully");
    describe_counter!(VERIFICATION_REJECTED, "Verification token consumes rejected, by reason");
    describe_counter!(VERIFICATION_SWEPT, "Expired verification tokens removed by the sweeper");

    // Sessions
    describe_counter!(SESSIONS_CREATED, "Sessions created");
    describe_counter!(SESSIONS_REFRESHED, "Sessions refreshed");
    describe_counter!(SESSIONS_REJECTED, "Session refreshes rejected, by reason");
    describe_counter!(SESSIONS_TERMINATED, "Sessions terminated");

    // Access tokens and keys
    describe_counter!(TOKENS_SIGNED, "Access tokens signed");
    describe_counter!(TOKENS_REJECTED, "Access tokens rejected, by reason");
    describe_counter!(KEYS_GENERATED, "Signing keys generated, at startup and on rotation");
    describe_counter!(KEYS_RETIRED, "Signing keys retired by cleanup");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
