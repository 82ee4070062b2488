//! Test doubles.
//!
//! Deterministic stand-ins for the time source, the code generator and the
//! delivery service. Storage doubles are not needed: the in-memory stores in
//! [`crate::stores`] are real implementations.

pub mod clock;
pub mod code;
pub mod notifier;

pub use clock::MockClock;
pub use code::FixedCodeGenerator;
pub use notifier::{RecordingNotifier, SentCode};
