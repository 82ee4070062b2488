//! Collaborator traits.
//!
//! The credential components never talk to storage or delivery services
//! directly. They depend on these traits, and the application injects the
//! implementations:
//!
//! ```text
//! ChallengeStore ──► UserRepository   (pending code, verified flag)
//!                └─► CodeNotifier     (email / SMS delivery)
//! SessionManager ──► SessionStore     (durable session rows)
//! ```
//!
//! This enables:
//! - **Testing**: in-memory stores and recording doubles
//! - **Production**: a real database and delivery service
//! - **Development**: [`ConsoleNotifier`] prints codes to the terminal

pub mod console_notifier;
pub mod notifier;
pub mod session;
pub mod user;

pub use console_notifier::ConsoleNotifier;
pub use notifier::CodeNotifier;
pub use session::SessionStore;
pub use user::{PendingChallenge, UserRecord, UserRepository};
