//! In-memory collaborator implementations.
//!
//! Suitable for single-process deployments and tests. State is lost on
//! restart, which also drops every session.

pub mod session_memory;
pub mod user_memory;

pub use session_memory::InMemorySessionStore;
pub use user_memory::InMemoryUserRepository;
