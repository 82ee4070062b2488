//! Offloading CPU-bound work from the async runtime.

use crate::error::{AuthError, Result};

/// Run `f` on tokio's blocking pool and flatten the join error into
/// [`AuthError::InternalError`].
pub(crate) async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::InternalError(format!("{what} task failed: {e}")))?
}
