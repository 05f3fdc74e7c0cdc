//! Leasing a session's content store from the pool.

use std::future::Future;
use std::sync::Arc;

use ngo_core::content::connector::ContentConnector;
use ngo_core::content::{ContentError, ContentStore};
use ngo_core::pool::SessionPool;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::session::SessionId;

/// Releases the lease if the request future is dropped mid-operation.
struct LeaseGuard {
    pool: SessionPool<ContentConnector>,
    session_id: String,
    armed: bool,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.armed {
            let pool = self.pool.clone();
            let session_id = std::mem::take(&mut self.session_id);
            tokio::spawn(async move { pool.release(&session_id).await });
        }
    }
}

/// Run `op` against the session's store handle.
///
/// The lease is released whether `op` succeeds, fails, or is cancelled.
pub async fn with_store<T, F, Fut>(state: &AppState, session: &SessionId, op: F) -> AppResult<T>
where
    F: FnOnce(Arc<dyn ContentStore>) -> Fut,
    Fut: Future<Output = Result<T, ContentError>>,
{
    let store = state.sessions.acquire(session.as_str()).await?;
    let mut guard = LeaseGuard {
        pool: state.sessions.clone(),
        session_id: session.as_str().to_string(),
        armed: true,
    };
    let result = op(store).await;
    guard.armed = false;
    state.sessions.release(session.as_str()).await;
    Ok(result?)
}
