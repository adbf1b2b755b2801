//! Bounded pool for blocking collaborator calls
//!
//! Process listings, `/proc` reads and shell commands run on Tokio's
//! blocking threads. A semaphore caps how many run at once and each call
//! gets a deadline; a call that misses it is reported as unavailable while
//! the thread finishes in the background, still holding its permit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::warn;

use super::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl BlockingPool {
    pub fn new(max_blocking: usize, deadline: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_blocking.max(1))),
            deadline,
        }
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` on a blocking thread, waiting at most the pool deadline
    ///
    /// The deadline covers both waiting for a slot and the call itself.
    pub async fn run<T, F>(&self, task: F) -> ApiResult<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ApiError::Internal(format!("blocking pool closed: {e}")))?;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                task()
            })
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))
        };

        match timeout(self.deadline, work).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(ApiError::Internal(e.to_string())),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!("collaborator call exceeded {:?}", self.deadline);
                Err(ApiError::Unavailable(format!(
                    "operation timed out after {} seconds",
                    self.deadline.as_secs()
                )))
            }
        }
    }
}
