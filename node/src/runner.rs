//! Runs blocking store work from async code.

use std::time::Duration;

use foul_engine::EngineError;
use foul_store::StoreError;

/// Executes store-bound closures on the blocking pool under a deadline.
///
/// [`run`](Self::run) gives up at the deadline: a timeout or a panicked task
/// surfaces as [`EngineError::StoreUnavailable`], and the closure's own
/// errors pass through. Work that may commit something the caller must act
/// on (creating a poll, finalizing polls) goes through
/// [`run_to_completion`](Self::run_to_completion) instead.
#[derive(Clone, Copy, Debug)]
pub struct StoreRunner {
    timeout: Duration,
}

impl StoreRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(op, error = %join_err, "store task failed");
                Err(StoreError::Unavailable(format!("{op}: {join_err}")).into())
            }
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(StoreError::Unavailable(format!("{op}: timed out")).into())
            }
        }
    }

    /// Like [`run`](Self::run), but a missed deadline is only logged: the
    /// call keeps waiting for the blocking task and returns what it actually
    /// did, so nothing it commits goes unreported.
    pub async fn run_to_completion<T, F>(&self, op: &'static str, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let mut task = tokio::task::spawn_blocking(f);
        let joined = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "store call past its deadline, waiting for it to finish"
                );
                task.await
            }
        };
        joined.unwrap_or_else(|join_err| {
            tracing::error!(op, error = %join_err, "store task failed");
            Err(StoreError::Unavailable(format!("{op}: {join_err}")).into())
        })
    }
}
