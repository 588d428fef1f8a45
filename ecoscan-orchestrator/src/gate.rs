//! Outbound call gate
//!
//! Every outbound call of a query (live source fetches, chain alternates,
//! catalog searches and AI suggestion lookups) goes through one [`CallGate`]:
//! a permit from the process-wide semaphore, then its own timeout raced
//! against the query's [`QueryDeadline`].

use crate::types::ProviderError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared concurrency cap for outbound calls
#[derive(Clone)]
pub struct CallGate {
    semaphore: Arc<Semaphore>,
}

impl CallGate {
    /// A cap of zero is raised to one
    pub fn new(concurrency_cap: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_cap.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run one call under a permit, bounded by `timeout` and `deadline`
    ///
    /// `call` is not polled until a permit is held, and the permit is
    /// released as soon as it returns.
    pub async fn run<T, F>(
        &self,
        timeout: Duration,
        deadline: &CancellationToken,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let _permit = tokio::select! {
            biased;
            _ = deadline.cancelled() => return Err(ProviderError::DeadlineExceeded),
            permit = self.semaphore.acquire() => permit
                .map_err(|_| ProviderError::Unavailable("call gate closed".to_string()))?,
        };

        tokio::select! {
            biased;
            _ = deadline.cancelled() => Err(ProviderError::DeadlineExceeded),
            outcome = tokio::time::timeout(timeout, call) => {
                outcome.unwrap_or(Err(ProviderError::Timeout(timeout.as_millis() as u64)))
            }
        }
    }
}

/// Per-query deadline: a child token cancelled by a watchdog task
///
/// Dropping the deadline stops the watchdog.
pub struct QueryDeadline {
    token: CancellationToken,
    watchdog: JoinHandle<()>,
}

impl QueryDeadline {
    /// Arm a deadline that fires after `limit` or when `parent` is cancelled
    pub fn arm(parent: &CancellationToken, limit: Duration) -> Self {
        let token = parent.child_token();
        let watchdog = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                token.cancel();
            })
        };
        Self { token, watchdog }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_hit(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for QueryDeadline {
    fn drop(&mut self) {
        self.watchdog.abort();
    }
}
