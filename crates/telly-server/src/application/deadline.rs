//! Deadlines for backend calls.
//!
//! Every vector-index and persistence call runs under a timeout. A call that
//! times out is retried once; a second timeout surfaces as
//! `DomainError::BackendTimeout`. Errors other than timeouts are returned
//! as-is without a retry.

use std::future::Future;
use std::time::Duration;

use telly::DomainError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    timeout: Duration,
}

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        for attempt in 1..=2 {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => return result,
                Err(_) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Backend call timed out"
                    );
                }
            }
        }
        Err(DomainError::timeout(
            operation,
            self.timeout.as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_one_retry() {
        let deadline = Deadline::new(Duration::from_millis(50));
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = deadline
            .run("vector.search", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            result,
            Err(DomainError::BackendTimeout {
                operation: "vector.search".into(),
                timeout_ms: 50
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_can_succeed() {
        let deadline = Deadline::new(Duration::from_millis(50));
        let calls = AtomicUsize::new(0);

        let result = deadline
            .run("persist", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn test_errors_are_not_retried() {
        let deadline = Deadline::new(Duration::from_millis(50));
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = deadline
            .run("add", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DomainError::Validation("bad".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
