use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Retry policy with Fibonacci-growing delays: `d, d, 2d, 3d, 5d, ...`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial_delay: Duration,
    pub max_retries: usize,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_retries: usize) -> Self {
        Self {
            initial_delay,
            max_retries,
        }
    }

    /// Runs `operation` until it succeeds or `max_retries` extra attempts have
    /// failed, returning the last error.
    pub async fn retry<T, E, Fut, F>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retries = 0;
        let mut fib = (self.initial_delay, self.initial_delay);

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if retries < self.max_retries => {
                    warn!(
                        attempt = retries + 1,
                        max_retries = self.max_retries,
                        delay = ?fib.0,
                        "Operation failed, retrying: {e}"
                    );
                    sleep(fib.0).await;
                    retries += 1;
                    fib = (fib.1, fib.0 + fib.1);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = Backoff::new(Duration::from_millis(1), 2)
            .retry(|| async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err("transient"),
                    n => Ok(n),
                }
            })
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = Backoff::new(Duration::from_millis(1), 2)
            .retry(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("down")
            })
            .await;
        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let _: Result<(), &str> = Backoff::new(Duration::from_millis(1), 0)
            .retry(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("down")
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
