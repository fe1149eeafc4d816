use crate::error::TransferError;
use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a single execution attempt, decided by the handler.
///
/// The executor never inspects errors itself; the handler is authoritative
/// about what is worth another attempt.
pub enum Attempt<T> {
    /// Terminate successfully with this value.
    Complete(T),
    /// Terminate immediately with this error.
    Fatal(TransferError),
    /// Schedule another attempt if any remain. The error, when present, is
    /// kept as the cause reported on exhaustion.
    Retry(Option<TransferError>),
}

impl<T> Attempt<T> {
    /// Transport failures are worth another attempt; everything else is final.
    pub fn from_error(err: TransferError) -> Self {
        match err {
            TransferError::Network(_) => Attempt::Retry(Some(err)),
            err => Attempt::Fatal(err),
        }
    }
}

/// Drives a handler through up to `max_retries + 1` attempts with a fixed
/// wait between attempts.
///
/// The executor holds no state across `execute` calls and may be shared or
/// rebuilt freely.
pub struct RetryExecutor {
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub log_msg_prefix: String,
    pub error_message: String,
    pub cancellation: Option<CancellationToken>,
}

impl RetryExecutor {
    pub async fn execute<T, F, Fut>(&self, mut handler: F) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let attempts = self.max_retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            if let Some(token) = &self.cancellation {
                if token.is_cancelled() {
                    return Err(TransferError::Cancelled);
                }
            }
            match handler().await {
                Attempt::Complete(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry(err) => last_error = err,
            }
            if attempt < attempts {
                warn!(
                    "{}Attempt {} of {} failed - retrying in {}ms",
                    self.log_msg_prefix,
                    attempt,
                    attempts,
                    self.retry_interval.as_millis()
                );
                self.wait().await?;
            }
        }
        Err(TransferError::RetriesExhausted {
            message: self.error_message.clone(),
            attempts,
            source: last_error.map(Box::new),
        })
    }

    async fn wait(&self) -> Result<(), TransferError> {
        match &self.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(TransferError::Cancelled),
                _ = tokio::time::sleep(self.retry_interval) => Ok(()),
            },
            None => {
                tokio::time::sleep(self.retry_interval).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn executor(max_retries: u32, interval_ms: u64) -> RetryExecutor {
        RetryExecutor {
            max_retries,
            retry_interval: Duration::from_millis(interval_ms),
            log_msg_prefix: String::new(),
            error_message: "operation failed".into(),
            cancellation: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = executor(3, 10)
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Attempt::Complete(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_terminates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = executor(3, 10)
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Attempt::Fatal(TransferError::Cancelled)
                }
            })
            .await;
        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn performs_at_most_max_retries_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = tokio::time::Instant::now();
        let result: Result<(), _> = executor(3, 10)
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Attempt::Retry(None)
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Sleeps only between attempts: 3 * 10ms in the worst case.
        assert_eq!(started.elapsed(), Duration::from_millis(30));
        match result {
            Err(TransferError::RetriesExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 4);
                assert!(source.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_last_error() {
        let result: Result<(), _> = executor(1, 10)
            .execute(|| async {
                Attempt::Retry(Some(TransferError::Io {
                    context: "writing chunk".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                }))
            })
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("operation failed"));
        match err {
            TransferError::RetriesExhausted { source, .. } => {
                assert!(source.unwrap().to_string().contains("writing chunk"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let token = CancellationToken::new();
        let mut executor = executor(5, 60_000);
        executor.cancellation = Some(token.clone());

        let cancel = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                token.cancel();
            }
        });

        let started = tokio::time::Instant::now();
        let result: Result<(), _> = executor.execute(|| async { Attempt::Retry(None) }).await;
        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(60));
        cancel.await.unwrap();
    }
}
