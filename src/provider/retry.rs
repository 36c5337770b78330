//! Bounded retry with exponential backoff and jitter.
//!
//! Only rate-limit errors are retried; everything else propagates on the
//! first failure. The computed delay is surfaced to the caller (in rounded-up
//! whole seconds) before each sleep so the UI can show a countdown. Sleeping
//! goes through an injected [`Sleeper`] so tests can record delays instead of
//! waiting them out.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::errors::{GenerationError, Result};

/// Total attempts per operation (the first call plus up to two retries).
pub const MAX_ATTEMPTS: u32 = 3;

const JITTER_MS: u64 = 1000;

/// Async sleep, injectable for tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Jitter-free backoff for attempt `k` (0-indexed): `2^k` seconds.
pub fn base_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << attempt))
}

/// Run `operation` with up to [`MAX_ATTEMPTS`] attempts.
///
/// Retries only when the error is a rate-limit signal. Before each sleep the
/// delay is reported to `on_retry` rounded up to whole seconds. When the
/// final attempt still hits the rate limit, the last error is wrapped in
/// [`GenerationError::RetriesExhausted`] and returned.
pub async fn call_with_retry<T, F, Fut>(
    sleeper: &dyn Sleeper,
    mut operation: F,
    mut on_retry: impl FnMut(u64) + Send,
) -> Result<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(GenerationError::RetriesExhausted {
                        attempts: MAX_ATTEMPTS,
                        last: Box::new(err),
                    });
                }
                let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
                let delay = base_delay(attempt - 1) + Duration::from_millis(jitter);
                let delay_secs = delay.as_millis().div_ceil(1000) as u64;
                warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                on_retry(delay_secs);
                sleeper.sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn new() -> Self {
            Self {
                slept: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> GenerationError {
        GenerationError::RateLimited {
            status: 429,
            message: "RESOURCE_EXHAUSTED".into(),
        }
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_tries_exactly_three_times() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(
            &sleeper,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            },
            |_| {},
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            GenerationError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.is_rate_limit());
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_is_not_retried() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(
            &sleeper,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GenerationError::Http("connection refused".into())) }
            },
            |_| {},
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), GenerationError::Http(_)));
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_success_after_one_retry() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result = call_with_retry(
            &sleeper,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(rate_limited())
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| {},
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delays_double_within_jitter_window() {
        let sleeper = RecordingSleeper::new();
        let _: Result<()> = call_with_retry(
            &sleeper,
            || async { Err(rate_limited()) },
            |_| {},
        )
        .await;
        let slept = sleeper.recorded();
        assert_eq!(slept.len(), 2);
        for (attempt, actual) in slept.iter().enumerate() {
            let base = base_delay(attempt as u32);
            assert!(*actual >= base, "attempt {attempt}: {actual:?} < {base:?}");
            assert!(
                *actual < base + Duration::from_millis(JITTER_MS),
                "attempt {attempt}: {actual:?} exceeds jitter window"
            );
        }
    }

    #[tokio::test]
    async fn test_on_retry_reports_whole_seconds_before_sleep() {
        let sleeper = RecordingSleeper::new();
        let reported = Mutex::new(Vec::new());
        let _: Result<()> = call_with_retry(
            &sleeper,
            || async { Err(rate_limited()) },
            |secs| reported.lock().unwrap().push(secs),
        )
        .await;
        let reported = reported.into_inner().unwrap();
        let slept = sleeper.recorded();
        assert_eq!(reported.len(), slept.len());
        for (secs, delay) in reported.iter().zip(&slept) {
            assert_eq!(*secs, delay.as_millis().div_ceil(1000) as u64);
        }
        // 1s base + <1s jitter rounds up to 1 or 2; 2s base to 2 or 3.
        assert!((1..=2).contains(&reported[0]));
        assert!((2..=3).contains(&reported[1]));
    }

    #[test]
    fn test_base_delay_doubles() {
        assert_eq!(base_delay(0), Duration::from_secs(1));
        assert_eq!(base_delay(1), Duration::from_secs(2));
        assert_eq!(base_delay(2), Duration::from_secs(4));
    }
}
