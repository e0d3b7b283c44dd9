use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before the retry that follows the zero-based `attempt`:
/// `unit`, `2 * unit`, `4 * unit`, ...
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

/// Retries an async operation with exponential backoff
///
/// # Parameters
/// - `operation`: Closure taking the zero-based attempt number and returning a future
/// - `max_attempts`: Total number of runs, at least one
/// - `unit`: Delay after the first failure; doubles after every further failure
///
/// # Returns
/// Either the first successful result or the error of the last attempt. No
/// delay follows the last attempt.
pub async fn with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_attempts: u32,
    unit: Duration,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(err) => {
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    error = %err,
                    "Attempt failed"
                );
                if attempt + 1 >= max_attempts {
                    return Err(err);
                }
                let delay = backoff_delay(unit, attempt);
                debug!(?delay, "Retrying...");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_schedule() {
        let unit = Duration::from_secs(1);
        assert_eq!(backoff_delay(unit, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(unit, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(unit, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(unit, 40), unit * u32::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u32, String> = with_backoff(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(format!("failure {attempt}"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            3,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two waits: 1s + 2s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_without_trailing_wait() {
        let start = Instant::now();

        let result: Result<(), String> = with_backoff(
            |attempt| async move { Err(format!("failure {attempt}")) },
            3,
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_backoff(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            },
            0,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
