//! Exponential-backoff retry (spec §4.8). Jitter is not spec-mandated but
//! matches `original_source/`-style stampede avoidance and reuses the
//! teacher's existing `rand` dependency.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::Result;

fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
    let capped = exp.min(config.max_delay_ms);
    let jitter_frac = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_millis((capped as f64 * jitter_frac) as u64)
}

/// Calls `f` up to `config.max_retries + 1` times, sleeping an exponentially
/// growing, jittered delay between attempts. Returns the last error if every
/// attempt fails.
pub async fn retry_with_backoff<F, Fut, T>(config: &RetryConfig, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= config.max_retries {
                    return Err(e);
                }
                tokio::time::sleep(backoff_delay(config, attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = retry_with_backoff(&RetryConfig::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_then_gives_up() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(&config, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::TransportTransient("boom".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let calls = AtomicU32::new(0);
        let result: Result<&'static str> = retry_with_backoff(&config, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 1 {
                Err(Error::TransportTransient("boom".into()))
            } else {
                Ok("recovered")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "recovered");
    }
}
