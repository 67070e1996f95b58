//! Circuit breaker and retry (spec §4.8). Wraps only the fail-open
//! transport calls used by L1/L2/L4; L3 never goes through either.

mod breaker;
mod retry;

pub use breaker::{BreakerState, CircuitBreaker};
pub use retry::retry_with_backoff;

use std::future::Future;

use crate::config::{BreakerConfig, RetryConfig};
use crate::error::{Error, Result};

/// Runs `f` through `breaker`, retrying on transient failure per `retry`.
/// A single [`Error::BreakerOpen`] short-circuits without calling `f`.
pub async fn call_with_breaker<F, Fut, T>(
    breaker: &CircuitBreaker,
    retry: &RetryConfig,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !breaker.allow_request() {
        return Err(Error::BreakerOpen);
    }

    let outcome = retry_with_backoff(retry, || async {
        match f().await {
            Ok(value) => {
                breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                breaker.record_failure();
                Err(e)
            }
        }
    })
    .await;

    outcome
}

pub fn default_breaker(config: BreakerConfig) -> CircuitBreaker {
    CircuitBreaker::new(config)
}
