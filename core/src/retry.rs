//! Bounded exponential-backoff retry around a single request attempt.
//!
//! A response whose status is not in `retry_on_status` is returned as-is,
//! even when it is not a success; deciding whether it is an error is left
//! to the caller.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::RetryPolicy;
use crate::http::{HttpResponse, TransportError};

/// Why an attempt is about to be retried. Handed to the retry observer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptFailure {
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    #[error(transparent)]
    Network(TransportError),
}

/// Run `attempt` until it produces a non-retryable outcome or the attempts
/// run out. Total attempts are `max(1 + max_retries, min_attempts)`.
/// `on_retry(n, failure)` fires before retry `n`; it cannot influence the loop.
///
/// On exhaustion the last outcome is returned unchanged: the last response
/// for a bad status, the last transport error for a network failure.
pub async fn with_retry<F, Fut, O>(
    mut attempt: F,
    policy: &RetryPolicy,
    min_attempts: u32,
    mut on_retry: O,
) -> Result<HttpResponse, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse, TransportError>>,
    O: FnMut(u32, &AttemptFailure),
{
    let total = policy.max_retries.saturating_add(1).max(min_attempts).max(1);
    let mut number = 1;

    loop {
        let outcome = attempt().await;
        let failure = match &outcome {
            Ok(response) if policy.retries_status(response.status) => Some(AttemptFailure::Status {
                status: response.status,
                status_text: response.status_text.clone(),
            }),
            Err(err) if err.is_network() && policy.retry_on_network_error => {
                Some(AttemptFailure::Network(err.clone()))
            }
            _ => None,
        };
        let Some(failure) = failure else {
            return outcome;
        };

        if number >= total {
            debug!(attempts = number, error = %failure, "retries exhausted");
            return outcome;
        }

        on_retry(number, &failure);
        let delay = policy.delay_for(number);
        debug!(retry = number, delay_ms = delay.as_millis() as u64, "backing off before retry");
        if !delay.is_zero() {
            backoff(delay).await;
        }
        number += 1;
    }
}

/// Wait out a backoff delay on the runtime's own timer.
#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
async fn backoff(delay: Duration) {
    tokio::time::sleep(delay).await;
}

/// Wait out a backoff delay on the runtime's own timer. Browsers have no
/// tokio time driver, so this goes through `setTimeout`.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
async fn backoff(delay: Duration) {
    gloo_timers::future::sleep(delay).await;
}
