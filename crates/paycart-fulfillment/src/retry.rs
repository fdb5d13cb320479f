//! Retry with exponential back-off and jitter for provider reads.
//!
//! Order creation is not idempotent on the provider side and never goes
//! through [`retry_with_backoff`].

use std::future::Future;
use std::time::Duration;

use crate::error::FulfillmentError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: network failures, HTTP 429 and 5xx. Everything else, including
/// 404 and malformed bodies, is returned as-is.
pub(crate) fn is_retriable(err: &FulfillmentError) -> bool {
    match err {
        FulfillmentError::Http(_) => true,
        FulfillmentError::Api { status, .. } => *status == 429 || *status >= 500,
        FulfillmentError::NotFound(_)
        | FulfillmentError::Deserialize { .. }
        | FulfillmentError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// The delay before retry `n` is `backoff_base_ms × 2^(n-1)` with ±25 %
/// jitter, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FulfillmentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FulfillmentError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "fulfillment provider transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn api(status: u16) -> FulfillmentError {
        FulfillmentError::Api {
            status,
            message: "boom".to_owned(),
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_retriable() {
        assert!(is_retriable(&api(429)));
        assert!(is_retriable(&api(500)));
        assert!(is_retriable(&api(503)));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&api(400)));
        assert!(!is_retriable(&api(401)));
        assert!(!is_retriable(&FulfillmentError::NotFound("ord".to_owned())));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 1, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(api(503))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = retry_with_backoff(2, 1, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(api(500))
            }
        })
        .await;
        assert!(matches!(result, Err(FulfillmentError::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_error_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = retry_with_backoff(5, 1, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(api(422))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
