//! Retry of ledger operations.
//!
//! # Responsibilities
//! - Decide whether a failure is worth another attempt
//! - Sleep with exponential backoff + jitter between attempts
//! - Give up after the configured attempt budget
//!
//! # Design Decisions
//! - Only `TxError::Connectivity` is retried; contract rejections and bad
//!   input fail the same way every time
//! - Confirmation timeouts are not retried: the transaction may still land,
//!   so the caller re-queries by digest instead

use std::future::Future;

use crate::config::RetryConfig;
use crate::error::TxError;
use crate::resilience::backoff::calculate_backoff;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. The last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, TxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TxError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
