//! Bounded retry of technical failures.

use crate::config::RetryPolicy;
use crate::error::{AuthError, Result};
use tracing::{error, warn};

/// Runs `operation` up to `policy.max_attempts` times.
///
/// Only technical errors ([`AuthError::is_technical`]) are retried, with a
/// fixed `policy.delay` between attempts; user errors return immediately
/// with attempt state untouched. Exhausting the attempts returns the
/// uniform [`AuthError::ServiceUnavailable`] so callers surface one
/// retry-allowed response regardless of which dependency failed.
///
/// The executor holds no state between calls; the inter-attempt sleep
/// suspends only the calling future.
pub async fn execute<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_technical() => return Err(e),
            Err(e) => {
                if attempt == max_attempts {
                    error!(attempt, max_attempts, error = %e, "retries exhausted");
                    return Err(AuthError::ServiceUnavailable);
                }
                warn!(attempt, max_attempts, error = %e, "technical failure, retrying");
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    // 1..=max_attempts with max_attempts >= 1 always returns above.
    Err(AuthError::ServiceUnavailable)
}
