use std::future::Future;

use tracing::{debug, warn};

use crate::{errors::ActionError, types::RetryPolicy};

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The final error is returned unmodified.
///
/// Returns the value together with the number of attempts used.
pub async fn retry_async<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<(T, u32), ActionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    op = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!(op = label, attempt, error = %err, "giving up");
                return Err(err);
            }
        }
    }
}
