use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// Runs a store write, retrying transient database failures with
/// exponential backoff (100ms, 200ms, 400ms, ...).
pub async fn with_retry<F, Fut, T>(max_retries: u32, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_transient() => {
                attempt += 1;
                let delay = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tracing::warn!(attempt, error = %e, "transient DB error, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
