//! Bounded retry and timeout helpers for effectful cycles.

use buyline_adserver::AdServerResult;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempts allowed for one decide cycle before the conflict is
/// surfaced to the caller as "modified concurrently".
pub const DECIDE_ATTEMPTS: u32 = 3;

/// Upper bound on any single ad server call.
pub(crate) const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `operation` up to `max_attempts` times, retrying only failures
/// `should_retry` marks as transient. The attempt number (starting at
/// 1) is passed in so the operation can vary its first try, e.g. a
/// decide cycle honors the caller-observed version once and re-reads
/// on every retry.
pub async fn with_retries<T, E, F, Fut, P>(
    max_attempts: u32,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                debug!(attempt, "Retrying after transient failure");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Await an ad server call with an upper bound. A hung third-party
/// call must not hold a request handler open; the caller treats a
/// timeout like any other adapter failure.
pub(crate) async fn adapter_call<T>(
    limit: Duration,
    operation: impl Future<Output = AdServerResult<T>>,
) -> Result<T, String> {
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!(
            "ad server call timed out after {}s",
            limit.as_secs()
        )),
    }
}
