//! Readiness polling.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use crate::error::CloudError;

/// The cadence and budget of a readiness wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitConfig {
    /// Time slept between evaluations of the predicate.
    pub interval: Duration,
    /// Total time after which the wait gives up.
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Wait until the given predicate reports readiness.
///
/// The predicate is evaluated immediately, then once per `interval` until it returns `true`,
/// or until `timeout` has elapsed, in which case `CloudError::TimedOut` is returned. The
/// predicate is responsible for fetching fresh state on every call. An error returned by the
/// predicate aborts the wait and is returned as is.
pub async fn wait_for<F, Fut>(description: &str, cfg: WaitConfig, mut predicate: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if predicate().await? {
            tracing::debug!(attempt, elapsed = ?start.elapsed(), "{} is ready", description);
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= cfg.timeout {
            tracing::warn!(attempt, ?elapsed, "timed out waiting for {}", description);
            return Err(CloudError::TimedOut { description: description.into(), timeout: cfg.timeout }.into());
        }
        tracing::debug!(attempt, ?elapsed, "waiting for {}", description);
        tokio::time::sleep(cfg.interval.min(cfg.timeout - elapsed)).await;
    }
}
