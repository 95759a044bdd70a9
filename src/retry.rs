//! Bounded retry controller for steps that call external services.
//!
//! An explicit loop carrying attempt count and delay as local state. Only
//! transient errors are retried; data-integrity and permanent datasource
//! errors pass straight through.

use crate::error::EngineError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before retry n is `base_delay * n` (linearly increasing).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, retrying transient failures up to the
/// policy's limit. Returns the last error once retries are exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.base_delay * attempt;
                warn!(
                    step = label,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "transient error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
