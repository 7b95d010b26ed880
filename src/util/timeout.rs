//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::{BridgeError, TimeoutPhase};

/// Wrap a future with a timeout, reporting expiry as an upstream timeout in `phase`.
pub async fn with_timeout<T>(
    duration: Duration,
    phase: TimeoutPhase,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::timeout(phase, duration)),
    }
}
