//! Generic bounded polling for UI state.
//!
//! Every wait in the automation flow goes through [`wait_for`] so that no
//! step can block indefinitely: a probe is retried at a fixed interval until
//! it yields a value or the deadline passes.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

#[derive(Debug, Error)]
#[error("timed out after {}s waiting for {what}", timeout.as_secs())]
pub struct WaitTimeout {
    pub what: &'static str,
    pub timeout: Duration,
}

/// Polls `probe` until it returns `Some`, or fails with [`WaitTimeout`] once
/// `timeout` has elapsed. The probe is always tried at least once.
pub async fn wait_for<T, Fut>(
    what: &'static str,
    timeout: Duration,
    interval: Duration,
    mut probe: impl FnMut() -> Fut,
) -> Result<T, WaitTimeout>
where
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitTimeout { what, timeout });
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_once_probe_succeeds() {
        let mut calls = 0;
        let result = wait_for(
            "counter",
            Duration::from_secs(1),
            Duration::from_millis(5),
            || {
                calls += 1;
                let ready = calls >= 3;
                async move { ready.then_some("done") }
            },
        )
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn times_out_when_probe_never_succeeds() {
        let result: Result<(), _> = wait_for(
            "never",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { None },
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.what, "never");
        assert!(err.to_string().contains("never"));
    }

    #[tokio::test]
    async fn probe_is_tried_at_least_once_with_zero_timeout() {
        let result = wait_for(
            "immediate",
            Duration::ZERO,
            Duration::from_millis(5),
            || async { Some(42) },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }
}
