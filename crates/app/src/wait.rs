//! Fixed-interval polling with a bounded timeout.
//!
//! The surface never pushes change notifications, so every "wait for
//! element/state" is a poll loop. Timeouts are local to each call: exceeding
//! one degrades to a skipped unit of work upstream, never a process-wide
//! abort.

use std::future::Future;
use std::time::Duration;

/// Poll cadence shared by every wait in a synchronization pass.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Pause between probe attempts.
    pub poll_interval: Duration,
    /// Upper bound on the total wait per call.
    pub timeout: Duration,
}

impl Timing {
    /// Build a timing from millisecond knobs (the config-file units).
    #[must_use]
    pub fn from_millis(poll_interval: u64, timeout: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_interval),
            timeout: Duration::from_millis(timeout),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_millis(100, 3_000)
    }
}

/// A probe never returned a value within the bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {waited_ms}ms waiting for {what}")]
pub struct WaitTimeout {
    /// What was being waited for, for diagnostics.
    pub what: &'static str,
    pub waited_ms: u64,
}

/// Poll `probe` at `timing.poll_interval` until it yields a value or
/// `timing.timeout` elapses.
///
/// The probe runs at least once, so a zero timeout still observes current
/// state.
///
/// # Errors
///
/// Returns [`WaitTimeout`] when the bound is exceeded.
pub async fn wait_until<T, F, Fut>(timing: Timing, what: &'static str, mut probe: F) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timing.timeout;
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(WaitTimeout {
                what,
                waited_ms: u64::try_from(timing.timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        tokio::time::sleep(timing.poll_interval).await;
    }
}
