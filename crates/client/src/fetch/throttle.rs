//! Global spacing of outgoing network attempts.
//!
//! Every attempt, whatever its target, passes through one throttle so that a
//! page load firing several requests at once does not stampede a cold
//! backend. Callers are delayed, never rejected, and served in submission
//! order.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default minimum gap between the starts of two attempts.
pub const DEFAULT_MIN_GAP: Duration = Duration::from_millis(180);

/// Enforces a minimum interval between attempt starts.
#[derive(Debug)]
pub struct RequestThrottle {
    last_start: Mutex<Option<Instant>>,
    min_gap: Duration,
}

impl RequestThrottle {
    pub fn new(min_gap: Duration) -> Self {
        Self { last_start: Mutex::new(None), min_gap }
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Wait until the gap since the previous start has elapsed, then record
    /// the current instant as the latest start.
    ///
    /// The lock is held while sleeping; tokio's mutex is fair, so waiters
    /// stack up in FIFO order and their delays add up.
    pub async fn acquire(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_gap;
            let now = Instant::now();
            if now < ready_at {
                tracing::debug!(wait_ms = (ready_at - now).as_millis() as u64, "throttling request");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Run `task` once the throttle allows a new start.
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire().await;
        task.await
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GAP)
    }
}
