use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Per-instance throttle enforcing a minimum interval between fetches.
///
/// Bookkeeping is absolute: as long as the caller keeps up, slots stay on the
/// `start + n * interval` grid instead of drifting by the work time between
/// calls. When the caller overruns an interval the schedule re-anchors at the
/// current time.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            interval: Duration::ZERO,
            next_slot: Mutex::new(None),
        }
    }

    /// Sets the minimum interval between two turns. Called once at source start.
    pub fn configure(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Waits for the next scheduled slot. The very first call returns
    /// immediately.
    pub async fn wait_turn(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = match *next_slot {
            Some(at) if at > now => {
                sleep_until(at).await;
                at
            }
            _ => now,
        };
        *next_slot = Some(slot + self.interval);
    }
}
