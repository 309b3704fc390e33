//! Global rate limiter for Bot API sends.
//!
//! Implements a sliding one-second window shared by every bot, so the
//! process as a whole stays under the API's broadcast ceiling.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Length of the trailing window.
const WINDOW: Duration = Duration::from_secs(1);

/// Added to every computed wait so the oldest entry has left the window on wake.
const WAKE_MARGIN: Duration = Duration::from_millis(10);

/// Rate limiter admitting at most `max_per_window` operations per trailing second.
#[derive(Debug)]
pub struct RateLimiter {
    /// Ceiling on admissions within [`WINDOW`].
    max_per_window: usize,

    /// Admission timestamps, oldest first.
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_per_sec` operations in any trailing second.
    ///
    /// A ceiling of zero is treated as one.
    #[must_use]
    pub fn new(max_per_sec: usize) -> Self {
        let max_per_window = max_per_sec.max(1);
        Self {
            max_per_window,
            admissions: Mutex::new(VecDeque::with_capacity(max_per_window)),
        }
    }

    /// Returns the configured ceiling.
    #[must_use]
    pub const fn max_per_sec(&self) -> usize {
        self.max_per_window
    }

    /// Waits until one more operation fits in the window, then records it.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn admit(&self) -> Duration {
        let mut admissions = self.admissions.lock().await;
        let started = Instant::now();

        loop {
            let now = Instant::now();
            prune(&mut admissions, now);

            if admissions.len() < self.max_per_window {
                break;
            }

            let Some(&oldest) = admissions.front() else {
                break;
            };
            let wait = (WINDOW + WAKE_MARGIN).saturating_sub(now.duration_since(oldest));
            debug!(
                "Global throttle: {} sends in the last second, sleeping {:.2}s",
                admissions.len(),
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }

        admissions.push_back(Instant::now());
        let waited = started.elapsed();
        if !waited.is_zero() {
            debug!("Rate limiter: waited {:?} before admission", waited);
        }
        waited
    }

    /// Number of admissions currently inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        prune(&mut admissions, Instant::now());
        admissions.len()
    }
}

/// Drops admissions older than the window.
fn prune(admissions: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = admissions.front() {
        if now.duration_since(oldest) > WINDOW {
            admissions.pop_front();
        } else {
            break;
        }
    }
}
