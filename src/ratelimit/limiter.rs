//! Core async rate limiter implementation.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::backend::Throttle;
use super::window::{RateWindow, RequestLog};
use crate::error::Result;

/// Sliding-window admission gate for outbound requests.
///
/// At most `max_requests` callers are admitted in any trailing `time_window`.
/// Callers over budget sleep until the oldest admission ages out and then
/// re-check, so waiters are not served in arrival order: whoever re-locks
/// first after a slot frees up wins it.
///
/// The log lock is never held across an `.await`, which makes a cancelled
/// `acquire` a no-op on shared state.
pub struct AsyncRateLimiter {
    window: RateWindow,
    log: Mutex<RequestLog>,
}

/// Point-in-time view of a limiter, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub max_requests: u64,
    pub time_window_secs: f64,
    pub current_usage: usize,
    pub remaining: u64,
    pub wait_secs: f64,
}

impl AsyncRateLimiter {
    /// Create a limiter admitting `max_requests` per `time_window`.
    ///
    /// Fails with `InvalidConfiguration` if either value is zero.
    pub fn new(max_requests: u64, time_window: Duration) -> Result<Self> {
        Ok(Self::with_window(RateWindow::new(max_requests, time_window)?))
    }

    /// Create a limiter from an already validated window.
    pub fn with_window(window: RateWindow) -> Self {
        Self {
            window,
            log: Mutex::new(RequestLog::new()),
        }
    }

    /// Wait until a request slot is available and claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = match self.try_admit() {
                Ok(()) => return,
                Err(wait) => wait,
            };

            debug!(
                max_requests = self.window.max_requests(),
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Claim a slot only if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.try_admit().is_ok()
    }

    /// Number of admissions inside the trailing window.
    pub fn current_usage(&self) -> usize {
        let now = Instant::now();
        self.log.lock().usage_at(&self.window, now)
    }

    /// How long until `acquire` would admit without waiting.
    pub fn time_until_next_slot(&self) -> Duration {
        let now = Instant::now();
        self.log.lock().wait_at(&self.window, now)
    }

    /// Get the admission budget per window.
    pub fn max_requests(&self) -> u64 {
        self.window.max_requests()
    }

    /// Get the window length.
    pub fn time_window(&self) -> Duration {
        self.window.time_window()
    }

    /// Capture usage and wait time under a single lock.
    pub fn snapshot(&self) -> UsageSnapshot {
        let now = Instant::now();
        let (usage, wait) = {
            let log = self.log.lock();
            (log.usage_at(&self.window, now), log.wait_at(&self.window, now))
        };

        UsageSnapshot {
            max_requests: self.window.max_requests(),
            time_window_secs: self.window.time_window().as_secs_f64(),
            current_usage: usage,
            remaining: self.window.max_requests().saturating_sub(usage as u64),
            wait_secs: wait.as_secs_f64(),
        }
    }

    fn try_admit(&self) -> std::result::Result<(), Duration> {
        let mut log = self.log.lock();
        let now = Instant::now();
        let admitted = log.try_admit(&self.window, now);

        if admitted.is_ok() {
            trace!(
                in_window = log.len(),
                max_requests = self.window.max_requests(),
                "Request admitted"
            );
        }
        admitted
    }
}

impl std::fmt::Debug for AsyncRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRateLimiter")
            .field("max_requests", &self.window.max_requests())
            .field("time_window", &self.window.time_window())
            .finish()
    }
}

#[async_trait]
impl Throttle for AsyncRateLimiter {
    async fn acquire(&self) {
        AsyncRateLimiter::acquire(self).await
    }

    fn current_usage(&self) -> usize {
        AsyncRateLimiter::current_usage(self)
    }

    fn time_until_next_slot(&self) -> Duration {
        AsyncRateLimiter::time_until_next_slot(self)
    }
}
