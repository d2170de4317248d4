//! Sliding window configuration and the request log it bounds.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{Result, ThrottleError};

/// Named time unit for a rate limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeUnit {
    /// Get the duration of this time unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

/// The immutable admission budget: at most `max_requests` per `time_window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    max_requests: u64,
    time_window: Duration,
}

impl RateWindow {
    /// Create a validated window.
    ///
    /// Fails with [`ThrottleError::InvalidConfiguration`] if either value is zero.
    pub fn new(max_requests: u64, time_window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(ThrottleError::InvalidConfiguration(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if time_window.is_zero() {
            return Err(ThrottleError::InvalidConfiguration(
                "time_window must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_requests,
            time_window,
        })
    }

    /// Create a window from a length in (possibly fractional) seconds.
    pub fn from_secs_f64(max_requests: u64, time_window_secs: f64) -> Result<Self> {
        if !time_window_secs.is_finite() || time_window_secs <= 0.0 {
            return Err(ThrottleError::InvalidConfiguration(format!(
                "time_window must be a positive number of seconds, got {}",
                time_window_secs
            )));
        }
        let time_window = Duration::try_from_secs_f64(time_window_secs).map_err(|e| {
            ThrottleError::InvalidConfiguration(format!(
                "time_window of {} seconds is out of range: {}",
                time_window_secs, e
            ))
        })?;
        Self::new(max_requests, time_window)
    }

    /// Create a window spanning one `unit`.
    pub fn per_unit(max_requests: u64, unit: TimeUnit) -> Result<Self> {
        Self::new(max_requests, unit.duration())
    }

    /// Maximum admissions per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Length of the sliding window.
    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    fn is_expired(&self, admitted_at: Instant, now: Instant) -> bool {
        now.duration_since(admitted_at) >= self.time_window
    }
}

/// Admission timestamps, oldest first.
///
/// Entries are appended with a `now` sampled under the owning lock, so the
/// log stays sorted and pruning only ever pops from the front.
#[derive(Debug, Default)]
pub struct RequestLog {
    entries: VecDeque<Instant>,
}

impl RequestLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry that has aged out of the window.
    pub fn prune(&mut self, window: &RateWindow, now: Instant) {
        while let Some(&front) = self.entries.front() {
            if !window.is_expired(front, now) {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// Prune, then record an admission at `now` if the budget allows it.
    ///
    /// On rejection returns how long until the oldest remaining entry expires.
    pub fn try_admit(
        &mut self,
        window: &RateWindow,
        now: Instant,
    ) -> std::result::Result<(), Duration> {
        self.prune(window, now);

        if (self.entries.len() as u64) < window.max_requests() {
            self.entries.push_back(now);
            return Ok(());
        }

        Err(self.wait_from_oldest(window, now))
    }

    /// Count the entries still inside the window without pruning.
    pub fn usage_at(&self, window: &RateWindow, now: Instant) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|&&t| !window.is_expired(t, now))
            .count()
    }

    /// Time until a slot frees up, or zero if one is free now.
    pub fn wait_at(&self, window: &RateWindow, now: Instant) -> Duration {
        if (self.usage_at(window, now) as u64) < window.max_requests() {
            return Duration::ZERO;
        }
        self.wait_from_oldest(window, now)
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn wait_from_oldest(&self, window: &RateWindow, now: Instant) -> Duration {
        self.entries
            .iter()
            .find(|&&t| !window.is_expired(t, now))
            .map(|&oldest| window.time_window().saturating_sub(now.duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}
