//! Per-resource limit rules and matching.
//!
//! Rules are matched against a [`LimiterKey`]. A rule naming an account is
//! more specific than one that only names the service, and among equally
//! specific rules the last one declared wins.

use serde::{Deserialize, Serialize};

use super::key::LimiterKey;
use super::window::{RateWindow, TimeUnit};
use crate::error::{Result, ThrottleError};

/// A configured limit for one service, optionally narrowed to one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitRule {
    /// The service to match
    pub service: String,
    /// Optional account to match (if not set, matches any account)
    #[serde(default)]
    pub account: Option<String>,
    /// Number of requests allowed per window
    pub max_requests: u64,
    /// Window length in seconds
    #[serde(default)]
    pub time_window_secs: Option<f64>,
    /// Window length as a named unit
    #[serde(default)]
    pub unit: Option<TimeUnit>,
    /// Optional name/description for this limit
    #[serde(default)]
    pub name: Option<String>,
}

impl LimitRule {
    /// Build the validated window this rule describes.
    pub fn window(&self) -> Result<RateWindow> {
        match (self.time_window_secs, self.unit) {
            (Some(secs), None) => RateWindow::from_secs_f64(self.max_requests, secs),
            (None, Some(unit)) => RateWindow::per_unit(self.max_requests, unit),
            (Some(_), Some(_)) => Err(ThrottleError::InvalidConfiguration(format!(
                "limit for service '{}' sets both time_window_secs and unit",
                self.service
            ))),
            (None, None) => Err(ThrottleError::InvalidConfiguration(format!(
                "limit for service '{}' needs time_window_secs or unit",
                self.service
            ))),
        }
    }

    fn matches(&self, key: &LimiterKey) -> bool {
        if self.service != key.service {
            return false;
        }
        match &self.account {
            Some(account) => account == &key.account,
            None => true,
        }
    }
}

/// Find the most specific rule for `key`.
pub fn find_rule<'a>(rules: &'a [LimitRule], key: &LimiterKey) -> Option<&'a LimitRule> {
    let mut best_match: Option<&LimitRule> = None;

    for rule in rules.iter().filter(|r| r.matches(key)) {
        let replaces = match best_match {
            Some(best) => rule.account.is_some() || best.account.is_none(),
            None => true,
        };
        if replaces {
            best_match = Some(rule);
        }
    }

    best_match
}
