//! Registry holding one limiter per rate-limited resource.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::key::LimiterKey;
use super::limiter::{AsyncRateLimiter, UsageSnapshot};
use super::rules::{find_rule, LimitRule};
use super::window::RateWindow;
use crate::config::ThrottleConfig;
use crate::error::Result;

/// Lazily creates and hands out shared limiters, one per [`LimiterKey`].
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct LimiterRegistry {
    /// Limiters indexed by resource key
    limiters: DashMap<LimiterKey, Arc<AsyncRateLimiter>>,
    /// Configured per-resource limits
    rules: Vec<LimitRule>,
    /// Budget for keys no rule matches
    default_window: RateWindow,
}

impl LimiterRegistry {
    /// Create a registry with a fallback window and per-resource rules.
    pub fn new(default_window: RateWindow, rules: Vec<LimitRule>) -> Self {
        Self {
            limiters: DashMap::new(),
            rules,
            default_window,
        }
    }

    /// Create a registry from loaded configuration.
    pub fn from_config(config: &ThrottleConfig) -> Result<Self> {
        Ok(Self::new(config.default_window()?, config.limits.clone()))
    }

    /// Get the limiter for `key`, creating it on first use.
    pub fn limiter(&self, key: &LimiterKey) -> Result<Arc<AsyncRateLimiter>> {
        if let Some(limiter) = self.limiters.get(key) {
            return Ok(limiter.clone());
        }

        let window = self.window_for(key)?;
        let limiter = self
            .limiters
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(
                    key = %key,
                    max_requests = window.max_requests(),
                    time_window = ?window.time_window(),
                    "Creating new rate limiter"
                );
                Arc::new(AsyncRateLimiter::with_window(window))
            })
            .clone();

        Ok(limiter)
    }

    /// Wait for a slot on the limiter for `key`.
    pub async fn acquire(&self, key: &LimiterKey) -> Result<()> {
        let limiter = self.limiter(key)?;
        limiter.acquire().await;
        Ok(())
    }

    /// Get a usage snapshot for `key`.
    ///
    /// Returns `None` if no limiter exists for the key yet.
    pub fn usage(&self, key: &LimiterKey) -> Option<UsageSnapshot> {
        self.limiters.get(key).map(|l| l.snapshot())
    }

    /// Usage snapshots for every live limiter, sorted by key.
    pub fn snapshots(&self) -> Vec<(LimiterKey, UsageSnapshot)> {
        let mut snapshots: Vec<_> = self
            .limiters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }

    /// Resolve the window a new limiter for `key` would get.
    pub fn window_for(&self, key: &LimiterKey) -> Result<RateWindow> {
        match find_rule(&self.rules, key) {
            Some(rule) => rule.window(),
            None => Ok(self.default_window),
        }
    }

    /// Get the number of live limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether no limiter has been created yet.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Drop all limiters, resetting every budget.
    pub fn clear(&self) {
        self.limiters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThrottleError;
    use crate::ratelimit::TimeUnit;
    use std::time::Duration;

    fn rule(service: &str, account: Option<&str>, max_requests: u64) -> LimitRule {
        LimitRule {
            service: service.to_string(),
            account: account.map(str::to_string),
            max_requests,
            time_window_secs: None,
            unit: Some(TimeUnit::Minute),
            name: None,
        }
    }

    fn registry(rules: Vec<LimitRule>) -> LimiterRegistry {
        let default_window = RateWindow::new(100, Duration::from_secs(60)).unwrap();
        LimiterRegistry::new(default_window, rules)
    }

    #[test]
    fn test_registry_creation() {
        let registry = registry(Vec::new());
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_same_key_shares_limiter() {
        let registry = registry(Vec::new());
        let key = LimiterKey::new("serp", "alice");

        let first = registry.limiter(&key).unwrap();
        let second = registry.limiter(&key).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_limiter_uses_matching_rule() {
        let registry = registry(vec![
            rule("serp", None, 10),
            rule("serp", Some("premium"), 1000),
        ]);

        let basic = registry.limiter(&LimiterKey::new("serp", "basic")).unwrap();
        let premium = registry.limiter(&LimiterKey::new("serp", "premium")).unwrap();
        let other = registry.limiter(&LimiterKey::new("backlinks", "basic")).unwrap();

        assert_eq!(basic.max_requests(), 10);
        assert_eq!(premium.max_requests(), 1000);
        assert_eq!(other.max_requests(), 100);
        assert_eq!(other.time_window(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_rule_is_reported_on_lookup() {
        let registry = registry(vec![rule("serp", None, 0)]);

        let err = registry.limiter(&LimiterKey::new("serp", "alice")).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidConfiguration(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accounts_have_separate_budgets() {
        let registry = registry(vec![rule("serp", None, 2)]);
        let alice = LimiterKey::new("serp", "alice");
        let bob = LimiterKey::new("serp", "bob");

        registry.acquire(&alice).await.unwrap();
        registry.acquire(&alice).await.unwrap();
        registry.acquire(&bob).await.unwrap();

        assert_eq!(registry.usage(&alice).unwrap().current_usage, 2);
        assert_eq!(registry.usage(&bob).unwrap().current_usage, 1);
        assert!(registry.usage(&LimiterKey::new("serp", "carol")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_sorted_by_key() {
        let registry = registry(Vec::new());
        registry.acquire(&LimiterKey::new("serp", "zed")).await.unwrap();
        registry.acquire(&LimiterKey::new("backlinks", "amy")).await.unwrap();

        let snapshots = registry.snapshots();
        let keys: Vec<String> = snapshots.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["backlinks:amy", "serp:zed"]);
        assert!(snapshots.iter().all(|(_, s)| s.current_usage == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_budgets() {
        let registry = registry(vec![rule("serp", None, 1)]);
        let key = LimiterKey::new("serp", "alice");

        registry.acquire(&key).await.unwrap();
        let limiter = registry.limiter(&key).unwrap();
        assert_eq!(limiter.time_until_next_slot(), Duration::from_secs(60));

        registry.clear();
        assert!(registry.is_empty());

        let limiter = registry.limiter(&key).unwrap();
        assert!(limiter.try_acquire());
    }
}
