//! Rate limiting logic and state management.

mod backend;
mod key;
mod limiter;
mod registry;
mod rules;
mod window;

pub use backend::{throttled, Throttle};
pub use key::LimiterKey;
pub use limiter::{AsyncRateLimiter, UsageSnapshot};
pub use registry::LimiterRegistry;
pub use rules::{find_rule, LimitRule};
pub use window::{RateWindow, RequestLog, TimeUnit};
