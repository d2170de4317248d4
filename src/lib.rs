//! SEO Throttle - Sliding-Window Admission Control
//!
//! This crate gates outbound calls to rate-limited SEO data APIs. Each
//! [`ratelimit::AsyncRateLimiter`] admits at most `max_requests` calls in any
//! trailing `time_window`, suspending callers until a slot frees up. A
//! [`ratelimit::LimiterRegistry`] keeps one limiter per service and account.

pub mod config;
pub mod error;
pub mod ratelimit;
