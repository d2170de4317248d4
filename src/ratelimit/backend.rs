//! Throttle trait for abstracting over admission gates.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Trait for admission gates that outbound API clients wait on.
///
/// This is the whole contract a client has with its limiter: wait for a
/// slot, and optionally look at how busy the gate is.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Suspend until a request may be sent, recording it as sent.
    async fn acquire(&self);

    /// Number of requests admitted in the current window.
    fn current_usage(&self) -> usize;

    /// Time until the next request would be admitted without waiting.
    fn time_until_next_slot(&self) -> Duration;
}

/// Wait for admission through `gate`, then run `call`.
pub async fn throttled<G, F, Fut>(gate: &G, call: F) -> Fut::Output
where
    G: Throttle + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future,
{
    gate.acquire().await;
    call().await
}
