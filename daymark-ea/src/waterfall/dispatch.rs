//! Rate-limited search dispatch
//!
//! Every external search call goes through one shared [`RateLimitedClient`]. Two limits apply
//! independently:
//! - at most `max_in_flight` calls execute at once (semaphore permit held for the whole call)
//! - consecutive dispatch starts are spaced at least `min_interval` apart (GCRA limiter, burst 1)
//!
//! Failures never reach the caller. A failed call is logged and replaced by an empty result, so
//! "provider down" and "nothing found" look the same to the waterfall and both escalate.

use crate::error::CapabilityError;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Calls started
    pub dispatched: u64,
    /// Calls whose error was converted to an empty result
    pub degraded: u64,
    /// Calls currently executing
    pub in_flight: usize,
    /// Concurrency bound
    pub max_in_flight: usize,
}

/// Throttled, bounded-concurrency wrapper around external calls
pub struct RateLimitedClient {
    slots: Arc<Semaphore>,
    max_in_flight: usize,
    /// `None` when no minimum spacing is configured
    limiter: Option<DirectLimiter>,
    dispatched: AtomicU64,
    degraded: AtomicU64,
    in_flight: AtomicUsize,
}

impl RateLimitedClient {
    /// Create a dispatcher
    ///
    /// # Arguments
    /// * `max_in_flight` - Concurrency bound (values below 1 are raised to 1)
    /// * `min_interval` - Minimum spacing between dispatch starts (zero disables spacing)
    pub fn new(max_in_flight: usize, min_interval: Duration) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let limiter = Quota::with_period(min_interval).map(RateLimiter::direct);

        Self {
            slots: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            limiter,
            dispatched: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Run `call` once a slot and the spacing timer allow it
    ///
    /// # Arguments
    /// * `label` - Short description for logs
    /// * `call` - External call; invoked exactly once, never retried
    ///
    /// # Returns
    /// The call's value, or `T::default()` if it failed
    pub async fn dispatch<T, F, Fut>(&self, label: &str, call: F) -> T
    where
        T: Default,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        // Semaphore is never closed
        let _permit = match self.slots.acquire().await {
            Ok(permit) => permit,
            Err(_) => return T::default(),
        };

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let _in_flight = InFlightGuard::enter(&self.in_flight);
        debug!(label = %label, "Dispatching external call");

        match call().await {
            Ok(value) => value,
            Err(e) => {
                self.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(label = %label, error = %e, "External call failed, treating as empty result");
                T::default()
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            max_in_flight: self.max_in_flight,
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
