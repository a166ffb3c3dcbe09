//! Single-flight request coordination
//!
//! One [`RequestCoordinator`] owns all per-key state:
//! - `pending`: keys admitted whose run is not yet registered as active
//! - `active`: keys with a run in progress, mapped to its shared outcome
//! - `recent`: successful outcomes, answered again until the TTL runs out
//!
//! Admission checks and the pending insert happen under one lock, so two callers can never both
//! decide to lead the same key. A caller that finds the key pending yields and re-admits; the
//! window is the time it takes the leader to build its future.
//!
//! Runs are spawned and always complete, even if every caller goes away. Every caller of a
//! coalesced run receives a clone of the same outcome value.

use crate::error::AnalysisError;
use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::types::RequestKey;

/// Outcome future shared by every caller of one run
pub type SharedOutcome<T> = Shared<BoxFuture<'static, Result<T, AnalysisError>>>;

struct ActiveEntry<T: Clone> {
    generation: u64,
    outcome: SharedOutcome<T>,
}

struct Registry<T: Clone> {
    pending: HashSet<RequestKey>,
    active: HashMap<RequestKey, ActiveEntry<T>>,
    recent: HashMap<RequestKey, (Instant, T)>,
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self {
            pending: HashSet::new(),
            active: HashMap::new(),
            recent: HashMap::new(),
        }
    }
}

enum Admission<T: Clone> {
    /// Attach to an existing or already-resolved outcome
    Joined(SharedOutcome<T>),
    /// Another caller is between admission and launch
    Busy,
    /// This caller runs the operation
    Lead,
}

/// Registry sizes, for health reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub pending: usize,
    pub active: usize,
    pub recent: usize,
}

/// Coalesces concurrent identical requests into one execution
pub struct RequestCoordinator<T: Clone + Send + Sync + 'static> {
    registry: Arc<Mutex<Registry<T>>>,
    recent_ttl: Duration,
    next_generation: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> RequestCoordinator<T> {
    /// Create a coordinator
    ///
    /// # Arguments
    /// * `recent_ttl` - How long a successful outcome answers repeat requests
    pub fn new(recent_ttl: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            recent_ttl,
            next_generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a request for `key`
    ///
    /// Without `force_override` the caller joins an active run or a recent success when one
    /// exists. Otherwise `operation` is invoked once and its future runs to completion on its
    /// own task; callers arriving meanwhile share it.
    ///
    /// With `force_override` active and recent entries are ignored. An active run for the key is
    /// superseded: its existing callers still receive its result, new callers join the forced
    /// run.
    pub async fn admit<F, Fut>(
        &self,
        key: RequestKey,
        force_override: bool,
        operation: F,
    ) -> Result<T, AnalysisError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, AnalysisError>> + Send + 'static,
    {
        loop {
            match self.try_admit(&key, force_override) {
                Admission::Joined(outcome) => {
                    debug!(key = %key, "Joined existing outcome");
                    return outcome.await;
                }
                Admission::Busy => tokio::task::yield_now().await,
                Admission::Lead => break,
            }
        }

        let slot = PendingSlot {
            registry: &self.registry,
            key: Some(key),
        };
        let run = operation();
        let outcome = self.launch(slot, run);
        outcome.await
    }

    fn try_admit(&self, key: &RequestKey, force_override: bool) -> Admission<T> {
        let mut registry = self.lock();

        if registry.pending.contains(key) {
            return Admission::Busy;
        }

        if force_override {
            if registry.active.remove(key).is_some() {
                info!(key = %key, "Forced request supersedes active run");
            }
        } else {
            if let Some(entry) = registry.active.get(key) {
                return Admission::Joined(entry.outcome.clone());
            }

            let expired = match registry.recent.get(key) {
                Some((completed_at, value)) if completed_at.elapsed() < self.recent_ttl => {
                    let ready = futures::future::ready(Ok(value.clone())).boxed().shared();
                    return Admission::Joined(ready);
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                debug!(key = %key, "Recent outcome expired");
                registry.recent.remove(key);
            }
        }

        registry.pending.insert(key.clone());
        Admission::Lead
    }

    fn launch<Fut>(&self, mut slot: PendingSlot<'_, T>, run: Fut) -> SharedOutcome<T>
    where
        Fut: Future<Output = Result<T, AnalysisError>> + Send + 'static,
    {
        let Some(key) = slot.key.take() else {
            return futures::future::ready(Err(AnalysisError::Aborted(
                "admission slot already released".to_string(),
            )))
            .boxed()
            .shared();
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel::<Result<T, AnalysisError>>();
        let label = key.to_string();
        let outcome: SharedOutcome<T> = rx
            .map(move |received| {
                received.unwrap_or_else(|_| {
                    Err(AnalysisError::Aborted(format!(
                        "run for {} ended without a result",
                        label
                    )))
                })
            })
            .boxed()
            .shared();

        {
            let mut registry = self.lock();
            registry.pending.remove(&key);
            assert!(
                !registry.active.contains_key(&key),
                "request {} is both pending and active",
                key
            );
            registry.active.insert(
                key.clone(),
                ActiveEntry {
                    generation,
                    outcome: outcome.clone(),
                },
            );
        }

        info!(key = %key, generation, "Starting run");

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let mut settle = Settle {
                registry,
                key,
                generation,
                success: None,
            };

            let result = run.await;
            match &result {
                Ok(value) => settle.success = Some(value.clone()),
                Err(e) => warn!(key = %settle.key, error = %e, "Run failed"),
            }
            drop(settle);

            // Receivers may all be gone; the registry is already settled
            let _ = tx.send(result);
        });

        outcome
    }

    /// Drop recent outcomes for `date` under every provider
    ///
    /// # Returns
    /// Number of entries removed
    pub fn forget(&self, date: NaiveDate) -> usize {
        let mut registry = self.lock();
        let before = registry.recent.len();
        registry.recent.retain(|key, _| key.date != date);
        before - registry.recent.len()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let registry = self.lock();
        CoordinatorStats {
            pending: registry.pending.len(),
            active: registry.active.len(),
            recent: registry.recent.len(),
        }
    }
}

/// Releases a pending claim if the caller unwinds before launch
struct PendingSlot<'a, T: Clone> {
    registry: &'a Mutex<Registry<T>>,
    key: Option<RequestKey>,
}

impl<T: Clone> Drop for PendingSlot<'_, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.pending.remove(&key);
        }
    }
}

/// Settles the registry when a run ends, including by panic
struct Settle<T: Clone> {
    registry: Arc<Mutex<Registry<T>>>,
    key: RequestKey,
    generation: u64,
    success: Option<T>,
}

impl<T: Clone> Drop for Settle<T> {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);

        let current = registry
            .active
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation);
        if !current {
            // Superseded by a forced run
            return;
        }

        registry.active.remove(&self.key);
        if let Some(value) = self.success.take() {
            registry
                .recent
                .insert(self.key.clone(), (Instant::now(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn key(provider: &str) -> RequestKey {
        RequestKey::new(NaiveDate::from_ymd_opt(2024, 4, 20).unwrap(), provider)
    }

    #[tokio::test]
    async fn test_failure_is_not_remembered() {
        let coordinator = RequestCoordinator::<u32>::new(Duration::from_secs(300));

        let first = coordinator
            .admit(key("p"), false, || async {
                Err(AnalysisError::Aborted("boom".to_string()))
            })
            .await;
        assert!(first.is_err());
        assert_eq!(coordinator.stats(), CoordinatorStats::default());

        let second = coordinator.admit(key("p"), false, || async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
        assert_eq!(coordinator.stats().recent, 1);
    }

    #[tokio::test]
    async fn test_panicking_run_reports_aborted_and_clears_active() {
        let coordinator = RequestCoordinator::<u32>::new(Duration::from_secs(300));

        let result = coordinator
            .admit(key("p"), false, || async {
                if key("p").provider == "p" {
                    panic!("run exploded");
                }
                Ok(0)
            })
            .await;

        assert!(matches!(result, Err(AnalysisError::Aborted(_))));
        assert_eq!(coordinator.stats(), CoordinatorStats::default());
    }

    #[tokio::test]
    async fn test_providers_are_independent_keys() {
        let coordinator = RequestCoordinator::<u32>::new(Duration::from_secs(300));
        let calls = Arc::new(AtomicUsize::new(0));

        for provider in ["a", "b"] {
            let calls = Arc::clone(&calls);
            coordinator
                .admit(key(provider), false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.stats().recent, 2);
    }

    #[tokio::test]
    async fn test_forget_only_touches_one_date() {
        let coordinator = RequestCoordinator::<u32>::new(Duration::from_secs(300));
        let other = RequestKey::new(NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(), "a");

        coordinator.admit(key("a"), false, || async { Ok(1) }).await.unwrap();
        coordinator.admit(key("b"), false, || async { Ok(2) }).await.unwrap();
        coordinator.admit(other, false, || async { Ok(3) }).await.unwrap();

        assert_eq!(coordinator.forget(key("a").date), 2);
        assert_eq!(coordinator.stats().recent, 1);
    }
}
