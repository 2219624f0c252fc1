//! Resource sampler with last-good caching and scoped polling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SamplerConfig;
use super::source::MetricsSource;
use super::types::SystemSnapshot;
use crate::metrics::{CPU_UTILIZATION, RECOMMENDED_CONCURRENCY};

struct PollTask {
    id: u64,
    handle: JoinHandle<()>,
}

/// Caches host readings and derives the recommended worker count.
pub struct ResourceSampler {
    config: SamplerConfig,
    source: Arc<dyn MetricsSource>,
    latest: RwLock<SystemSnapshot>,
    has_sample: AtomicBool,
    poll_task: Mutex<Option<PollTask>>,
    next_poll_id: AtomicU64,
}

impl ResourceSampler {
    /// Creates a sampler; until the first successful sample it assumes an
    /// idle host with the configured fallback core count.
    pub fn new(config: SamplerConfig, source: Arc<dyn MetricsSource>) -> Self {
        let initial = SystemSnapshot::assume_idle(config.fallback_cores());
        RECOMMENDED_CONCURRENCY.set(initial.recommended_concurrency() as i64);
        Self {
            config,
            source,
            latest: RwLock::new(initial),
            has_sample: AtomicBool::new(false),
            poll_task: Mutex::new(None),
            next_poll_id: AtomicU64::new(1),
        }
    }

    /// Last known reading (never blocks on the host).
    pub fn latest(&self) -> SystemSnapshot {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether at least one sample has succeeded.
    pub fn has_sample(&self) -> bool {
        self.has_sample.load(Ordering::Acquire)
    }

    /// Recommended worker count from the last known reading.
    pub fn recommended_concurrency(&self) -> usize {
        self.latest().recommended_concurrency()
    }

    /// Samples the host now.
    ///
    /// On failure the previous reading is kept and returned, so callers
    /// always get a usable value.
    pub async fn sample(&self) -> SystemSnapshot {
        match self.source.sample_system_info().await {
            Ok(snapshot) => {
                debug!(
                    cores = snapshot.core_count,
                    cpu = snapshot.cpu_utilization_percent,
                    "Sampled host resources"
                );
                CPU_UTILIZATION.set(snapshot.cpu_utilization_percent as f64);
                RECOMMENDED_CONCURRENCY.set(snapshot.recommended_concurrency() as i64);
                *self.latest.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
                self.has_sample.store(true, Ordering::Release);
                snapshot
            }
            Err(e) => {
                warn!("Resource sampling via {} failed: {}", self.source.name(), e);
                self.latest()
            }
        }
    }

    /// Starts re-sampling on the configured interval.
    ///
    /// At most one polling task is live: starting again replaces the previous
    /// task. Polling stops when the returned guard is dropped or
    /// [`ResourceSampler::stop_polling`] is called.
    pub fn start_polling(self: &Arc<Self>) -> PollingGuard {
        let id = self.next_poll_id.fetch_add(1, Ordering::Relaxed);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let sampler = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                sampler.sample().await;
            }
        });

        if let Some(previous) = self.poll_slot().replace(PollTask { id, handle }) {
            previous.handle.abort();
            debug!("Replaced previous polling task");
        }
        info!(interval_ms = interval.as_millis() as u64, "Resource polling started");

        PollingGuard {
            sampler: Arc::downgrade(self),
            id,
        }
    }

    /// Stops polling if it is running. Safe to call repeatedly.
    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_slot().take() {
            task.handle.abort();
            info!("Resource polling stopped");
        }
    }

    /// Whether a polling task is live.
    pub fn is_polling(&self) -> bool {
        self.poll_slot()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn stop_polling_if(&self, id: u64) {
        let mut slot = self.poll_slot();
        if slot.as_ref().is_some_and(|task| task.id == id) {
            if let Some(task) = slot.take() {
                task.handle.abort();
                debug!("Resource polling stopped by guard");
            }
        }
    }

    fn poll_slot(&self) -> MutexGuard<'_, Option<PollTask>> {
        self.poll_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scope of one polling session; dropping it stops that session.
///
/// A guard only stops the session it started, so a stale guard dropped after
/// polling was restarted leaves the newer session running.
#[must_use = "polling stops when the guard is dropped"]
pub struct PollingGuard {
    sampler: std::sync::Weak<ResourceSampler>,
    id: u64,
}

impl PollingGuard {
    /// Stops the session explicitly.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollingGuard {
    fn drop(&mut self) {
        if let Some(sampler) = self.sampler.upgrade() {
            sampler.stop_polling_if(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMetricsSource;

    fn sampler(source: &Arc<MockMetricsSource>) -> Arc<ResourceSampler> {
        Arc::new(ResourceSampler::new(
            SamplerConfig::default()
                .with_fallback_core_count(8)
                .with_poll_interval_ms(10),
            Arc::clone(source) as Arc<dyn MetricsSource>,
        ))
    }

    #[tokio::test]
    async fn test_defaults_before_first_sample() {
        let source = Arc::new(MockMetricsSource::new());
        let sampler = sampler(&source);
        assert!(!sampler.has_sample());
        assert_eq!(sampler.latest().core_count, 8);
        assert_eq!(sampler.recommended_concurrency(), 5);
    }

    #[tokio::test]
    async fn test_sample_updates_latest() {
        let source = Arc::new(MockMetricsSource::new());
        source.push_sample(8, 40.0);
        let sampler = sampler(&source);

        let snapshot = sampler.sample().await;
        assert_eq!(snapshot.cpu_utilization_percent, 40.0);
        assert!(sampler.has_sample());
        assert_eq!(sampler.recommended_concurrency(), 4);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_value() {
        let source = Arc::new(MockMetricsSource::new());
        source.push_sample(16, 10.0);
        source.push_failure("sensor offline");
        let sampler = sampler(&source);

        sampler.sample().await;
        let after_failure = sampler.sample().await;
        assert_eq!(after_failure.core_count, 16);
        assert_eq!(sampler.recommended_concurrency(), 11);
    }

    #[tokio::test]
    async fn test_failure_without_history_uses_default() {
        let source = Arc::new(MockMetricsSource::new());
        source.push_failure("nope");
        let sampler = sampler(&source);

        let snapshot = sampler.sample().await;
        assert_eq!(snapshot.core_count, 8);
        assert_eq!(snapshot.cpu_utilization_percent, 0.0);
        assert!(!sampler.has_sample());
    }

    #[tokio::test]
    async fn test_polling_start_stop_is_idempotent() {
        let source = Arc::new(MockMetricsSource::new());
        source.set_default_sample(8, 10.0);
        let sampler = sampler(&source);

        let first = sampler.start_polling();
        let second = sampler.start_polling();
        assert!(sampler.is_polling());

        // The replaced session's guard must not stop the live one.
        drop(first);
        assert!(sampler.is_polling());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(source.sample_count() >= 1);

        second.stop();
        assert!(!sampler.is_polling());

        sampler.stop_polling();
        sampler.stop_polling();
        assert!(!sampler.is_polling());

        let count = source.sample_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.sample_count(), count);
    }
}
