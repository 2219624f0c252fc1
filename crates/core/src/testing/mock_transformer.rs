//! Mock transformer for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::artifact::ArtifactHandle;
use crate::pipeline::{
    ImageBytes, PipelineConfiguration, TransformError, TransformOutput, Transformer,
};

/// Mock implementation of the Transformer trait.
///
/// Provides controllable behavior for testing:
/// - Simulated latency per call
/// - Failures for specific inputs, keyed by their exact bytes
/// - A gate that parks every call until opened
/// - Bookkeeping of produced artifacts and peak concurrency
///
/// Artifacts are fake handles under `/mock/artifacts`; nothing is written.
#[derive(Debug)]
pub struct MockTransformer {
    delay: Mutex<Duration>,
    failures: Mutex<HashMap<Vec<u8>, String>>,
    gate: watch::Sender<bool>,
    produced: Mutex<Vec<ArtifactHandle>>,
    next_artifact: AtomicU64,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl Default for MockTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransformer {
    /// Create a new mock transformer: no delay, no failures, gate open.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            delay: Mutex::new(Duration::ZERO),
            failures: Mutex::new(HashMap::new()),
            gate,
            produced: Mutex::new(Vec::new()),
            next_artifact: AtomicU64::new(1),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
        }
    }

    /// Set the simulated duration of every call.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    /// Fail every call whose input equals `bytes` with `message`.
    pub fn fail_on(&self, bytes: impl Into<Vec<u8>>, message: impl Into<String>) {
        lock(&self.failures).insert(bytes.into(), message.into());
    }

    /// Park every call until [`open_gate`](Self::open_gate).
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Number of calls started.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// Every artifact handed out so far.
    pub fn produced(&self) -> Vec<ArtifactHandle> {
        lock(&self.produced).clone()
    }

    pub fn produced_count(&self) -> usize {
        lock(&self.produced).len()
    }

    /// Wait until at least `n` calls have started. Returns `false` on timeout.
    pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.call_count() < n {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        true
    }

    async fn pass_gate(&self) {
        let mut open = self.gate.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = open.wait_for(|open| *open).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrements the active-call counter when a call ends or is dropped.
struct ActiveCall<'a>(&'a AtomicUsize);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transformer for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transform(
        &self,
        image: ImageBytes,
        config: &PipelineConfiguration,
    ) -> Result<TransformOutput, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveCall(&self.active);
        self.peak_active.fetch_max(now_active, Ordering::SeqCst);

        self.pass_gate().await;

        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = lock(&self.failures).get(image.as_ref()) {
            return Err(TransformError::Other(message.clone()));
        }

        let n = self.next_artifact.fetch_add(1, Ordering::SeqCst);
        let format = config.effective_format();
        let artifact = ArtifactHandle::new(format!("/mock/artifacts/{}.{}", n, format.extension()));
        lock(&self.produced).push(artifact.clone());

        Ok(TransformOutput {
            artifact,
            width: 100,
            height: 100,
            size_bytes: image.len() as u64,
        })
    }
}
