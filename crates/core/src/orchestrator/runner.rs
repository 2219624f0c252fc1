//! Processing orchestrator implementation.
//!
//! A run is a fixed queue of item ids drained by N workers. Each worker:
//! 1. pops the next item (exits when the queue is empty)
//! 2. stops if its run went stale
//! 3. claims the item as `processing`
//! 4. awaits the transformer
//! 5. commits `done`/`error`, unless the run went stale meanwhile
//!
//! Steps 3 and 5 are conditional store writes: the staleness check happens
//! under the store's write lock, so a cancel or a newer run can never be
//! overwritten by late work.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactReleaser;
use crate::item::{ItemId, ItemPatch, ItemStore, ProcessedArtifact, UpdateOutcome};
use crate::metrics;
use crate::pipeline::{normalize_failure_message, ImageBytes, PipelineConfiguration, Transformer};
use crate::sampler::ResourceSampler;

use super::config::ProcessorConfig;
use super::controller::{RunController, RunToken};
use super::types::{OrchestratorError, OrchestratorStatus, RunOutcome, RunSummary};

/// The processing orchestrator - runs batches of items through a transformer.
pub struct ProcessingOrchestrator {
    config: ProcessorConfig,
    store: Arc<ItemStore>,
    transformer: Arc<dyn Transformer>,
    releaser: Arc<dyn ArtifactReleaser>,
    sampler: Arc<ResourceSampler>,
    controller: Arc<RunController>,
    /// Serializes run transitions (start, cancel, reconcile) against each
    /// other. Never held across an await.
    transitions: Arc<Mutex<()>>,
}

impl ProcessingOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: ProcessorConfig,
        store: Arc<ItemStore>,
        transformer: Arc<dyn Transformer>,
        releaser: Arc<dyn ArtifactReleaser>,
        sampler: Arc<ResourceSampler>,
    ) -> Self {
        Self {
            config,
            store,
            transformer,
            releaser,
            sampler,
            controller: Arc::new(RunController::new()),
            transitions: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            busy: self.controller.is_busy(),
            generation: self.controller.generation(),
            cancelled: self.controller.is_cancelled(),
            recommended_concurrency: self.sampler.recommended_concurrency(),
            counts: self.store.status_counts(),
        }
    }

    /// Processes the current selection, or every item when nothing is
    /// selected, with the store's current pipeline configuration.
    pub fn process_selection(&self) -> Result<RunHandle, OrchestratorError> {
        let targets = self.store.target_ids();
        let pipeline = self.store.pipeline_configuration();
        self.start_run(&targets, pipeline)
    }

    /// Starts a run over `targets` with a snapshot of `pipeline`.
    ///
    /// Every target is marked `pending` before this returns. Unknown ids and
    /// duplicates are skipped. Must be called from within a tokio runtime.
    pub fn start_run(
        &self,
        targets: &[ItemId],
        pipeline: PipelineConfiguration,
    ) -> Result<RunHandle, OrchestratorError> {
        let targets = dedupe(targets);
        if targets.iter().all(|id| self.store.get(id).is_none()) {
            return Err(OrchestratorError::EmptyTargets);
        }

        let (token, queue) = {
            let _transition = self.lock_transitions();

            let token = self
                .controller
                .begin()
                .map_err(|generation| OrchestratorError::RunInProgress { generation })?;

            let marked = self.store.mark_pending(&targets);
            if marked.is_empty() {
                self.controller.finish(token.generation());
                return Err(OrchestratorError::EmptyTargets);
            }

            let queue: VecDeque<QueuedItem> = marked
                .into_iter()
                .map(|item| QueuedItem {
                    id: item.id,
                    original: item.original,
                })
                .collect();
            (token, queue)
        };

        let target_count = queue.len();
        let workers = self
            .config
            .worker_count(self.sampler.recommended_concurrency(), target_count);
        let generation = token.generation();

        info!(
            "Starting run {}: {} items, {} workers, format {}",
            generation,
            target_count,
            workers,
            pipeline.effective_format()
        );
        metrics::RUNS_STARTED.inc();

        let context = Arc::new(RunContext {
            token,
            store: Arc::clone(&self.store),
            transformer: Arc::clone(&self.transformer),
            releaser: Arc::clone(&self.releaser),
            pipeline,
            config: self.config.clone(),
            queue: Mutex::new(queue),
            done: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        });

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|worker| tokio::spawn(worker_loop(Arc::clone(&context), worker)))
            .collect();

        let supervisor = Supervisor {
            context,
            controller: Arc::clone(&self.controller),
            transitions: Arc::clone(&self.transitions),
            workers,
            targets: target_count,
            started_at: Utc::now(),
        };
        let join = tokio::spawn(supervisor.run(handles));

        Ok(RunHandle { generation, join })
    }

    /// Cancels the active run.
    ///
    /// Every `pending`/`processing` item returns to `idle` immediately;
    /// in-flight transformer calls are left to finish and their results are
    /// discarded. Returns `false` (and changes nothing) when idle.
    pub fn cancel_run(&self) -> bool {
        let _transition = self.lock_transitions();

        let Some(generation) = self.controller.cancel() else {
            debug!("Cancel requested with no active run");
            return false;
        };

        let reset = self.store.reset_in_flight();
        info!(
            "Cancelled run {}: {} items returned to idle",
            generation,
            reset.len()
        );
        true
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        lock_transitions(&self.transitions)
    }
}

fn lock_transitions(transitions: &Mutex<()>) -> MutexGuard<'_, ()> {
    transitions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    generation: u64,
    join: JoinHandle<RunSummary>,
}

impl RunHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for every worker of the run to exit.
    pub async fn wait(self) -> Result<RunSummary, OrchestratorError> {
        self.join
            .await
            .map_err(|e| OrchestratorError::RunTaskFailed(e.to_string()))
    }
}

#[derive(Debug)]
struct QueuedItem {
    id: ItemId,
    original: ImageBytes,
}

/// State shared by the workers of one run.
struct RunContext {
    token: RunToken,
    store: Arc<ItemStore>,
    transformer: Arc<dyn Transformer>,
    releaser: Arc<dyn ArtifactReleaser>,
    pipeline: PipelineConfiguration,
    config: ProcessorConfig,
    queue: Mutex<VecDeque<QueuedItem>>,
    done: AtomicUsize,
    failed: AtomicUsize,
    discarded: AtomicUsize,
}

impl RunContext {
    fn pop(&self) -> Option<QueuedItem> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        metrics::ITEMS_FINISHED.with_label_values(&["discarded"]).inc();
    }

    /// Puts a popped but unclaimed item back to `idle`, unless a newer run
    /// owns it by now.
    fn restore_idle(&self, id: &str) {
        let token = &self.token;
        self.store
            .update_item_if(id, ItemPatch::idle(), || token.is_current());
    }
}

/// Keeps the active worker gauge honest even when a worker panics.
struct WorkerGauge;

impl WorkerGauge {
    fn enter() -> Self {
        metrics::WORKERS_ACTIVE.inc();
        WorkerGauge
    }
}

impl Drop for WorkerGauge {
    fn drop(&mut self) {
        metrics::WORKERS_ACTIVE.dec();
    }
}

async fn worker_loop(ctx: Arc<RunContext>, worker: usize) {
    let _gauge = WorkerGauge::enter();
    let generation = ctx.token.generation();

    while let Some(next) = ctx.pop() {
        if ctx.token.is_stale() {
            debug!("Worker {}/{} stopping: run is stale", generation, worker);
            ctx.restore_idle(&next.id);
            ctx.discard();
            break;
        }

        let token = &ctx.token;
        match ctx
            .store
            .update_item_if(&next.id, ItemPatch::processing(), || !token.is_stale())
        {
            UpdateOutcome::Applied(_) => {}
            UpdateOutcome::Rejected => {
                ctx.discard();
                break;
            }
            UpdateOutcome::Missing => {
                debug!("Item {} removed before processing", next.id);
                ctx.discard();
                continue;
            }
        }

        let started = Instant::now();
        let result = ctx.transformer.transform(next.original, &ctx.pipeline).await;
        let elapsed = started.elapsed().as_secs_f64();

        if ctx.token.is_stale() {
            debug!(
                "Worker {}/{} discarding result for {}: run is stale",
                generation, worker, next.id
            );
            if let Ok(output) = result {
                ctx.releaser.release(&output.artifact);
            }
            ctx.discard();
            break;
        }

        let (patch, succeeded) = match result {
            Ok(output) => {
                metrics::TRANSFORM_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                let artifact = ProcessedArtifact {
                    handle: output.artifact,
                    format: ctx.pipeline.effective_format(),
                    width: output.width,
                    height: output.height,
                    size_bytes: output.size_bytes,
                    preview: ctx.config.preview_for(&next.id),
                };
                (ItemPatch::done(artifact), true)
            }
            Err(e) => {
                metrics::TRANSFORM_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                warn!("Transformation failed for {}: {}", next.id, e);
                (ItemPatch::failed(normalize_failure_message(&e.to_string())), false)
            }
        };

        match ctx.store.update_item_if(&next.id, patch, || !token.is_stale()) {
            UpdateOutcome::Applied(_) if succeeded => {
                ctx.done.fetch_add(1, Ordering::Relaxed);
                metrics::ITEMS_FINISHED.with_label_values(&["done"]).inc();
            }
            UpdateOutcome::Applied(_) => {
                ctx.failed.fetch_add(1, Ordering::Relaxed);
                metrics::ITEMS_FINISHED.with_label_values(&["error"]).inc();
            }
            UpdateOutcome::Rejected => {
                ctx.discard();
                break;
            }
            UpdateOutcome::Missing => {
                debug!("Item {} removed while processing", next.id);
                ctx.discard();
            }
        }
    }

    debug!("Worker {}/{} exited", generation, worker);
}

/// Waits for the workers of a run, then settles its bookkeeping.
struct Supervisor {
    context: Arc<RunContext>,
    controller: Arc<RunController>,
    transitions: Arc<Mutex<()>>,
    workers: usize,
    targets: usize,
    started_at: DateTime<Utc>,
}

impl Supervisor {
    async fn run(self, handles: Vec<JoinHandle<()>>) -> RunSummary {
        let generation = self.context.token.generation();

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Worker of run {} failed: {}", generation, e);
            }
        }

        // A worker that died mid-item leaves it in flight. Only the current
        // run may reset items; a newer run owns whatever is in flight now.
        let superseded = {
            let _transition = lock_transitions(&self.transitions);
            let superseded = !self.context.token.is_current();
            if !superseded {
                let leftovers = self.context.store.reset_in_flight();
                if !leftovers.is_empty() {
                    warn!(
                        "Run {} left {} items in flight, returned to idle",
                        generation,
                        leftovers.len()
                    );
                }
            }
            self.controller.finish(generation);
            superseded
        };

        let outcome = if superseded {
            RunOutcome::Superseded
        } else if self.context.token.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Completed
        };
        metrics::RUNS_FINISHED
            .with_label_values(&[outcome.as_str()])
            .inc();

        let summary = RunSummary {
            generation,
            outcome,
            targets: self.targets,
            workers: self.workers,
            done: self.context.done.load(Ordering::Relaxed),
            failed: self.context.failed.load(Ordering::Relaxed),
            discarded: self.context.discarded.load(Ordering::Relaxed),
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Run {} {}: {} done, {} failed, {} discarded",
            generation, outcome, summary.done, summary.failed, summary.discarded
        );
        summary
    }
}

/// Drops duplicate ids, keeping first occurrences in order.
fn dedupe(ids: &[ItemId]) -> Vec<ItemId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
