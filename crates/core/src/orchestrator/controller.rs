//! Run generation and cancellation state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owner of the run generation counter and the cancellation marker.
///
/// Only the orchestrator moves the counter; workers hold a [`RunToken`],
/// which can read the state but never change it.
#[derive(Debug, Default)]
pub struct RunController {
    /// Generation of the most recently started run (0 = none yet).
    generation: AtomicU64,
    /// Generation of the active run, 0 when idle.
    active: AtomicU64,
    /// Highest generation that was cancelled.
    cancelled: AtomicU64,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recently started run.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Generation of the run currently considered busy, if any.
    pub fn active_generation(&self) -> Option<u64> {
        match self.active.load(Ordering::SeqCst) {
            0 => None,
            g => Some(g),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active_generation().is_some()
    }

    /// Whether the most recent run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        let generation = self.generation();
        generation > 0 && self.cancelled.load(Ordering::SeqCst) >= generation
    }

    /// Starts a new generation unless a run is busy.
    ///
    /// On refusal returns the generation of the busy run.
    pub(crate) fn begin(self: &Arc<Self>) -> Result<RunToken, u64> {
        let next = self.generation() + 1;
        self.active
            .compare_exchange(0, next, Ordering::SeqCst, Ordering::SeqCst)?;
        self.generation.store(next, Ordering::SeqCst);
        Ok(RunToken {
            controller: Arc::clone(self),
            generation: next,
        })
    }

    /// Cancels the busy run. Returns its generation, or `None` when idle.
    pub(crate) fn cancel(&self) -> Option<u64> {
        let generation = self.active_generation()?;
        self.cancelled.fetch_max(generation, Ordering::SeqCst);
        let _ = self
            .active
            .compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
        Some(generation)
    }

    /// Clears the busy marker if it still belongs to `generation`.
    pub(crate) fn finish(&self, generation: u64) -> bool {
        self.active
            .compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Read-only capability tying a unit of work to its run.
#[derive(Debug, Clone)]
pub struct RunToken {
    controller: Arc<RunController>,
    generation: u64,
}

impl RunToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this run is still the most recent one.
    pub fn is_current(&self) -> bool {
        self.controller.generation() == self.generation
    }

    /// Whether this run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.controller.cancelled.load(Ordering::SeqCst) >= self.generation
    }

    /// Work of a stale run must not touch shared state.
    pub fn is_stale(&self) -> bool {
        !self.is_current() || self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_increments_generation() {
        let controller = Arc::new(RunController::new());
        assert_eq!(controller.generation(), 0);
        assert!(!controller.is_busy());

        let token = controller.begin().unwrap();
        assert_eq!(token.generation(), 1);
        assert!(controller.is_busy());
        assert!(!token.is_stale());
    }

    #[test]
    fn test_begin_while_busy_is_refused() {
        let controller = Arc::new(RunController::new());
        let _token = controller.begin().unwrap();
        assert_eq!(controller.begin().unwrap_err(), 1);
        assert_eq!(controller.generation(), 1);
    }

    #[test]
    fn test_cancel_marks_token_stale() {
        let controller = Arc::new(RunController::new());
        let token = controller.begin().unwrap();

        assert_eq!(controller.cancel(), Some(1));
        assert!(token.is_stale());
        assert!(token.is_current());
        assert!(token.is_cancelled());
        assert!(!controller.is_busy());
        assert!(controller.is_cancelled());

        // Idempotent.
        assert_eq!(controller.cancel(), None);
    }

    #[test]
    fn test_new_run_supersedes_cancelled_one() {
        let controller = Arc::new(RunController::new());
        let old = controller.begin().unwrap();
        controller.cancel();

        let new = controller.begin().unwrap();
        assert_eq!(new.generation(), 2);
        assert!(old.is_stale());
        assert!(!old.is_current());
        assert!(!new.is_stale());
        assert!(!controller.is_cancelled());

        // The old run finishing must not clear the new run's busy marker.
        assert!(!controller.finish(old.generation()));
        assert!(controller.is_busy());
        assert!(controller.finish(new.generation()));
        assert!(!controller.is_busy());
    }
}
