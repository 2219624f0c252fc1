//! Types for the processing orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::StatusCounts;

/// Errors that can occur when starting or awaiting a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// None of the requested targets exist.
    #[error("no items to process")]
    EmptyTargets,

    /// Another run is still busy.
    #[error("run {generation} is already in progress")]
    RunInProgress { generation: u64 },

    /// The run supervisor task died.
    #[error("run task failed: {0}")]
    RunTaskFailed(String),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The queue drained while the run was current.
    Completed,
    /// The run was cancelled.
    Cancelled,
    /// A newer run started before this one drained.
    Superseded,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generation: u64,
    pub outcome: RunOutcome,
    /// Number of items queued.
    pub targets: usize,
    /// Number of workers spawned.
    pub workers: usize,
    /// Items committed as `done`.
    pub done: usize,
    /// Items committed as `error`.
    pub failed: usize,
    /// Items whose work was thrown away (stale or removed).
    pub discarded: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether a run is in progress.
    pub busy: bool,
    /// Generation of the most recent run.
    pub generation: u64,
    /// Whether the most recent run was cancelled.
    pub cancelled: bool,
    /// Current worker recommendation from the resource sampler.
    pub recommended_concurrency: usize,
    /// Item counts per status.
    pub counts: StatusCounts,
}
