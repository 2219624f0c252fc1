//! Processing orchestrator.
//!
//! The orchestrator turns a target list into a bounded pool of workers
//! pulling from one shared FIFO queue:
//! - **Concurrency**: `min(recommended_concurrency, targets)`, optionally
//!   capped by configuration
//! - **Cancellation**: cooperative for workers, immediate for the item store
//! - **Staleness**: every run gets a generation; work whose generation is no
//!   longer current, or whose run was cancelled, never lands on an item

mod config;
mod controller;
mod runner;
mod types;

pub use config::ProcessorConfig;
pub use controller::{RunController, RunToken};
pub use runner::{ProcessingOrchestrator, RunHandle};
pub use types::{OrchestratorError, OrchestratorStatus, RunOutcome, RunSummary};
