//! Host resource sampling and the load-aware concurrency heuristic.
//!
//! [`ResourceSampler`] keeps the last good [`SystemSnapshot`] and can poll a
//! [`MetricsSource`] on a fixed interval. Sampling failures never propagate:
//! the sampler keeps serving the last good value (or a safe default), so a
//! broken metrics source can never block processing.

mod config;
mod heuristic;
mod sampler;
mod source;
mod types;

pub use config::SamplerConfig;
pub use heuristic::{recommended_concurrency, MAX_BASE_CONCURRENCY, MIN_CONCURRENCY};
pub use sampler::{PollingGuard, ResourceSampler};
pub use source::{MetricsSource, SysinfoSource};
pub use types::{SampleError, SystemSnapshot};
