//! Sampler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for host resource sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// How often to re-sample while polling (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Window between the two CPU readings of one sample (milliseconds).
    /// Utilisation is the average over this window.
    #[serde(default = "default_measurement_window")]
    pub measurement_window_ms: u64,

    /// Core count assumed before the first successful sample.
    /// Defaults to the host's available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_core_count: Option<usize>,
}

fn default_poll_interval() -> u64 {
    3000 // 3 seconds
}

fn default_measurement_window() -> u64 {
    200
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            measurement_window_ms: default_measurement_window(),
            fallback_core_count: None,
        }
    }
}

impl SamplerConfig {
    /// Core count used before (or instead of) a successful sample.
    pub fn fallback_cores(&self) -> usize {
        self.fallback_core_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_fallback_core_count(mut self, cores: usize) -> Self {
        self.fallback_core_count = Some(cores);
        self
    }
}
