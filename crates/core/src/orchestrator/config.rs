//! Processor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the processing orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Directory for temporary artifacts.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Hard cap on workers per run, applied on top of the load heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    /// Whether to delete every tracked artifact on shutdown.
    #[serde(default = "default_cleanup")]
    pub cleanup_on_shutdown: bool,

    /// Preview link stored on each processed item; `{id}` is replaced with
    /// the item id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("pixbatch")
}

fn default_cleanup() -> bool {
    true
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_workers: None,
            cleanup_on_shutdown: default_cleanup(),
            preview_url: None,
        }
    }
}

impl ProcessorConfig {
    /// Sets the worker cap.
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = Some(max);
        self
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Sets the preview link template.
    pub fn with_preview_url(mut self, template: impl Into<String>) -> Self {
        self.preview_url = Some(template.into());
        self
    }

    /// Preview link for `id`, if a template is configured.
    pub fn preview_for(&self, id: &str) -> Option<String> {
        self.preview_url
            .as_ref()
            .map(|template| template.replace("{id}", id))
    }

    /// Worker count for a run: the recommendation, bounded by the target
    /// count and the configured cap, never zero.
    pub fn worker_count(&self, recommended: usize, targets: usize) -> usize {
        let capped = match self.max_workers {
            Some(max) => recommended.min(max),
            None => recommended,
        };
        capped.min(targets).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert!(config.max_workers.is_none());
        assert!(config.cleanup_on_shutdown);
        assert!(config.temp_dir.ends_with("pixbatch"));
    }

    #[test]
    fn test_worker_count() {
        let config = ProcessorConfig::default();
        assert_eq!(config.worker_count(5, 3), 3);
        assert_eq!(config.worker_count(5, 10), 5);

        let capped = ProcessorConfig::default().with_max_workers(2);
        assert_eq!(capped.worker_count(5, 10), 2);
        assert_eq!(capped.worker_count(5, 1), 1);
    }

    #[test]
    fn test_preview_for() {
        assert_eq!(ProcessorConfig::default().preview_for("a"), None);

        let config = ProcessorConfig::default().with_preview_url("/items/{id}/artifact");
        assert_eq!(
            config.preview_for("abc").as_deref(),
            Some("/items/abc/artifact")
        );
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: ProcessorConfig = toml::from_str("max_workers = 3").unwrap();
        assert_eq!(config.max_workers, Some(3));
        assert!(config.cleanup_on_shutdown);
    }
}
