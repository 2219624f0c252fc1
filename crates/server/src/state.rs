use std::sync::Arc;

use pixbatch_core::{Config, ItemStore, ProcessingOrchestrator, ResourceSampler, TempArtifactStore};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<ItemStore>,
    orchestrator: Arc<ProcessingOrchestrator>,
    sampler: Arc<ResourceSampler>,
    artifacts: Arc<TempArtifactStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<ItemStore>,
        orchestrator: Arc<ProcessingOrchestrator>,
        sampler: Arc<ResourceSampler>,
        artifacts: Arc<TempArtifactStore>,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
            sampler,
            artifacts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<ProcessingOrchestrator> {
        &self.orchestrator
    }

    pub fn sampler(&self) -> &Arc<ResourceSampler> {
        &self.sampler
    }

    pub fn artifacts(&self) -> &Arc<TempArtifactStore> {
        &self.artifacts
    }
}
