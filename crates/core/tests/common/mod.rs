//! Shared harness for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pixbatch_core::{
    testing::{MockMetricsSource, MockReleaser, MockTransformer},
    ArtifactReleaser, ItemStatus, ItemStore, ProcessingOrchestrator, ProcessorConfig,
    ResourceSampler, SamplerConfig, Transformer,
};

/// Test helper wiring an orchestrator to mocks.
pub struct TestHarness {
    pub store: Arc<ItemStore>,
    pub transformer: Arc<MockTransformer>,
    pub releaser: Arc<MockReleaser>,
    pub orchestrator: ProcessingOrchestrator,
}

impl TestHarness {
    pub fn new(max_workers: Option<usize>) -> Self {
        Self::with_config(ProcessorConfig {
            max_workers,
            ..Default::default()
        })
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        let releaser = Arc::new(MockReleaser::new());
        let store = Arc::new(ItemStore::new(
            Arc::clone(&releaser) as Arc<dyn ArtifactReleaser>
        ));
        let transformer = Arc::new(MockTransformer::new());

        // 8 idle cores -> 5 workers before any cap.
        let sampler = Arc::new(ResourceSampler::new(
            SamplerConfig::default().with_fallback_core_count(8),
            Arc::new(MockMetricsSource::new()),
        ));

        let orchestrator = ProcessingOrchestrator::new(
            config,
            Arc::clone(&store),
            Arc::clone(&transformer) as Arc<dyn Transformer>,
            Arc::clone(&releaser) as Arc<dyn ArtifactReleaser>,
            sampler,
        );

        Self {
            store,
            transformer,
            releaser,
            orchestrator,
        }
    }

    pub fn statuses(&self) -> Vec<ItemStatus> {
        self.store.items().iter().map(|item| item.status).collect()
    }
}
