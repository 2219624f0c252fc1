pub mod artifact;
pub mod config;
pub mod item;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod sampler;
pub mod testing;

pub use artifact::{ArtifactError, ArtifactHandle, ArtifactReleaser, TempArtifactStore};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
};
pub use item::{
    export_file_name, ExportEntry, ImageItem, ItemId, ItemPatch, ItemStatus, ItemStore, NewImage,
    ProcessedArtifact, StatusCounts, StoreEvent, UpdateOutcome,
};
pub use metadata::{read_metadata, ImageMetadata, MetadataField};
pub use orchestrator::{
    OrchestratorError, OrchestratorStatus, ProcessingOrchestrator, ProcessorConfig, RunHandle,
    RunOutcome, RunSummary,
};
pub use pipeline::{
    ImageBytes, ImageTransformer, OutputFormat, PipelineConfigPatch, PipelineConfiguration,
    ResizeTarget, TransformError, TransformOutput, Transformer,
};
pub use sampler::{
    recommended_concurrency, MetricsSource, PollingGuard, ResourceSampler, SampleError,
    SamplerConfig, SysinfoSource, SystemSnapshot,
};
