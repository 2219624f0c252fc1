use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixbatch_core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use pixbatch_core::{
    load_config, validate_config, ArtifactReleaser, ImageTransformer, ItemStore, MetricsSource,
    ProcessingOrchestrator, ResourceSampler, SysinfoSource, TempArtifactStore, Transformer,
};
use pixbatch_server::api::{self, create_router};
use pixbatch_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit config path must exist; the default one is optional
    let config_path = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
    };

    match &config_path {
        Some(path) => info!("Loading configuration from {:?}", path),
        None => info!("No config file found, using defaults and environment"),
    }
    let mut config = load_config(config_path.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    config
        .processor
        .preview_url
        .get_or_insert_with(|| api::ARTIFACT_URL.to_string());

    info!("Configuration loaded successfully");
    info!("Temp directory: {:?}", config.processor.temp_dir);

    // Temporary artifacts: produced by the transformer, released by the store
    let artifacts = Arc::new(
        TempArtifactStore::new(config.processor.temp_dir.clone())
            .context("Failed to create temp artifact directory")?,
    );
    let releaser: Arc<dyn ArtifactReleaser> = Arc::clone(&artifacts) as Arc<dyn ArtifactReleaser>;

    let store = Arc::new(ItemStore::with_pipeline(
        Arc::clone(&releaser),
        config.pipeline.clone(),
    ));
    info!("Item store initialized");

    // Resource sampler
    let source: Arc<dyn MetricsSource> = Arc::new(SysinfoSource::new(Duration::from_millis(
        config.sampler.measurement_window_ms,
    )));
    let sampler = Arc::new(ResourceSampler::new(config.sampler.clone(), source));
    let initial = sampler.sample().await;
    info!(
        "Host has {} cores at {:.1}% CPU, recommending {} workers",
        initial.core_count,
        initial.cpu_utilization_percent,
        sampler.recommended_concurrency()
    );
    let polling = sampler.start_polling();

    // Orchestrator
    let transformer: Arc<dyn Transformer> = Arc::new(ImageTransformer::new(Arc::clone(&artifacts)));
    info!("Using transformer: {}", transformer.name());

    let orchestrator = Arc::new(ProcessingOrchestrator::new(
        config.processor.clone(),
        Arc::clone(&store),
        transformer,
        releaser,
        Arc::clone(&sampler),
    ));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::clone(&orchestrator),
        Arc::clone(&sampler),
        Arc::clone(&artifacts),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if orchestrator.cancel_run() {
        info!("Cancelled active run");
    }

    polling.stop();
    info!("Resource sampler stopped");

    if config.processor.cleanup_on_shutdown {
        let removed = artifacts.cleanup_all();
        info!("Removed {} temporary artifacts", removed);
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
