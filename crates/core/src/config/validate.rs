use super::{types::Config, ConfigError};
use crate::pipeline::ResizeTarget;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0 and the upload limit is positive
/// - Pipeline quality is within 1-100 and resize dimensions are non-zero
/// - Sampler poll interval is positive
/// - Worker cap, when set, is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }
    if config.server.max_upload_mb == 0 {
        return Err(invalid("server.max_upload_mb cannot be 0"));
    }

    // Pipeline validation
    if !(1..=100).contains(&config.pipeline.quality) {
        return Err(invalid(format!(
            "pipeline.quality must be within 1-100, got {}",
            config.pipeline.quality
        )));
    }
    let zero_resize = match config.pipeline.resize {
        ResizeTarget::MaxEdge { max_px } => max_px == 0,
        ResizeTarget::Explicit { width, height } => width == 0 || height == 0,
    };
    if zero_resize {
        return Err(invalid("pipeline.resize dimensions cannot be 0"));
    }

    if config.sampler.poll_interval_ms == 0 {
        return Err(invalid("sampler.poll_interval_ms cannot be 0"));
    }

    if config.processor.max_workers == Some(0) {
        return Err(invalid("processor.max_workers cannot be 0"));
    }

    if let Some(template) = &config.processor.preview_url {
        if !template.contains("{id}") {
            return Err(invalid("processor.preview_url must contain {id}"));
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
