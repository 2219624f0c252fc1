//! Error types for the pipeline module.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

/// Errors a transformation can fail with.
///
/// These are per-item failures: the orchestrator records them on the item
/// and carries on with the rest of the run.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Source bytes could not be decoded as an image.
    #[error("failed to decode image: {reason}")]
    Decode { reason: String },

    /// Encoding the output failed.
    #[error("failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    /// The requested operation is not available in this transformer.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// The transformation task died before producing a result.
    #[error("transformation task failed: {reason}")]
    TaskFailed { reason: String },

    /// I/O error while writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure reported by an external engine.
    #[error("{0}")]
    Other(String),
}

impl TransformError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn encode(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

static GENERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^error:\s*").expect("static regex is valid"));

/// Strips a leading generic `Error:` prefix from a failure description.
pub fn normalize_failure_message(message: &str) -> String {
    GENERIC_PREFIX.replace(message.trim(), "").into_owned()
}
