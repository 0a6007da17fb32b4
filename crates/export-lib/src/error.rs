//! Error types for the export pipeline

use thiserror::Error;

/// Errors raised while turning live state into an exported manifest
///
/// None of these are retried: the pipeline is pure, so the same inputs
/// always fail the same way. Callers re-fetch and run the export again.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A traffic target or status field names a revision that was not fetched
    #[error("service '{service}' references revision '{revision}' which is not in its revision history")]
    ConsistencyFault { service: String, revision: String },

    /// Requested mode and output format cannot be combined
    #[error("unsupported combination: {0}")]
    UnsupportedCombination(String),

    /// A fetched object breaks an invariant the exporter relies on
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to encode manifest as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode manifest as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExportError {
    pub fn consistency(service: &str, revision: &str) -> Self {
        Self::ConsistencyFault {
            service: service.to_string(),
            revision: revision.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
