//! Error types for report generation.

use thiserror::Error;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur during report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required data.
    #[error("missing required data: {0}")]
    MissingData(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ReportError> for wf_common::Error {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::IoError(e) => wf_common::Error::Io(e),
            ReportError::JsonError(e) => wf_common::Error::Json(e),
            other => wf_common::Error::Report(other.to_string()),
        }
    }
}
