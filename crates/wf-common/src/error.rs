//! Error types for wavefit.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Missing Input Column
//!   Reason: required column 'B_Dist_km' not found in data/incidents.csv
//!   Fix: Check the header row of the input file, or map the column in analysis.json.
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 21,
//!   "category": "data",
//!   "message": "required column 'B_Dist_km' not found in data/incidents.csv",
//!   "context": { "column": "B_Dist_km" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for wavefit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Input table loading and validation errors.
    Data,
    /// Model fitting and numerical errors.
    Inference,
    /// Report rendering errors.
    Report,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Report => write!(f, "report"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for wavefit.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown wave '{0}'")]
    UnknownWave(String),

    // Data errors (20-29)
    #[error("failed to read input table: {0}")]
    Data(String),

    #[error("required column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("malformed value {value:?} in column '{column}' at line {line}")]
    MalformedValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("negative value {value} in column '{column}' at line {line} cannot be log-transformed")]
    NegativeValue { line: u64, column: String, value: f64 },

    #[error("no records for wave '{wave}' in region '{region}'")]
    EmptySubset { wave: String, region: String },

    // Inference errors (30-39)
    #[error("model fit failed: {0}")]
    Inference(String),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    #[error("insufficient observations for {group}: {available} available, {required} required")]
    InsufficientData {
        group: String,
        available: usize,
        required: usize,
    },

    // Report errors (40-49)
    #[error("report rendering failed: {0}")]
    Report(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data errors
    /// - 30-39: Inference errors
    /// - 40-49: Report errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::UnknownWave(_) => 12,
            Error::Data(_) => 20,
            Error::MissingColumn { .. } => 21,
            Error::MalformedValue { .. } => 22,
            Error::NegativeValue { .. } => 23,
            Error::EmptySubset { .. } => 24,
            Error::Inference(_) => 30,
            Error::NumericalInstability(_) => 31,
            Error::InsufficientData { .. } => 32,
            Error::Report(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) | Error::UnknownWave(_) => {
                ErrorCategory::Config
            }

            Error::Data(_)
            | Error::MissingColumn { .. }
            | Error::MalformedValue { .. }
            | Error::NegativeValue { .. }
            | Error::EmptySubset { .. } => ErrorCategory::Data,

            Error::Inference(_)
            | Error::NumericalInstability(_)
            | Error::InsufficientData { .. } => ErrorCategory::Inference,

            Error::Report(_) => ErrorCategory::Report,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the error is scoped to a single wave analysis.
    ///
    /// Wave-scoped errors leave the other waves' analyses untouched; all other
    /// errors abort the run.
    pub fn is_wave_scoped(&self) -> bool {
        matches!(
            self,
            Error::NegativeValue { .. }
                | Error::EmptySubset { .. }
                | Error::Inference(_)
                | Error::NumericalInstability(_)
                | Error::InsufficientData { .. }
        )
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'wavefit config show' to inspect the resolved configuration."
            }
            Error::InvalidConfig(_) => {
                "Fix the reported field in analysis.json. 'wavefit config schema' prints the expected shape."
            }
            Error::UnknownWave(_) => {
                "Use a wave key defined in the 'waves' section of the configuration."
            }
            Error::Data(_) => "Check that the input file exists and is a delimited text table.",
            Error::MissingColumn { .. } => {
                "Check the header row of the input file, or map the column in analysis.json."
            }
            Error::MalformedValue { .. } => {
                "Numeric columns must hold finite numbers and wave flags must be boolean (1/0, true/false)."
            }
            Error::NegativeValue { .. } => {
                "Travel time and border distance must be non-negative before the log(x + 1) transform."
            }
            Error::EmptySubset { .. } => {
                "Check the region name and the wave flag column; no rows matched both."
            }
            Error::Inference(_) => {
                "Inspect the stacked table with '--emit-stacked' and check for constant or collinear covariates."
            }
            Error::NumericalInstability(_) => {
                "Try rescaling the coordinates or tightening the fixed-effect prior precision."
            }
            Error::InsufficientData { .. } => {
                "The wave subset is too small for the model; widen the region or merge waves."
            }
            Error::Report(_) => "Retry with '--format json' to inspect the raw results.",
            Error::Io(_) => "Check paths, permissions, and free disk space.",
            Error::Json(_) => "Invalid JSON. Check the file syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::UnknownWave(_) => "Unknown Wave",
            Error::Data(_) => "Input Table Error",
            Error::MissingColumn { .. } => "Missing Input Column",
            Error::MalformedValue { .. } => "Malformed Input Value",
            Error::NegativeValue { .. } => "Negative Input Value",
            Error::EmptySubset { .. } => "Empty Wave Subset",
            Error::Inference(_) => "Model Fit Error",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::InsufficientData { .. } => "Insufficient Data",
            Error::Report(_) => "Report Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (e.g., column, line).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingColumn { column, .. } => {
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::MalformedValue { line, column, .. } | Error::NegativeValue { line, column, .. } => {
                context.insert("line".to_string(), serde_json::json!(line));
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::EmptySubset { wave, region } => {
                context.insert("wave".to_string(), serde_json::json!(wave));
                context.insert("region".to_string(), serde_json::json!(region));
            }
            Error::InsufficientData {
                group,
                available,
                required,
            } => {
                context.insert("group".to_string(), serde_json::json!(group));
                context.insert("available".to_string(), serde_json::json!(available));
                context.insert("required".to_string(), serde_json::json!(required));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

/// Result of a batch of independent items that may partially fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult<T> {
    /// Successfully completed items.
    pub succeeded: Vec<T>,

    /// Failed items with their errors.
    pub failed: Vec<BatchError>,

    /// Summary statistics.
    pub summary: BatchSummary,
}

/// A single error in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Identifier of the failed item.
    pub item_id: String,

    /// The structured error.
    pub error: StructuredError,
}

/// Summary of batch results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub all_succeeded: bool,
    pub any_succeeded: bool,
}

impl<T> BatchResult<T> {
    /// Create a new batch result from succeeded and failed items.
    pub fn new(succeeded: Vec<T>, failed: Vec<BatchError>) -> Self {
        let total = succeeded.len() + failed.len();
        let succeeded_count = succeeded.len();
        let failed_count = failed.len();

        BatchResult {
            succeeded,
            failed,
            summary: BatchSummary {
                total,
                succeeded: succeeded_count,
                failed: failed_count,
                all_succeeded: failed_count == 0,
                any_succeeded: succeeded_count > 0,
            },
        }
    }

    /// Add a failure to the batch result.
    pub fn add_failure(&mut self, item_id: impl Into<String>, error: &Error) {
        self.failed.push(BatchError {
            item_id: item_id.into(),
            error: StructuredError::from(error),
        });
        self.summary.failed += 1;
        self.summary.total += 1;
        self.summary.all_succeeded = false;
    }

    /// Add a success to the batch result.
    pub fn add_success(&mut self, item: T) {
        self.succeeded.push(item);
        self.summary.succeeded += 1;
        self.summary.total += 1;
        self.summary.any_succeeded = true;
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
