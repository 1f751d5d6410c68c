//! wavefit common types and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Incident records and response groups
//! - Fitted-model summaries
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod fit;
pub mod incident;
pub mod output;
pub mod schema;

pub use error::{format_error_human, BatchResult, Error, ErrorCategory, Result, StructuredError};
pub use fit::{
    CoefficientEstimate, FitStatistics, FitSummary, GroupDic, HyperparameterEstimate,
    IntegrationDiagnostics, MarginalSummary,
};
pub use incident::{IncidentRecord, ResponseGroup};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
