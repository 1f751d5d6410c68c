//! wavefit core library.
//!
//! The analysis is a straight pipeline run once per wave:
//! load → wave subset → log(x + 1) transform → stack → fit → report.

pub mod data;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod pipeline;
pub mod stack;
pub mod transform;

pub use data::{load_incidents, IncidentTable, WaveSubset};
pub use inference::{GridFitter, ModelFitter, ModelSpec};
pub use pipeline::{Analysis, AnalysisOutcome, RunOptions, WaveAnalysis};
pub use stack::{MaskedRow, Observation, StackedTable};
pub use transform::{log1p_checked, transform_subset, TransformedRecord};
