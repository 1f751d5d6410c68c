//! Report generator for wavefit analyses.
//!
//! Renders fitted wave models as a Markdown report, a pretty-printed JSON
//! document, or one summary line per wave.
//!
//! # Sections
//!
//! - Overview: run identity, input, model and configuration
//! - Per wave: fixed effects, group intercepts, hyperparameters, fit statistics
//! - Interpretation: narrative sentences built from the summaries
//! - Failed waves: structured errors for waves that did not complete
//!
//! # Example
//!
//! ```no_run
//! use wf_report::{ReportConfig, ReportData, ReportGenerator};
//! use wf_common::OutputFormat;
//!
//! # fn demo(data: ReportData) -> wf_report::Result<()> {
//! let generator = ReportGenerator::new(ReportConfig::default());
//! let markdown = generator.generate(&data, OutputFormat::Md)?;
//! println!("{}", markdown);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod sections;

pub use config::{ReportConfig, ReportSections};
pub use error::{ReportError, Result};
pub use generator::{ReportData, ReportGenerator};
pub use sections::{FailureRow, OverviewSection, WaveSection};
