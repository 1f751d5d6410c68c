//! wavefit configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for analysis.json
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots recorded in every report

pub mod analysis;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use analysis::{
    AnalysisConfig, ColumnNames, DataSettings, GammaPrior, IntegrationSettings, LikelihoodMode,
    ModelSettings, ReportSettings, WaveSpec,
};
pub use resolve::{load_config, resolve_config_path, ConfigPath, ConfigSource, ResolvedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult, MAX_GRID_STEPS};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// JSON schema of `analysis.json`.
pub fn config_json_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(AnalysisConfig)).unwrap_or(serde_json::Value::Null)
}
