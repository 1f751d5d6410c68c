//! Configuration validation errors and semantic validation.

use std::collections::HashSet;

use thiserror::Error;

use crate::analysis::{AnalysisConfig, GammaPrior};

/// Largest grid half-width accepted for `integration.max_steps`.
pub const MAX_GRID_STEPS: u32 = 20;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate an analysis configuration semantically.
pub fn validate_config(config: &AnalysisConfig) -> ValidationResult<()> {
    let major = config.schema_version.split('.').next().unwrap_or("");
    let expected_major = crate::CONFIG_SCHEMA_VERSION
        .split('.')
        .next()
        .unwrap_or("");
    if major != expected_major {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_data(config)?;
    validate_waves(config)?;
    validate_model(config)?;
    validate_integration(config)?;

    if config.report.decimals > 12 {
        return Err(invalid("report.decimals", "must be at most 12"));
    }

    Ok(())
}

fn validate_data(config: &AnalysisConfig) -> ValidationResult<()> {
    let data = &config.data;
    if data.path.trim().is_empty() {
        return Err(ValidationError::MissingField("data.path".to_string()));
    }
    if !data.delimiter.is_ascii() || data.delimiter == '"' || data.delimiter == '\n' {
        return Err(invalid(
            "data.delimiter",
            format!("{:?} is not a usable single-byte delimiter", data.delimiter),
        ));
    }
    let columns = [
        ("data.region_column", &data.region_column),
        ("data.columns.xcoord", &data.columns.xcoord),
        ("data.columns.ycoord", &data.columns.ycoord),
        ("data.columns.travel_time", &data.columns.travel_time),
        ("data.columns.border_distance", &data.columns.border_distance),
    ];
    for (field, name) in columns {
        if name.trim().is_empty() {
            return Err(invalid(field, "column name must not be empty"));
        }
    }
    if data.region.trim().is_empty() {
        return Err(ValidationError::MissingField("data.region".to_string()));
    }
    Ok(())
}

fn validate_waves(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.waves.is_empty() {
        return Err(ValidationError::SemanticError(
            "at least one wave must be configured".to_string(),
        ));
    }

    let mut keys = HashSet::new();
    for (i, wave) in config.waves.iter().enumerate() {
        if wave.key.trim().is_empty() {
            return Err(invalid(&format!("waves[{}].key", i), "must not be empty"));
        }
        if wave.flag_column.trim().is_empty() {
            return Err(invalid(
                &format!("waves[{}].flag_column", i),
                "column name must not be empty",
            ));
        }
        if !keys.insert(wave.key.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate wave key '{}'",
                wave.key
            )));
        }
    }
    Ok(())
}

fn validate_model(config: &AnalysisConfig) -> ValidationResult<()> {
    let model = &config.model;

    if !(model.intercept_precision.is_finite() && model.intercept_precision >= 0.0) {
        return Err(invalid(
            "model.intercept_precision",
            format!("must be finite and >= 0, got {}", model.intercept_precision),
        ));
    }
    check_positive("model.fixed_effect_precision", model.fixed_effect_precision)?;
    check_positive("model.group_precision", model.group_precision)?;
    check_gamma("model.noise_prior", &model.noise_prior)?;

    if model.required_observations == 0 {
        return Err(invalid("model.required_observations", "must be at least 1"));
    }
    Ok(())
}

fn validate_integration(config: &AnalysisConfig) -> ValidationResult<()> {
    let integration = &config.integration;

    check_positive("integration.step", integration.step)?;
    check_positive("integration.log_density_drop", integration.log_density_drop)?;
    check_positive("integration.tolerance", integration.tolerance)?;

    if integration.max_steps == 0 || integration.max_steps > MAX_GRID_STEPS {
        return Err(invalid(
            "integration.max_steps",
            format!(
                "must be in 1..={}, got {}",
                MAX_GRID_STEPS, integration.max_steps
            ),
        ));
    }
    if integration.max_newton_iterations == 0 {
        return Err(invalid(
            "integration.max_newton_iterations",
            "must be at least 1",
        ));
    }

    let level = integration.credible_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(invalid(
            "integration.credible_level",
            format!("must be in (0, 1), got {}", level),
        ));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and > 0, got {}", value)))
    }
}

fn check_gamma(field: &str, prior: &GammaPrior) -> ValidationResult<()> {
    check_positive(&format!("{}.shape", field), prior.shape)?;
    check_positive(&format!("{}.rate", field), prior.rate)
}
