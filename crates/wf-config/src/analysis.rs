//! Analysis configuration types.
//!
//! These types match the `analysis.json` file. Every section has built-in
//! defaults, so an empty object `{}` is a valid configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub data: DataSettings,

    #[serde(default = "default_waves")]
    pub waves: Vec<WaveSpec>,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub integration: IntegrationSettings,

    #[serde(default)]
    pub report: ReportSettings,
}

/// Where the incident table lives and how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DataSettings {
    /// Path to the delimited input table.
    pub path: String,
    /// Single-byte field delimiter.
    pub delimiter: char,
    pub region_column: String,
    /// Rows whose region column equals this value are analysed.
    pub region: String,
    pub columns: ColumnNames,
}

/// Names of the numeric input columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnNames {
    pub xcoord: String,
    pub ycoord: String,
    pub travel_time: String,
    pub border_distance: String,
}

/// One ideological wave, selected by a boolean flag column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaveSpec {
    /// Short identifier used on the command line (`third`, `fourth`).
    pub key: String,
    /// Display name (`Third Wave`).
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Boolean indicator column in the input table.
    pub flag_column: String,
}

/// How the observation precisions are shared between the response groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodMode {
    /// One Gaussian likelihood (own precision) per response group.
    #[default]
    PerGroup,
    /// A single Gaussian likelihood for the whole stacked table.
    Shared,
}

impl std::fmt::Display for LikelihoodMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LikelihoodMode::PerGroup => write!(f, "per_group"),
            LikelihoodMode::Shared => write!(f, "shared"),
        }
    }
}

/// Gamma(shape, rate) prior on an observation precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GammaPrior {
    pub shape: f64,
    pub rate: f64,
}

impl Default for GammaPrior {
    fn default() -> Self {
        GammaPrior {
            shape: 1.0,
            rate: 5e-5,
        }
    }
}

/// Prior structure of the joint model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelSettings {
    pub likelihood: LikelihoodMode,
    /// Prior precision of the global intercept; 0 means flat.
    pub intercept_precision: f64,
    /// Prior precision of the group-masked slopes.
    pub fixed_effect_precision: f64,
    /// Fixed (not estimated) precision of the group effect.
    pub group_precision: f64,
    pub noise_prior: GammaPrior,
    /// Minimum observations per response group.
    pub required_observations: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            likelihood: LikelihoodMode::PerGroup,
            intercept_precision: 0.0,
            fixed_effect_precision: 0.001,
            group_precision: 0.001,
            noise_prior: GammaPrior::default(),
            required_observations: 3,
        }
    }
}

/// Numerical integration over the log-precisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IntegrationSettings {
    /// Grid spacing in standardised units.
    pub step: f64,
    /// Grid half-width in steps per dimension.
    pub max_steps: u32,
    /// Grid points whose log density falls more than this below the mode are dropped.
    pub log_density_drop: f64,
    pub max_newton_iterations: usize,
    /// Convergence tolerance on the Newton step (log-precision units).
    pub tolerance: f64,
    /// Probability mass of reported credible intervals.
    pub credible_level: f64,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        IntegrationSettings {
            step: 1.0,
            max_steps: 4,
            log_density_drop: 2.5,
            max_newton_iterations: 100,
            tolerance: 1e-6,
            credible_level: 0.95,
        }
    }
}

/// Report presentation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportSettings {
    pub title: String,
    /// Decimal places for estimates in tables.
    pub decimals: usize,
    /// Include the narrative paragraphs.
    pub narrative: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            title: "Terrorism Waves and Border Proximity".to_string(),
            decimals: 4,
            narrative: true,
        }
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            xcoord: "xcoord".to_string(),
            ycoord: "ycoord".to_string(),
            travel_time: "Travel_Time_Average".to_string(),
            border_distance: "B_Dist_km".to_string(),
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            path: "data/incidents.csv".to_string(),
            delimiter: ',',
            region_column: "Region".to_string(),
            region: "Western Europe".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_waves() -> Vec<WaveSpec> {
    vec![
        WaveSpec {
            key: "third".to_string(),
            label: "Third Wave".to_string(),
            description: Some("New Left".to_string()),
            flag_column: "Third_Wave".to_string(),
        },
        WaveSpec {
            key: "fourth".to_string(),
            label: "Fourth Wave".to_string(),
            description: Some("Religious".to_string()),
            flag_column: "Fourth_Wave".to_string(),
        },
    ]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            schema_version: default_schema_version(),
            description: None,
            data: DataSettings::default(),
            waves: default_waves(),
            model: ModelSettings::default(),
            integration: IntegrationSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Find a wave by key.
    pub fn wave(&self, key: &str) -> Option<&WaveSpec> {
        self.waves.iter().find(|w| w.key == key)
    }

    /// Restrict the analysis to the given wave keys, keeping configuration order.
    ///
    /// Returns the first unknown key as an error.
    pub fn select_waves(&mut self, keys: &[String]) -> Result<(), String> {
        if keys.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = keys.iter().find(|k| self.wave(k).is_none()) {
            return Err(unknown.clone());
        }
        self.waves.retain(|w| keys.contains(&w.key));
        Ok(())
    }

    /// Number of hyperparameters implied by the likelihood mode.
    pub fn hyperparameter_count(&self) -> usize {
        match self.model.likelihood {
            LikelihoodMode::PerGroup => 2,
            LikelihoodMode::Shared => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = AnalysisConfig::from_json("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.waves.len(), 2);
        assert_eq!(config.data.columns.border_distance, "B_Dist_km");
        assert_eq!(config.model.likelihood, LikelihoodMode::PerGroup);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{"data": {"region": "South America"}, "model": {"likelihood": "shared"}}"#,
        )
        .unwrap();
        assert_eq!(config.data.region, "South America");
        assert_eq!(config.data.region_column, "Region");
        assert_eq!(config.model.likelihood, LikelihoodMode::Shared);
        assert_eq!(config.model.group_precision, 0.001);
        assert_eq!(config.hyperparameter_count(), 1);
    }

    #[test]
    fn select_waves_filters_and_rejects_unknown() {
        let mut config = AnalysisConfig::default();
        config.select_waves(&["fourth".to_string()]).unwrap();
        assert_eq!(config.waves.len(), 1);
        assert_eq!(config.waves[0].label, "Fourth Wave");

        let mut config = AnalysisConfig::default();
        let err = config.select_waves(&["fifth".to_string()]).unwrap_err();
        assert_eq!(err, "fifth");
        assert_eq!(config.waves.len(), 2);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = AnalysisConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }
}
