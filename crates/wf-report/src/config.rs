//! Report configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Which sections are included in the rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSections {
    pub overview: bool,
    pub coefficients: bool,
    pub hyperparameters: bool,
    pub statistics: bool,
    pub narrative: bool,
    pub failures: bool,
}

impl Default for ReportSections {
    fn default() -> Self {
        Self {
            overview: true,
            coefficients: true,
            hyperparameters: true,
            statistics: true,
            narrative: true,
            failures: true,
        }
    }
}

/// Report generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    pub title: String,
    /// Decimal places for estimates.
    pub decimals: usize,
    pub sections: ReportSections,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Terrorism Waves and Border Proximity".to_string(),
            decimals: 4,
            sections: ReportSections::default(),
        }
    }
}

impl ReportConfig {
    /// Create a configuration with a title and precision.
    pub fn new(title: impl Into<String>, decimals: usize) -> Self {
        Self {
            title: title.into(),
            decimals,
            ..Default::default()
        }
    }

    /// Enable or disable the narrative section.
    pub fn with_narrative(mut self, enabled: bool) -> Self {
        self.sections.narrative = enabled;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ReportError::InvalidConfig("title must not be empty".into()));
        }
        if self.decimals > 12 {
            return Err(ReportError::InvalidConfig(format!(
                "decimals must be at most 12, got {}",
                self.decimals
            )));
        }
        Ok(())
    }
}
