//! Joint Gaussian model fitting.
//!
//! The model for a stacked wave table is
//!
//! ```text
//! y_i = β0 + u_g(i) + β_{x,g(i)} x_i + β_{y,g(i)} y_i + ε_i
//! ε_i ~ N(0, 1/τ_g(i))          per-group likelihood
//!       N(0, 1/τ)               shared likelihood
//! ```
//!
//! with Gaussian priors on the latent field and Gamma priors on the
//! observation precisions. [`GridFitter`] integrates the precisions out on a
//! standardised grid around their posterior mode.

pub mod criteria;
pub mod design;
pub mod engine;
pub mod gaussian;
pub mod hyper;
pub mod marginal;

pub use design::{Design, LATENT_TERMS};
pub use engine::GridFitter;

use serde::{Deserialize, Serialize};
use wf_common::{FitSummary, Result};
use wf_config::{AnalysisConfig, IntegrationSettings, LikelihoodMode, ModelSettings};

use crate::stack::StackedTable;

/// Model and integration settings for one fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: ModelSettings,
    pub integration: IntegrationSettings,
}

impl ModelSpec {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            model: config.model.clone(),
            integration: config.integration.clone(),
        }
    }

    /// Number of estimated observation precisions.
    pub fn hyperparameter_count(&self) -> usize {
        match self.model.likelihood {
            LikelihoodMode::PerGroup => 2,
            LikelihoodMode::Shared => 1,
        }
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// A fitting engine for the stacked joint model.
pub trait ModelFitter {
    /// Engine name recorded in the report.
    fn name(&self) -> &str;

    /// Fit one wave's stacked table.
    fn fit(&self, table: &StackedTable, spec: &ModelSpec) -> Result<FitSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_follows_config() {
        let mut config = AnalysisConfig::default();
        config.model.likelihood = LikelihoodMode::Shared;
        config.integration.credible_level = 0.9;
        let spec = ModelSpec::from_config(&config);
        assert_eq!(spec.hyperparameter_count(), 1);
        assert_eq!(spec.integration.credible_level, 0.9);
        assert_eq!(ModelSpec::default().hyperparameter_count(), 2);
    }
}
