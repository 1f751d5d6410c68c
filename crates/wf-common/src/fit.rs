//! Fitted-model summaries shared between the fitting engine and the reporter.

use serde::{Deserialize, Serialize};

use crate::incident::ResponseGroup;

/// Posterior marginal summary of one scalar quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginalSummary {
    pub mean: f64,
    pub sd: f64,
    /// Lower credible bound.
    pub lower: f64,
    pub median: f64,
    /// Upper credible bound.
    pub upper: f64,
}

impl MarginalSummary {
    /// True when the credible interval lies entirely on one side of zero.
    pub fn excludes_zero(&self) -> bool {
        self.lower > 0.0 || self.upper < 0.0
    }

    pub fn is_finite(&self) -> bool {
        [self.mean, self.sd, self.lower, self.median, self.upper]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A latent-field coefficient with its posterior summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    /// Term name as it appears in the model (`(Intercept)`, `x_tt`, ...).
    pub term: String,
    /// Response group the term applies to; `None` for shared terms.
    pub group: Option<ResponseGroup>,
    pub summary: MarginalSummary,
}

/// A hyperparameter (observation precision) with its posterior summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterEstimate {
    pub name: String,
    /// Groups sharing this precision.
    pub groups: Vec<ResponseGroup>,
    pub summary: MarginalSummary,
}

/// DIC contribution of one likelihood group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupDic {
    pub group: ResponseGroup,
    pub observations: usize,
    pub dic: f64,
    pub effective_parameters: f64,
}

/// Global model-comparison statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    pub dic: f64,
    /// Posterior mean deviance.
    pub mean_deviance: f64,
    /// Deviance at the posterior mean.
    pub deviance_at_mean: f64,
    /// DIC effective number of parameters (pD).
    pub dic_effective_parameters: f64,
    pub waic: f64,
    /// WAIC effective number of parameters (p_WAIC).
    pub waic_effective_parameters: f64,
    /// Log pointwise predictive density.
    pub lppd: f64,
    /// Expected effective number of latent parameters.
    pub effective_parameters: f64,
    pub log_marginal_likelihood: f64,
    pub group_dic: Vec<GroupDic>,
}

impl FitStatistics {
    pub fn is_finite(&self) -> bool {
        [
            self.dic,
            self.mean_deviance,
            self.deviance_at_mean,
            self.dic_effective_parameters,
            self.waic,
            self.waic_effective_parameters,
            self.lppd,
            self.effective_parameters,
            self.log_marginal_likelihood,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// How the hyperparameter integration went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDiagnostics {
    /// Posterior mode of the log-precisions.
    pub log_precision_mode: Vec<f64>,
    pub newton_iterations: usize,
    pub grid_points: usize,
}

/// Everything the reporter needs from one fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Name of the fitting engine.
    pub engine: String,
    pub credible_level: f64,
    /// Number of stacked observations.
    pub observations: usize,
    pub fixed_effects: Vec<CoefficientEstimate>,
    /// Global intercept plus group effect, one per response group.
    pub group_intercepts: Vec<CoefficientEstimate>,
    /// The group effects alone.
    pub group_effects: Vec<CoefficientEstimate>,
    pub hyperparameters: Vec<HyperparameterEstimate>,
    pub statistics: FitStatistics,
    pub integration: IntegrationDiagnostics,
}

impl FitSummary {
    /// Look up a fixed effect by term name.
    pub fn fixed_effect(&self, term: &str) -> Option<&CoefficientEstimate> {
        self.fixed_effects.iter().find(|c| c.term == term)
    }

    /// Look up the combined intercept of a response group.
    pub fn group_intercept(&self, group: ResponseGroup) -> Option<&CoefficientEstimate> {
        self.group_intercepts
            .iter()
            .find(|c| c.group == Some(group))
    }
}
