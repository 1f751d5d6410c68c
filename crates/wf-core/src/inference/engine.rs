//! The default fitting engine: grid integration over the observation
//! precisions with exact Gaussian conditionals for the latent field.

use nalgebra::DVector;
use tracing::debug;
use wf_common::{
    CoefficientEstimate, FitSummary, HyperparameterEstimate, IntegrationDiagnostics, ResponseGroup,
    Result,
};

use super::criteria::{fit_statistics, GridComponent};
use super::design::{
    group_effect_index, group_intercept_combination, hyperparameter_name, slope_indices, Design,
    INTERCEPT, LATENT_TERMS,
};
use super::gaussian::{log_posterior, ConditionalGaussian};
use super::hyper::{explore_grid, find_mode, HyperGrid};
use super::marginal::{combination_moments, mixture_summary, precision_summary};
use super::{ModelFitter, ModelSpec};
use crate::stack::StackedTable;

pub const ENGINE_NAME: &str = "grid";

/// Floor on the response variance used for the starting point.
const MIN_START_VARIANCE: f64 = 1e-6;

/// Grid-integration fitter for the stacked joint model.
#[derive(Debug, Clone, Default)]
pub struct GridFitter;

impl GridFitter {
    pub fn new() -> Self {
        Self
    }
}

impl ModelFitter for GridFitter {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn fit(&self, table: &StackedTable, spec: &ModelSpec) -> Result<FitSummary> {
        let design = Design::build(table, spec)?;
        let prior = spec.model.noise_prior;
        let log_post = |theta: &[f64]| log_posterior(&design, theta, prior.shape, prior.rate);

        let start = initial_log_precisions(&design);
        let mode = find_mode(&log_post, &start, &spec.integration)?;
        debug!(
            mode = ?mode.theta,
            iterations = mode.iterations,
            log_density = mode.log_density,
            "Precision mode found"
        );

        let grid = explore_grid(&log_post, &mode, &spec.integration)?;
        let components = grid_components(&design, &grid)?;
        debug!(
            grid_points = components.len(),
            log_normalizer = grid.log_normalizer,
            "Grid integration complete"
        );

        let level = spec.integration.credible_level;
        let weights: Vec<f64> = components.iter().map(|c| c.weight).collect();
        let means: Vec<DVector<f64>> = components.iter().map(|c| c.conditional.mean.clone()).collect();
        let covariances: Vec<_> = components.iter().map(|c| c.covariance.clone()).collect();

        let coefficient = |term: String, group: Option<ResponseGroup>, c: &DVector<f64>| {
            let moments = combination_moments(c, &weights, &means, &covariances);
            mixture_summary(&term, &moments, level).map(|summary| CoefficientEstimate {
                term,
                group,
                summary,
            })
        };
        let unit = |j: usize| {
            let mut c = DVector::zeros(LATENT_TERMS.len());
            c[j] = 1.0;
            c
        };

        let mut fixed_effects = vec![coefficient(
            LATENT_TERMS[INTERCEPT].to_string(),
            None,
            &unit(INTERCEPT),
        )?];
        for group in ResponseGroup::ALL {
            let (sx, sy) = slope_indices(group);
            for j in [sx, sy] {
                fixed_effects.push(coefficient(LATENT_TERMS[j].to_string(), Some(group), &unit(j))?);
            }
        }

        let mut group_intercepts = Vec::with_capacity(2);
        let mut group_effects = Vec::with_capacity(2);
        for group in ResponseGroup::ALL {
            group_intercepts.push(coefficient(
                format!("intercept_{}", group.suffix()),
                Some(group),
                &group_intercept_combination(group),
            )?);
            let j = group_effect_index(group);
            group_effects.push(coefficient(LATENT_TERMS[j].to_string(), Some(group), &unit(j))?);
        }

        let mut hyperparameters = Vec::with_capacity(design.hyperparameters);
        for k in 0..design.hyperparameters {
            let name = hyperparameter_name(design.likelihood, k);
            let thetas: Vec<f64> = components.iter().map(|c| c.conditional.log_precisions[k]).collect();
            let summary = precision_summary(&name, &thetas, &weights, level)?;
            hyperparameters.push(HyperparameterEstimate {
                name,
                groups: design.hyperparameter_groups(k),
                summary,
            });
        }

        let statistics = fit_statistics(&design, &components, &mode.theta, grid.log_normalizer)?;

        Ok(FitSummary {
            engine: ENGINE_NAME.to_string(),
            credible_level: level,
            observations: design.observations(),
            fixed_effects,
            group_intercepts,
            group_effects,
            hyperparameters,
            statistics,
            integration: IntegrationDiagnostics {
                log_precision_mode: mode.theta.clone(),
                newton_iterations: mode.iterations,
                grid_points: components.len(),
            },
        })
    }
}

/// `log(1 / var(y))` per hyperparameter, over the observations it governs.
pub fn initial_log_precisions(design: &Design) -> Vec<f64> {
    (0..design.hyperparameters)
        .map(|k| {
            let values = design.responses_for(k);
            let n = values.len().max(1) as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            -var.max(MIN_START_VARIANCE).ln()
        })
        .collect()
}

fn grid_components(design: &Design, grid: &HyperGrid) -> Result<Vec<GridComponent>> {
    grid.points
        .iter()
        .map(|p| Ok(GridComponent::new(p.weight, ConditionalGaussian::new(design, &p.theta)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::stack;
    use crate::transform::TransformedRecord;
    use wf_common::Error;
    use wf_config::LikelihoodMode;

    // Two replicates of a 7 × 5 coordinate grid. The noise patterns are
    // orthogonal to both coordinates, so least squares recovers the
    // coefficients exactly.
    fn records(n: usize) -> Vec<TransformedRecord> {
        (0..n)
            .map(|i| {
                let x = (i % 7) as f64 - 3.0;
                let y = ((i / 7) % 5) as f64 - 2.0;
                let e1 = if (i / 35) % 2 == 0 { 0.1 } else { -0.1 };
                let e2 = if i % 2 == 0 { 0.2 } else { -0.2 };
                TransformedRecord {
                    line: i as u64 + 2,
                    xcoord: x,
                    ycoord: y,
                    log_travel_time: 2.0 + 0.4 * x - 0.2 * y + e1,
                    log_border_distance: 4.0 - 0.3 * x + 0.1 * y + e2,
                }
            })
            .collect()
    }

    #[test]
    fn fit_produces_complete_summary() {
        let table = stack(&records(70));
        let fit = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap();
        assert_eq!(fit.engine, "grid");
        assert_eq!(fit.observations, 140);
        assert_eq!(fit.fixed_effects.len(), 5);
        assert_eq!(fit.group_intercepts.len(), 2);
        assert_eq!(fit.group_effects.len(), 2);
        assert_eq!(fit.hyperparameters.len(), 2);
        assert!(fit.integration.grid_points >= 1);
        assert!(fit.statistics.is_finite());

        let x_tt = fit.fixed_effect("x_tt").unwrap().summary;
        assert!(x_tt.lower < 0.4 && 0.4 < x_tt.upper, "{x_tt:?}");
        let tt = fit.group_intercept(ResponseGroup::TravelTime).unwrap().summary;
        assert!((tt.mean - 2.0).abs() < 0.1, "{tt:?}");
        assert!(fit.hyperparameters[0].name.contains("travel_time"));
    }

    #[test]
    fn shared_likelihood_has_one_precision() {
        let table = stack(&records(70));
        let mut spec = ModelSpec::default();
        spec.model.likelihood = LikelihoodMode::Shared;
        let fit = GridFitter::new().fit(&table, &spec).unwrap();
        assert_eq!(fit.hyperparameters.len(), 1);
        assert_eq!(fit.hyperparameters[0].groups.len(), 2);
        assert_eq!(fit.integration.log_precision_mode.len(), 1);
    }

    #[test]
    fn tiny_table_is_insufficient() {
        let table = stack(&records(2));
        let err = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
    }

    #[test]
    fn start_uses_response_variance() {
        let table = stack(&records(70));
        let design = Design::build(&table, &ModelSpec::default()).unwrap();
        let start = initial_log_precisions(&design);
        assert_eq!(start.len(), 2);
        assert!(start.iter().all(|s| s.is_finite()));
    }
}
