//! Design matrix and prior precision of the latent field.

use nalgebra::{DMatrix, DVector, RowDVector};
use wf_common::{Error, ResponseGroup, Result};
use wf_config::LikelihoodMode;

use super::ModelSpec;
use crate::stack::StackedTable;

/// Latent field terms, in column order of the design matrix.
pub const LATENT_TERMS: [&str; 7] = [
    "(Intercept)",
    "u_travel_time",
    "u_border_distance",
    "x_tt",
    "y_tt",
    "x_bd",
    "y_bd",
];

pub const INTERCEPT: usize = 0;

/// Column of the group effect for `group`.
pub fn group_effect_index(group: ResponseGroup) -> usize {
    1 + group.index()
}

/// Columns of the `(x, y)` slopes for `group`.
pub fn slope_indices(group: ResponseGroup) -> (usize, usize) {
    match group {
        ResponseGroup::TravelTime => (3, 4),
        ResponseGroup::BorderDistance => (5, 6),
    }
}

/// Everything the Gaussian conditioning needs from one stacked table.
#[derive(Debug, Clone)]
pub struct Design {
    /// `n × 7` design matrix.
    pub a: DMatrix<f64>,
    pub y: DVector<f64>,
    pub groups: Vec<ResponseGroup>,
    /// Hyperparameter used by each observation.
    pub precision_index: Vec<usize>,
    /// Diagonal of the prior precision `Q₀`.
    pub prior_precision: DVector<f64>,
    pub hyperparameters: usize,
    pub likelihood: LikelihoodMode,
}

impl Design {
    /// Build the design, checking that each group has enough observations.
    pub fn build(table: &StackedTable, spec: &ModelSpec) -> Result<Self> {
        let required = spec.model.required_observations;
        for group in ResponseGroup::ALL {
            let available = table.group_count(group);
            if available < required {
                return Err(Error::InsufficientData {
                    group: group.label().to_string(),
                    available,
                    required,
                });
            }
        }

        let n = table.len();
        let p = LATENT_TERMS.len();
        let mut a = DMatrix::zeros(n, p);
        let mut y = DVector::zeros(n);
        let mut groups = Vec::with_capacity(n);
        let mut precision_index = Vec::with_capacity(n);

        for (i, obs) in table.observations().iter().enumerate() {
            let group = obs.group();
            let (x, yc) = obs.coords();
            let (sx, sy) = slope_indices(group);
            a[(i, INTERCEPT)] = 1.0;
            a[(i, group_effect_index(group))] = 1.0;
            a[(i, sx)] = x;
            a[(i, sy)] = yc;
            y[i] = obs.response();
            groups.push(group);
            precision_index.push(match spec.model.likelihood {
                LikelihoodMode::PerGroup => group.index(),
                LikelihoodMode::Shared => 0,
            });
        }

        let model = &spec.model;
        let prior_precision = DVector::from_vec(vec![
            model.intercept_precision,
            model.group_precision,
            model.group_precision,
            model.fixed_effect_precision,
            model.fixed_effect_precision,
            model.fixed_effect_precision,
            model.fixed_effect_precision,
        ]);

        Ok(Self {
            a,
            y,
            groups,
            precision_index,
            prior_precision,
            hyperparameters: spec.hyperparameter_count(),
            likelihood: model.likelihood,
        })
    }

    pub fn observations(&self) -> usize {
        self.y.len()
    }

    pub fn latent_dim(&self) -> usize {
        self.prior_precision.len()
    }

    pub fn row(&self, i: usize) -> RowDVector<f64> {
        self.a.row(i).into_owned()
    }

    /// `½ log|Q₀|₊`, the log pseudo-determinant over the proper prior terms.
    pub fn half_log_det_prior(&self) -> f64 {
        0.5 * self
            .prior_precision
            .iter()
            .filter(|q| **q > 0.0)
            .map(|q| q.ln())
            .sum::<f64>()
    }

    /// Response groups sharing hyperparameter `k`.
    pub fn hyperparameter_groups(&self, k: usize) -> Vec<ResponseGroup> {
        match self.likelihood {
            LikelihoodMode::PerGroup => ResponseGroup::ALL
                .into_iter()
                .filter(|g| g.index() == k)
                .collect(),
            LikelihoodMode::Shared => ResponseGroup::ALL.to_vec(),
        }
    }

    /// Responses of the observations using hyperparameter `k`.
    pub fn responses_for(&self, k: usize) -> Vec<f64> {
        self.precision_index
            .iter()
            .zip(self.y.iter())
            .filter(|(idx, _)| **idx == k)
            .map(|(_, v)| *v)
            .collect()
    }
}

/// Display name of hyperparameter `k`.
pub fn hyperparameter_name(likelihood: LikelihoodMode, k: usize) -> String {
    match likelihood {
        LikelihoodMode::PerGroup => {
            let group = ResponseGroup::ALL
                .into_iter()
                .find(|g| g.index() == k)
                .unwrap_or(ResponseGroup::TravelTime);
            format!("Precision for {}", group.label())
        }
        LikelihoodMode::Shared => "Precision for the Gaussian observations".to_string(),
    }
}

/// Coefficient vector picking the combined intercept `β0 + u_g`.
pub fn group_intercept_combination(group: ResponseGroup) -> DVector<f64> {
    let mut c = DVector::zeros(LATENT_TERMS.len());
    c[INTERCEPT] = 1.0;
    c[group_effect_index(group)] = 1.0;
    c
}
