//! Latent Gaussian field conditional on the observation precisions.
//!
//! Given θ = log τ the latent posterior is `N(μ, Q⁻¹)` with
//! `Q = Q₀ + AᵀWA` and `Qμ = AᵀWy`, where `W` is the diagonal of per-row
//! precisions. The marginal likelihood `p(y | θ)` is available in closed form
//! from the same Cholesky factor.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use wf_common::{Error, Result};
use wf_math::LOG_2PI;

use super::design::Design;

/// Conditional posterior of the latent field at one θ.
#[derive(Debug, Clone)]
pub struct ConditionalGaussian {
    pub log_precisions: Vec<f64>,
    pub mean: DVector<f64>,
    /// `log p(y | θ)` up to the flat-prior constant.
    pub log_likelihood: f64,
    chol: Cholesky<f64, Dyn>,
}

impl ConditionalGaussian {
    /// Condition the latent field on `log_precisions`.
    pub fn new(design: &Design, log_precisions: &[f64]) -> Result<Self> {
        if log_precisions.len() != design.hyperparameters {
            return Err(Error::Inference(format!(
                "expected {} log-precisions, got {}",
                design.hyperparameters,
                log_precisions.len()
            )));
        }
        if log_precisions.iter().any(|t| !t.is_finite()) {
            return Err(Error::NumericalInstability(format!(
                "non-finite log-precision {log_precisions:?}"
            )));
        }

        let n = design.observations();
        let p = design.latent_dim();
        let mut q = DMatrix::from_diagonal(&design.prior_precision);
        let mut b = DVector::zeros(p);
        let mut weighted_ss = 0.0;
        let mut sum_log_tau = 0.0;

        for i in 0..n {
            let theta = log_precisions[design.precision_index[i]];
            let tau = theta.exp();
            let col = design.a.row(i).transpose();
            let yi = design.y[i];
            q.ger(tau, &col, &col, 1.0);
            b.axpy(tau * yi, &col, 1.0);
            weighted_ss += tau * yi * yi;
            sum_log_tau += theta;
        }

        let chol = Cholesky::new(q).ok_or_else(|| {
            Error::NumericalInstability(format!(
                "latent precision matrix is not positive definite at log-precision {log_precisions:?}"
            ))
        })?;
        let mean = chol.solve(&b);
        let log_det_q = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
        let quadratic = weighted_ss - mean.dot(&b);

        let log_likelihood = 0.5 * sum_log_tau - 0.5 * n as f64 * LOG_2PI
            + design.half_log_det_prior()
            - 0.5 * log_det_q
            - 0.5 * quadratic;

        if !log_likelihood.is_finite() || mean.iter().any(|m| !m.is_finite()) {
            return Err(Error::NumericalInstability(format!(
                "non-finite conditional posterior at log-precision {log_precisions:?}"
            )));
        }

        Ok(Self {
            log_precisions: log_precisions.to_vec(),
            mean,
            log_likelihood,
            chol,
        })
    }

    /// Posterior covariance `Q⁻¹`.
    pub fn covariance(&self) -> DMatrix<f64> {
        self.chol.inverse()
    }

    /// Precision of observation `i`.
    pub fn precision_of(&self, design: &Design, i: usize) -> f64 {
        self.log_precisions[design.precision_index[i]].exp()
    }
}

/// Log posterior density of θ up to a constant: `log p(y | θ) + Σ log p(θ_k)`.
pub fn log_posterior(design: &Design, log_precisions: &[f64], shape: f64, rate: f64) -> Result<f64> {
    let conditional = ConditionalGaussian::new(design, log_precisions)?;
    let prior: f64 = log_precisions
        .iter()
        .map(|t| wf_math::log_gamma_log_pdf(*t, shape, rate))
        .sum();
    let value = conditional.log_likelihood + prior;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NumericalInstability(format!(
            "non-finite log posterior at log-precision {log_precisions:?}"
        )))
    }
}
