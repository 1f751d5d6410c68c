//! Posterior marginal summaries from the integration grid.

use nalgebra::{DMatrix, DVector};
use wf_common::{Error, MarginalSummary, Result};
use wf_math::{weighted_mean_sd, weighted_quantile, GaussianMixture, MixtureComponent};

/// Lower and upper tail probabilities of a central credible interval.
pub fn interval_probabilities(level: f64) -> (f64, f64) {
    ((1.0 - level) / 2.0, (1.0 + level) / 2.0)
}

/// Mean and variance of a linear combination under one grid component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentMoments {
    pub weight: f64,
    pub mean: f64,
    pub variance: f64,
}

/// Summarise the Gaussian mixture `Σ_k w_k N(m_k, v_k)`.
pub fn mixture_summary(name: &str, moments: &[ComponentMoments], level: f64) -> Result<MarginalSummary> {
    let components = moments
        .iter()
        .map(|m| MixtureComponent {
            weight: m.weight,
            mean: m.mean,
            sd: m.variance.max(0.0).sqrt(),
        })
        .collect();
    let mixture = GaussianMixture::new(components).ok_or_else(|| {
        Error::NumericalInstability(format!("degenerate posterior marginal for {name}"))
    })?;

    let (lo, hi) = interval_probabilities(level);
    let summary = MarginalSummary {
        mean: mixture.mean(),
        sd: mixture.sd(),
        lower: mixture.quantile(lo),
        median: mixture.quantile(0.5),
        upper: mixture.quantile(hi),
    };
    finite(name, summary)
}

/// Moments of `cᵀx` for each grid component, given per-component means and
/// covariances.
pub fn combination_moments(
    c: &DVector<f64>,
    weights: &[f64],
    means: &[DVector<f64>],
    covariances: &[DMatrix<f64>],
) -> Vec<ComponentMoments> {
    weights
        .iter()
        .zip(means)
        .zip(covariances)
        .map(|((w, mu), sigma)| ComponentMoments {
            weight: *w,
            mean: c.dot(mu),
            variance: (sigma * c).dot(c),
        })
        .collect()
}

/// Summarise the precisions `τ = exp(θ)` over the weighted grid.
pub fn precision_summary(name: &str, log_precisions: &[f64], weights: &[f64], level: f64) -> Result<MarginalSummary> {
    let values: Vec<f64> = log_precisions.iter().map(|t| t.exp()).collect();
    let (mean, sd) = weighted_mean_sd(&values, weights);
    let (lo, hi) = interval_probabilities(level);
    let summary = MarginalSummary {
        mean,
        sd,
        lower: weighted_quantile(&values, weights, lo),
        median: weighted_quantile(&values, weights, 0.5),
        upper: weighted_quantile(&values, weights, hi),
    };
    finite(name, summary)
}

fn finite(name: &str, summary: MarginalSummary) -> Result<MarginalSummary> {
    if summary.is_finite() {
        Ok(summary)
    } else {
        Err(Error::NumericalInstability(format!(
            "non-finite posterior summary for {name}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_component_interval_is_symmetric() {
        let s = mixture_summary(
            "b",
            &[ComponentMoments {
                weight: 1.0,
                mean: 2.0,
                variance: 0.25,
            }],
            0.95,
        )
        .unwrap();
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert!((s.sd - 0.5).abs() < 1e-12);
        assert!((s.lower - (2.0 - 1.959964 * 0.5)).abs() < 1e-4);
        assert!((s.upper - (2.0 + 1.959964 * 0.5)).abs() < 1e-4);
        assert!((s.median - 2.0).abs() < 1e-9);
    }

    #[test]
    fn mixture_spreads_interval() {
        let parts = [
            ComponentMoments { weight: 0.5, mean: -1.0, variance: 0.01 },
            ComponentMoments { weight: 0.5, mean: 1.0, variance: 0.01 },
        ];
        let s = mixture_summary("b", &parts, 0.9).unwrap();
        assert!(s.mean.abs() < 1e-12);
        assert!(s.lower < -1.0 && s.upper > 1.0);
        assert!(!s.excludes_zero());
    }

    #[test]
    fn combination_moments_use_covariance() {
        let c = DVector::from_vec(vec![1.0, 1.0]);
        let mu = DVector::from_vec(vec![1.0, 2.0]);
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 2.0]);
        let m = combination_moments(&c, &[1.0], &[mu], &[sigma]);
        assert_eq!(m[0].mean, 3.0);
        assert_eq!(m[0].variance, 4.0);
    }

    #[test]
    fn precision_summary_on_point_mass() {
        let s = precision_summary("tau", &[2.0f64.ln()], &[1.0], 0.95).unwrap();
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert_eq!(s.sd, 0.0);
        assert!((s.median - 2.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_mixture_is_an_error() {
        let parts = [ComponentMoments { weight: 1.0, mean: f64::NAN, variance: 1.0 }];
        assert!(matches!(
            mixture_summary("b", &parts, 0.95),
            Err(Error::NumericalInstability(_))
        ));
    }
}
