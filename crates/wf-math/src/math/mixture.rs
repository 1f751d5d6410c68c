//! Finite Gaussian mixtures and weighted discrete summaries.
//!
//! Posterior marginals produced by grid integration over hyperparameters are
//! mixtures `Σ_k w_k N(μ_k, σ_k²)`. Quantiles are found by bisection on the
//! mixture CDF.

use serde::{Deserialize, Serialize};

use super::normal::{normal_cdf, standard_normal_quantile};

const BISECTION_MAX_ITERS: usize = 200;
const BISECTION_TOL: f64 = 1e-12;

/// One weighted Gaussian component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    pub weight: f64,
    pub mean: f64,
    pub sd: f64,
}

/// A finite mixture of Gaussians with weights summing to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    components: Vec<MixtureComponent>,
}

impl GaussianMixture {
    /// Build a mixture, renormalising weights and dropping zero-weight components.
    ///
    /// Returns `None` if no component has positive finite weight or any
    /// component has a non-finite mean or a non-positive sd.
    pub fn new(components: Vec<MixtureComponent>) -> Option<Self> {
        let kept: Vec<MixtureComponent> = components
            .into_iter()
            .filter(|c| c.weight > 0.0)
            .collect();
        if kept.is_empty() {
            return None;
        }
        if kept
            .iter()
            .any(|c| !c.weight.is_finite() || !c.mean.is_finite() || !(c.sd > 0.0) || !c.sd.is_finite())
        {
            return None;
        }
        let total: f64 = kept.iter().map(|c| c.weight).sum();
        let components = kept
            .into_iter()
            .map(|c| MixtureComponent {
                weight: c.weight / total,
                ..c
            })
            .collect();
        Some(Self { components })
    }

    /// A single Gaussian.
    pub fn single(mean: f64, sd: f64) -> Option<Self> {
        Self::new(vec![MixtureComponent {
            weight: 1.0,
            mean,
            sd,
        }])
    }

    pub fn components(&self) -> &[MixtureComponent] {
        &self.components
    }

    pub fn mean(&self) -> f64 {
        self.components.iter().map(|c| c.weight * c.mean).sum()
    }

    /// Law of total variance across components.
    pub fn variance(&self) -> f64 {
        let m = self.mean();
        let second: f64 = self
            .components
            .iter()
            .map(|c| c.weight * (c.sd * c.sd + c.mean * c.mean))
            .sum();
        (second - m * m).max(0.0)
    }

    pub fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * normal_cdf(x, c.mean, c.sd))
            .sum()
    }

    /// Quantile at probability `p` in (0, 1).
    pub fn quantile(&self, p: f64) -> f64 {
        if p.is_nan() || p <= 0.0 || p >= 1.0 {
            return f64::NAN;
        }
        if self.components.len() == 1 {
            let c = self.components[0];
            return c.mean + c.sd * standard_normal_quantile(p);
        }

        let z = standard_normal_quantile(p).abs() + 1.0;
        let mut lo = self
            .components
            .iter()
            .map(|c| c.mean - z * c.sd)
            .fold(f64::INFINITY, f64::min);
        let mut hi = self
            .components
            .iter()
            .map(|c| c.mean + z * c.sd)
            .fold(f64::NEG_INFINITY, f64::max);

        for _ in 0..BISECTION_MAX_ITERS {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if (hi - lo) <= BISECTION_TOL * (1.0 + mid.abs()) {
                break;
            }
        }
        0.5 * (lo + hi)
    }
}

/// Weighted mean and standard deviation of point masses.
pub fn weighted_mean_sd(values: &[f64], weights: &[f64]) -> (f64, f64) {
    let total: f64 = weights.iter().sum();
    if values.is_empty() || values.len() != weights.len() || !(total > 0.0) {
        return (f64::NAN, f64::NAN);
    }
    let mean = values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total;
    let var = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - mean) * (v - mean))
        .sum::<f64>()
        / total;
    (mean, var.max(0.0).sqrt())
}

/// Quantile of a weighted discrete distribution, linearly interpolated
/// between the cumulative midpoints of the sorted support.
pub fn weighted_quantile(values: &[f64], weights: &[f64], p: f64) -> f64 {
    let total: f64 = weights.iter().sum();
    if values.is_empty() || values.len() != weights.len() || !(total > 0.0) || !(0.0..=1.0).contains(&p)
    {
        return f64::NAN;
    }
    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .copied()
        .zip(weights.iter().map(|w| w / total))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut cumulative = 0.0;
    let mut midpoints = Vec::with_capacity(pairs.len());
    for &(v, w) in &pairs {
        midpoints.push((v, cumulative + 0.5 * w));
        cumulative += w;
    }

    if p <= midpoints[0].1 {
        return midpoints[0].0;
    }
    for window in midpoints.windows(2) {
        let (v0, c0) = window[0];
        let (v1, c1) = window[1];
        if p <= c1 {
            if c1 <= c0 {
                return v1;
            }
            return v0 + (v1 - v0) * (p - c0) / (c1 - c0);
        }
    }
    midpoints[midpoints.len() - 1].0
}
