//! Model-comparison criteria: DIC, WAIC and the effective number of
//! parameters.
//!
//! All three are computed in closed form per grid component and averaged with
//! the grid weights, so no posterior sampling is involved.

use nalgebra::{DMatrix, DVector};
use wf_common::{Error, FitStatistics, GroupDic, ResponseGroup, Result};
use wf_math::{log_sum_exp, normal_log_pdf, LOG_2PI};

use super::design::Design;
use super::gaussian::ConditionalGaussian;

/// One weighted grid point with its conditional latent posterior.
#[derive(Debug, Clone)]
pub struct GridComponent {
    pub weight: f64,
    pub conditional: ConditionalGaussian,
    pub covariance: DMatrix<f64>,
}

impl GridComponent {
    pub fn new(weight: f64, conditional: ConditionalGaussian) -> Self {
        let covariance = conditional.covariance();
        Self {
            weight,
            conditional,
            covariance,
        }
    }

    /// Linear predictor mean `a_i μ` and variance `a_i Σ a_iᵀ` per observation.
    fn predictor(&self, design: &Design) -> (DVector<f64>, Vec<f64>) {
        let eta = &design.a * &self.conditional.mean;
        let a_sigma = &design.a * &self.covariance;
        let variances = (0..design.observations())
            .map(|i| a_sigma.row(i).dot(&design.a.row(i)).max(0.0))
            .collect();
        (eta, variances)
    }
}

/// Deviance information criterion, overall and per response group.
#[derive(Debug, Clone, PartialEq)]
pub struct Dic {
    pub mean_deviance: f64,
    pub deviance_at_mean: f64,
    pub effective_parameters: f64,
    pub dic: f64,
    pub by_group: Vec<GroupDic>,
}

/// Widely applicable information criterion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waic {
    pub lppd: f64,
    pub effective_parameters: f64,
    pub waic: f64,
}

/// DIC with `D̄ = Σ_k w_k E[D | θ_k]` and `D(θ̂)` at the posterior latent mean
/// and the precision mode.
pub fn dic(design: &Design, components: &[GridComponent], mode: &[f64]) -> Dic {
    let n = design.observations();
    let mut mean_dev = vec![0.0; n];
    let mut posterior_mean = DVector::zeros(design.latent_dim());

    for component in components {
        let (eta, variances) = component.predictor(design);
        for i in 0..n {
            let theta = component.conditional.log_precisions[design.precision_index[i]];
            let tau = theta.exp();
            let r = design.y[i] - eta[i];
            mean_dev[i] += component.weight * (LOG_2PI - theta + tau * (r * r + variances[i]));
        }
        posterior_mean.axpy(component.weight, &component.conditional.mean, 1.0);
    }

    let eta_bar = &design.a * &posterior_mean;
    let plug_in: Vec<f64> = (0..n)
        .map(|i| {
            let theta = mode[design.precision_index[i]];
            let r = design.y[i] - eta_bar[i];
            LOG_2PI - theta + theta.exp() * r * r
        })
        .collect();

    let by_group = ResponseGroup::ALL
        .into_iter()
        .map(|group| {
            let rows: Vec<usize> = (0..n).filter(|i| design.groups[*i] == group).collect();
            let d_bar: f64 = rows.iter().map(|i| mean_dev[*i]).sum();
            let d_hat: f64 = rows.iter().map(|i| plug_in[*i]).sum();
            GroupDic {
                group,
                observations: rows.len(),
                dic: 2.0 * d_bar - d_hat,
                effective_parameters: d_bar - d_hat,
            }
        })
        .collect();

    let mean_deviance: f64 = mean_dev.iter().sum();
    let deviance_at_mean: f64 = plug_in.iter().sum();
    let effective_parameters = mean_deviance - deviance_at_mean;
    Dic {
        mean_deviance,
        deviance_at_mean,
        effective_parameters,
        dic: mean_deviance + effective_parameters,
        by_group,
    }
}

/// WAIC from the closed-form pointwise predictive densities.
///
/// The posterior variance of `log p(y_i | x, θ)` is the within-component
/// variance `¼τ²(2s⁴ + 4s²r²)` plus the spread of the component means.
pub fn waic(design: &Design, components: &[GridComponent]) -> Waic {
    let n = design.observations();
    let k = components.len();
    let mut log_terms = vec![Vec::with_capacity(k); n];
    let mut expectations = vec![Vec::with_capacity(k); n];
    let mut within = vec![0.0; n];

    for component in components {
        let (eta, variances) = component.predictor(design);
        let log_w = component.weight.ln();
        for i in 0..n {
            let theta = component.conditional.log_precisions[design.precision_index[i]];
            let tau = theta.exp();
            let r = design.y[i] - eta[i];
            let s2 = variances[i];

            log_terms[i].push(log_w + normal_log_pdf(design.y[i], eta[i], tau.recip() + s2));
            expectations[i].push(-0.5 * LOG_2PI + 0.5 * theta - 0.5 * tau * (r * r + s2));
            within[i] += component.weight * 0.25 * tau * tau * (2.0 * s2 * s2 + 4.0 * s2 * r * r);
        }
    }

    let mut lppd = 0.0;
    let mut p_waic = 0.0;
    for i in 0..n {
        lppd += log_sum_exp(&log_terms[i]);
        let e_bar: f64 = components
            .iter()
            .zip(&expectations[i])
            .map(|(c, e)| c.weight * e)
            .sum();
        let between: f64 = components
            .iter()
            .zip(&expectations[i])
            .map(|(c, e)| c.weight * (e - e_bar) * (e - e_bar))
            .sum();
        p_waic += within[i] + between;
    }

    Waic {
        lppd,
        effective_parameters: p_waic,
        waic: -2.0 * (lppd - p_waic),
    }
}

/// Expected effective number of latent parameters, `Σ_k w_k (p − tr(Q₀ Σ_k))`.
pub fn effective_parameters(design: &Design, components: &[GridComponent]) -> f64 {
    let p = design.latent_dim() as f64;
    components
        .iter()
        .map(|c| {
            let trace: f64 = design
                .prior_precision
                .iter()
                .enumerate()
                .map(|(j, q)| q * c.covariance[(j, j)])
                .sum();
            c.weight * (p - trace)
        })
        .sum()
}

/// All fit statistics for one model. Fails if any is non-finite.
pub fn fit_statistics(
    design: &Design,
    components: &[GridComponent],
    mode: &[f64],
    log_marginal_likelihood: f64,
) -> Result<FitStatistics> {
    let dic = dic(design, components, mode);
    let waic = waic(design, components);
    let statistics = FitStatistics {
        dic: dic.dic,
        mean_deviance: dic.mean_deviance,
        deviance_at_mean: dic.deviance_at_mean,
        dic_effective_parameters: dic.effective_parameters,
        waic: waic.waic,
        waic_effective_parameters: waic.effective_parameters,
        lppd: waic.lppd,
        effective_parameters: effective_parameters(design, components),
        log_marginal_likelihood,
        group_dic: dic.by_group,
    };

    let groups_finite = statistics
        .group_dic
        .iter()
        .all(|g| g.dic.is_finite() && g.effective_parameters.is_finite());
    if !statistics.is_finite() || !groups_finite {
        return Err(Error::NumericalInstability(format!(
            "non-finite fit statistics (DIC {}, WAIC {})",
            statistics.dic, statistics.waic
        )));
    }
    Ok(statistics)
}
