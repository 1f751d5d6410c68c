//! Posterior mode search and grid exploration over the log-precisions.
//!
//! The mode is found by damped Newton iterations with finite-difference
//! derivatives. The grid is laid out in the standardised coordinates
//! `θ = θ* + V Λ^{-1/2} z`, where `V Λ Vᵀ` is the negative Hessian at the mode.

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use tracing::trace;
use wf_common::{Error, Result};
use wf_config::IntegrationSettings;
use wf_math::{log_sum_exp, normalize_log_weights};

/// Finite-difference step on the log-precision scale.
pub const FD_STEP: f64 = 1e-3;
/// Largest Newton step per component.
pub const MAX_NEWTON_STEP: f64 = 2.0;
const MAX_HALVINGS: usize = 40;
/// Upper bound on grid points evaluated per fit.
pub const MAX_GRID_POINTS: usize = 1 << 20;

/// Result of the Newton mode search.
#[derive(Debug, Clone)]
pub struct PosteriorMode {
    pub theta: Vec<f64>,
    pub log_density: f64,
    /// Negative Hessian of the log density at the mode.
    pub neg_hessian: DMatrix<f64>,
    pub iterations: usize,
}

/// One retained grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub theta: Vec<f64>,
    pub log_density: f64,
    /// Normalised integration weight.
    pub weight: f64,
}

/// The integration grid.
#[derive(Debug, Clone)]
pub struct HyperGrid {
    pub points: Vec<GridPoint>,
    /// `log ∫ π(θ | y) dθ` estimated from the grid.
    pub log_normalizer: f64,
}

impl HyperGrid {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.weight).collect()
    }
}

/// Central finite-difference gradient and Hessian of `f` at `x`.
pub fn derivatives<F>(f: &F, x: &[f64], fx: f64, h: f64) -> Result<(DVector<f64>, DMatrix<f64>)>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    let d = x.len();
    let at = |offsets: &[(usize, f64)]| -> Result<f64> {
        let mut p = x.to_vec();
        for &(i, delta) in offsets {
            p[i] += delta;
        }
        f(&p)
    };

    let mut grad = DVector::zeros(d);
    let mut hess = DMatrix::zeros(d, d);
    for i in 0..d {
        let plus = at(&[(i, h)])?;
        let minus = at(&[(i, -h)])?;
        grad[i] = (plus - minus) / (2.0 * h);
        hess[(i, i)] = (plus - 2.0 * fx + minus) / (h * h);
    }
    for i in 0..d {
        for j in (i + 1)..d {
            let pp = at(&[(i, h), (j, h)])?;
            let pm = at(&[(i, h), (j, -h)])?;
            let mp = at(&[(i, -h), (j, h)])?;
            let mm = at(&[(i, -h), (j, -h)])?;
            let value = (pp - pm - mp + mm) / (4.0 * h * h);
            hess[(i, j)] = value;
            hess[(j, i)] = value;
        }
    }
    Ok((grad, hess))
}

/// Damped Newton ascent to the mode of `f`.
///
/// Falls back to a gradient step when the negative Hessian is not positive
/// definite and halves the step until the density does not decrease.
pub fn find_mode<F>(f: &F, start: &[f64], settings: &IntegrationSettings) -> Result<PosteriorMode>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    let mut x = DVector::from_column_slice(start);
    let mut fx = f(x.as_slice())?;

    for iteration in 1..=settings.max_newton_iterations {
        let (grad, hess) = derivatives(f, x.as_slice(), fx, FD_STEP)?;
        let mut step = newton_direction(-hess, &grad);
        let largest = step.amax();
        if !largest.is_finite() {
            return Err(Error::NumericalInstability(
                "non-finite Newton step in precision mode search".to_string(),
            ));
        }
        if largest > MAX_NEWTON_STEP {
            step *= MAX_NEWTON_STEP / largest;
        }

        let mut converged = false;
        let mut scale = 1.0;
        for _ in 0..MAX_HALVINGS {
            let trial = &step * scale;
            if trial.amax() < settings.tolerance {
                converged = true;
                break;
            }
            let candidate = &x + &trial;
            match f(candidate.as_slice()) {
                Ok(value) if value >= fx => {
                    x = candidate;
                    fx = value;
                    break;
                }
                _ => scale *= 0.5,
            }
        }
        trace!(iteration, log_density = fx, theta = ?x.as_slice(), "Newton iteration");

        if converged {
            let (_, hess) = derivatives(f, x.as_slice(), fx, FD_STEP)?;
            let neg_hessian = -hess;
            if !is_positive_definite(&neg_hessian) {
                return Err(Error::NumericalInstability(format!(
                    "log posterior of the precisions is not concave at {:?}",
                    x.as_slice()
                )));
            }
            return Ok(PosteriorMode {
                theta: x.as_slice().to_vec(),
                log_density: fx,
                neg_hessian,
                iterations: iteration,
            });
        }
    }

    Err(Error::NumericalInstability(format!(
        "precision mode search did not converge in {} iterations",
        settings.max_newton_iterations
    )))
}

fn is_positive_definite(m: &DMatrix<f64>) -> bool {
    SymmetricEigen::new(m.clone())
        .eigenvalues
        .iter()
        .all(|l| l.is_finite() && *l > 0.0)
}

/// Newton direction `(−H)⁻¹ g`, or `g` itself when `−H` is not positive definite.
fn newton_direction(neg_hess: DMatrix<f64>, grad: &DVector<f64>) -> DVector<f64> {
    if !is_positive_definite(&neg_hess) {
        return grad.clone();
    }
    match Cholesky::new(neg_hess) {
        Some(chol) => chol.solve(grad),
        None => grad.clone(),
    }
}

/// Number of points in a `(2K + 1)^d` grid.
///
/// Fails when the count overflows or exceeds [`MAX_GRID_POINTS`].
pub fn grid_size(max_steps: u32, dims: usize) -> Result<usize> {
    let side = usize::try_from(max_steps)
        .ok()
        .and_then(|k| k.checked_mul(2))
        .and_then(|k| k.checked_add(1));
    let total = side
        .zip(u32::try_from(dims).ok())
        .and_then(|(side, d)| side.checked_pow(d))
        .filter(|n| *n <= MAX_GRID_POINTS);
    total.ok_or_else(|| {
        Error::InvalidConfig(format!(
            "integration grid with max_steps {max_steps} in {dims} dimensions exceeds {MAX_GRID_POINTS} points"
        ))
    })
}

/// Evaluate `f` on the standardised grid around `mode`.
///
/// Points whose log density falls more than `log_density_drop` below the
/// mode, or where `f` fails, are left out.
pub fn explore_grid<F>(f: &F, mode: &PosteriorMode, settings: &IntegrationSettings) -> Result<HyperGrid>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    let d = mode.theta.len();
    let eigen = SymmetricEigen::new(mode.neg_hessian.clone());
    if eigen.eigenvalues.iter().any(|l| !(*l > 0.0) || !l.is_finite()) {
        return Err(Error::NumericalInstability(format!(
            "non-positive curvature {:?} at the precision mode",
            eigen.eigenvalues.as_slice()
        )));
    }
    let scales: Vec<f64> = eigen.eigenvalues.iter().map(|l| l.sqrt().recip()).collect();

    let k = i64::from(settings.max_steps);
    let total = grid_size(settings.max_steps, d)?;
    let side = (2 * k + 1) as usize;

    let mut thetas = Vec::new();
    let mut log_densities = Vec::new();
    for index in 0..total {
        let mut rem = index;
        let mut z = DVector::zeros(d);
        for j in 0..d {
            z[j] = ((rem % side) as i64 - k) as f64 * settings.step * scales[j];
            rem /= side;
        }
        let offset = &eigen.eigenvectors * z;
        let theta: Vec<f64> = mode.theta.iter().zip(offset.iter()).map(|(t, o)| t + o).collect();

        let Ok(lp) = f(&theta) else { continue };
        if !lp.is_finite() || mode.log_density - lp > settings.log_density_drop {
            continue;
        }
        thetas.push(theta);
        log_densities.push(lp);
    }

    if thetas.is_empty() {
        return Err(Error::NumericalInstability(
            "no usable grid point around the precision mode".to_string(),
        ));
    }

    let weights = normalize_log_weights(&log_densities);
    let log_cell_volume =
        d as f64 * settings.step.ln() + scales.iter().map(|s| s.ln()).sum::<f64>();
    let log_normalizer = log_sum_exp(&log_densities) + log_cell_volume;

    let points = thetas
        .into_iter()
        .zip(log_densities)
        .zip(weights)
        .map(|((theta, log_density), weight)| GridPoint {
            theta,
            log_density,
            weight,
        })
        .collect();

    Ok(HyperGrid {
        points,
        log_normalizer,
    })
}
