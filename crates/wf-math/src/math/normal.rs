//! Normal distribution helpers used to summarise Gaussian posterior marginals.
//!
//! The CDF is evaluated through the regularized incomplete gamma function,
//! `erf(x) = P(1/2, x²)`, so the lower tail keeps relative accuracy.

use super::gamma::{gamma_p, gamma_q};
use super::stable::LOG_SQRT_2PI;

/// Log density of N(mean, variance) at x.
pub fn normal_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    if x.is_nan() || mean.is_nan() || variance.is_nan() || variance <= 0.0 {
        return f64::NAN;
    }
    let r = x - mean;
    -LOG_SQRT_2PI - 0.5 * variance.ln() - 0.5 * r * r / variance
}

/// Standard normal CDF Φ(z).
pub fn standard_normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return 1.0;
    }
    if z == f64::NEG_INFINITY {
        return 0.0;
    }
    let half_sq = 0.5 * z * z;
    if z >= 0.0 {
        0.5 * (1.0 + gamma_p(0.5, half_sq))
    } else {
        0.5 * gamma_q(0.5, half_sq)
    }
}

/// CDF of N(mean, sd²) at x.
pub fn normal_cdf(x: f64, mean: f64, sd: f64) -> f64 {
    if sd <= 0.0 || sd.is_nan() {
        return f64::NAN;
    }
    standard_normal_cdf((x - mean) / sd)
}

// Acklam's rational approximation, refined with one Halley step.
const ACKLAM_A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_69e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const ACKLAM_B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const ACKLAM_C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const ACKLAM_D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];
const P_LOW: f64 = 0.024_25;

/// Inverse standard normal CDF (probit).
///
/// Returns ±inf at 0 and 1, NaN outside [0, 1].
pub fn standard_normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((ACKLAM_C[0] * q + ACKLAM_C[1]) * q + ACKLAM_C[2]) * q + ACKLAM_C[3]) * q
            + ACKLAM_C[4])
            * q
            + ACKLAM_C[5])
            / ((((ACKLAM_D[0] * q + ACKLAM_D[1]) * q + ACKLAM_D[2]) * q + ACKLAM_D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((ACKLAM_A[0] * r + ACKLAM_A[1]) * r + ACKLAM_A[2]) * r + ACKLAM_A[3]) * r
            + ACKLAM_A[4])
            * r
            + ACKLAM_A[5])
            * q
            / (((((ACKLAM_B[0] * r + ACKLAM_B[1]) * r + ACKLAM_B[2]) * r + ACKLAM_B[3]) * r
                + ACKLAM_B[4])
                * r
                + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((ACKLAM_C[0] * q + ACKLAM_C[1]) * q + ACKLAM_C[2]) * q + ACKLAM_C[3]) * q
            + ACKLAM_C[4])
            * q
            + ACKLAM_C[5])
            / ((((ACKLAM_D[0] * q + ACKLAM_D[1]) * q + ACKLAM_D[2]) * q + ACKLAM_D[3]) * q + 1.0)
    };

    let e = standard_normal_cdf(x) - p;
    let u = e * (2.0 * std::f64::consts::PI).sqrt() * (0.5 * x * x).exp();
    x - u / (1.0 + 0.5 * x * u)
}
