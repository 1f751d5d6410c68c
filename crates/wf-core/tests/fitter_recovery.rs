//! The grid fitter on synthetic data with known coefficients.

use wf_common::ResponseGroup;
use wf_config::LikelihoodMode;
use wf_core::stack::stack;
use wf_core::{GridFitter, ModelFitter, ModelSpec, TransformedRecord};

const TT_INTERCEPT: f64 = 1.5;
const TT_SLOPES: (f64, f64) = (0.25, -0.4);
const BD_INTERCEPT: f64 = 3.0;
const BD_SLOPES: (f64, f64) = (-0.15, 0.3);

/// Three replicates of a 9 × 6 coordinate grid. Each replicate adds a
/// constant offset and the offsets sum to zero, so the noise is orthogonal to
/// the intercept and both coordinates.
fn synthetic(noise_scale: f64) -> Vec<TransformedRecord> {
    let offsets = [1.0, -0.5, -0.5];
    let mut records = Vec::new();
    for (rep, offset) in offsets.iter().enumerate() {
        for i in 0..54usize {
            let x = (i % 9) as f64 - 4.0;
            let y = (i / 9) as f64 - 2.5;
            let e = noise_scale * offset;
            records.push(TransformedRecord {
                line: (rep * 54 + i) as u64 + 2,
                xcoord: x,
                ycoord: y,
                log_travel_time: TT_INTERCEPT + TT_SLOPES.0 * x + TT_SLOPES.1 * y + e,
                log_border_distance: BD_INTERCEPT + BD_SLOPES.0 * x + BD_SLOPES.1 * y - e,
            });
        }
    }
    records
}

fn assert_covers(fit: &wf_common::FitSummary, term: &str, truth: f64) {
    let estimate = fit
        .fixed_effect(term)
        .unwrap_or_else(|| panic!("missing term {term}"));
    let s = estimate.summary;
    assert!(s.lower < truth && truth < s.upper, "{term}: {truth} not in {s:?}");
    assert!((s.mean - truth).abs() < 0.05, "{term}: mean {} vs {truth}", s.mean);
}

#[test]
fn recovers_slopes_and_group_intercepts() {
    let table = stack(&synthetic(0.3));
    let fit = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap();

    assert_covers(&fit, "x_tt", TT_SLOPES.0);
    assert_covers(&fit, "y_tt", TT_SLOPES.1);
    assert_covers(&fit, "x_bd", BD_SLOPES.0);
    assert_covers(&fit, "y_bd", BD_SLOPES.1);

    let tt = fit.group_intercept(ResponseGroup::TravelTime).unwrap().summary;
    let bd = fit.group_intercept(ResponseGroup::BorderDistance).unwrap().summary;
    assert!(tt.lower < TT_INTERCEPT && TT_INTERCEPT < tt.upper, "{tt:?}");
    assert!(bd.lower < BD_INTERCEPT && BD_INTERCEPT < bd.upper, "{bd:?}");

    // Both slopes on travel time are clearly non-zero.
    assert!(fit.fixed_effect("x_tt").unwrap().summary.excludes_zero());
}

#[test]
fn precisions_track_residual_variance() {
    let table = stack(&synthetic(0.3));
    let fit = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap();

    // Residual variance is 0.09 · mean(offset²) = 0.045 for both groups.
    let expected = 1.0 / 0.045;
    for hyper in &fit.hyperparameters {
        let s = hyper.summary;
        assert!(
            (s.median / expected - 1.0).abs() < 0.3,
            "{}: median {} vs {expected}",
            hyper.name,
            s.median
        );
        assert_eq!(hyper.groups.len(), 1);
    }
}

#[test]
fn criteria_are_finite_and_positive_for_unit_noise() {
    let table = stack(&synthetic(1.0));
    for likelihood in [LikelihoodMode::PerGroup, LikelihoodMode::Shared] {
        let mut spec = ModelSpec::default();
        spec.model.likelihood = likelihood;
        let fit = GridFitter::new().fit(&table, &spec).unwrap();
        let stats = &fit.statistics;

        assert!(stats.is_finite(), "{likelihood}: {stats:?}");
        assert!(stats.dic > 0.0, "{likelihood}: DIC {}", stats.dic);
        assert!(stats.waic > 0.0, "{likelihood}: WAIC {}", stats.waic);
        assert!(stats.dic_effective_parameters > 0.0);
        assert!(stats.effective_parameters < 7.0);
        assert_eq!(fit.observations, 324);
    }
}

#[test]
fn fitting_is_deterministic() {
    let table = stack(&synthetic(0.3));
    let first = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap();
    let second = GridFitter::new().fit(&table, &ModelSpec::default()).unwrap();
    assert_eq!(first, second);
}
