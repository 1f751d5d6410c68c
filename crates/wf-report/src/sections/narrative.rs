//! Narrative text derived from fitted summaries.
//!
//! Every sentence is built from values already present in the summary; no
//! statistics are computed here.

use wf_common::{CoefficientEstimate, FitStatistics, ResponseGroup};

use super::wave::{term_covariate, WaveSection};
use crate::format::{interval, level_label, number};

/// Sentence describing one group-specific slope.
pub fn describe_slope(coef: &CoefficientEstimate, level: f64, decimals: usize) -> String {
    let s = &coef.summary;
    let covariate = term_covariate(&coef.term).unwrap_or(coef.term.as_str());
    let response = coef
        .group
        .map(ResponseGroup::response_description)
        .unwrap_or("the response");
    let direction = if s.mean >= 0.0 { "increase" } else { "decrease" };

    let verdict = if s.excludes_zero() {
        let sign = if s.lower > 0.0 { "positive" } else { "negative" };
        format!("the interval excludes zero, so the association is credibly {}", sign)
    } else {
        "the interval includes zero, so the direction of the association is uncertain".to_string()
    };

    format!(
        "A one-unit increase in {} is associated with an expected {} of {} in {} ({} {}); {}.",
        covariate,
        direction,
        number(s.mean.abs(), decimals),
        response,
        level_label(level),
        interval(s.lower, s.upper, decimals),
        verdict
    )
}

/// Sentence describing a group's combined intercept.
pub fn describe_intercept(coef: &CoefficientEstimate, level: f64, decimals: usize) -> String {
    let s = &coef.summary;
    let response = coef
        .group
        .map(ResponseGroup::response_description)
        .unwrap_or("the response");
    format!(
        "At xcoord = ycoord = 0 the expected {} is {} ({} {}).",
        response,
        number(s.mean, decimals),
        level_label(level),
        interval(s.lower, s.upper, decimals)
    )
}

/// Closing sentences on the information criteria.
///
/// Gaussian deviance is negative once the residual variance is small, so
/// negative criteria get an extra sentence saying they are still comparable.
pub fn describe_statistics(stats: &FitStatistics, decimals: usize) -> String {
    let mut text = format!(
        "The joint model has DIC {} (pD {}) and WAIC {} (p_WAIC {}), with {} effective parameters; \
         lower criteria indicate a better balance of fit and complexity.",
        number(stats.dic, decimals.min(2)),
        number(stats.dic_effective_parameters, decimals.min(2)),
        number(stats.waic, decimals.min(2)),
        number(stats.waic_effective_parameters, decimals.min(2)),
        number(stats.effective_parameters, decimals.min(2)),
    );
    if stats.dic < 0.0 || stats.waic < 0.0 {
        text.push_str(
            " Negative values are expected when the responses are nearly deterministic \
             given the coordinates, since the Gaussian density then exceeds one; \
             the criteria remain comparable across models on the same data.",
        );
    }
    text
}

/// Full narrative paragraph list for one wave.
pub fn wave_narrative(wave: &WaveSection, decimals: usize) -> Vec<String> {
    let level = wave.fit.credible_level;
    let mut paragraphs = Vec::new();

    paragraphs.push(format!(
        "The {} subset contains {} incidents, stacked into {} observations across the two responses.",
        wave.label, wave.records, wave.stacked_rows
    ));

    for group in ResponseGroup::ALL {
        let mut sentences = Vec::new();
        if let Some(intercept) = wave.fit.group_intercept(group) {
            sentences.push(describe_intercept(intercept, level, decimals));
        }
        for coef in wave
            .fit
            .fixed_effects
            .iter()
            .filter(|c| c.group == Some(group))
        {
            sentences.push(describe_slope(coef, level, decimals));
        }
        if !sentences.is_empty() {
            paragraphs.push(sentences.join(" "));
        }
    }

    let credible = wave.credible_effects();
    if credible.is_empty() {
        paragraphs.push(
            "None of the coordinate effects has a credible interval excluding zero.".to_string(),
        );
    } else {
        let terms: Vec<&str> = credible.iter().map(|c| c.term.as_str()).collect();
        paragraphs.push(format!(
            "Effects with credible intervals excluding zero: {}.",
            terms.join(", ")
        ));
    }

    paragraphs.push(describe_statistics(&wave.fit.statistics, decimals));
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_common::MarginalSummary;

    fn coef(term: &str, group: ResponseGroup, lower: f64, mean: f64, upper: f64) -> CoefficientEstimate {
        CoefficientEstimate {
            term: term.to_string(),
            group: Some(group),
            summary: MarginalSummary {
                mean,
                sd: 0.1,
                lower,
                median: mean,
                upper,
            },
        }
    }

    #[test]
    fn test_slope_excluding_zero() {
        let c = coef("x_tt", ResponseGroup::TravelTime, 0.1, 0.2, 0.3);
        let text = describe_slope(&c, 0.95, 2);
        assert!(text.contains("xcoord"));
        assert!(text.contains("log(travel time + 1)"));
        assert!(text.contains("increase of 0.20"));
        assert!(text.contains("95% CrI [0.10, 0.30]"));
        assert!(text.contains("credibly positive"));
    }

    #[test]
    fn test_negative_slope_including_zero() {
        let c = coef("y_bd", ResponseGroup::BorderDistance, -0.5, -0.2, 0.1);
        let text = describe_slope(&c, 0.9, 1);
        assert!(text.contains("decrease of 0.2"));
        assert!(text.contains("90% CrI"));
        assert!(text.contains("direction of the association is uncertain"));
    }

    fn statistics(dic: f64, waic: f64) -> FitStatistics {
        FitStatistics {
            dic,
            mean_deviance: dic - 7.0,
            deviance_at_mean: dic - 14.0,
            dic_effective_parameters: 7.0,
            waic,
            waic_effective_parameters: 7.2,
            lppd: -waic / 2.0,
            effective_parameters: 6.8,
            log_marginal_likelihood: -40.0,
            group_dic: Vec::new(),
        }
    }

    #[test]
    fn test_statistics_sentence() {
        let text = describe_statistics(&statistics(55.5, 56.1), 3);
        assert!(text.contains("DIC 55.50 (pD 7.00)"));
        assert!(text.contains("WAIC 56.10"));
        assert!(!text.contains("Negative values"));
    }

    #[test]
    fn test_negative_criteria_are_explained() {
        let text = describe_statistics(&statistics(-812.4, -805.9), 2);
        assert!(text.contains("DIC -812.40"));
        assert!(text.contains("Negative values are expected"));
        assert!(text.contains("nearly deterministic"));

        let mixed = describe_statistics(&statistics(3.0, -1.0), 2);
        assert!(mixed.contains("Negative values are expected"));
    }

    #[test]
    fn test_intercept_sentence() {
        let c = coef("intercept_bd", ResponseGroup::BorderDistance, 2.0, 2.5, 3.0);
        let text = describe_intercept(&c, 0.95, 1);
        assert!(text.contains("log(border distance km + 1) is 2.5"));
    }
}
