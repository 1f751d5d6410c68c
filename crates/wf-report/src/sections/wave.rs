//! Per-wave results section.

use serde::{Deserialize, Serialize};
use wf_common::{CoefficientEstimate, FitSummary};

/// Fitted results for one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSection {
    /// Wave key (`third`, `fourth`).
    pub key: String,
    /// Display label.
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Incidents in the wave subset.
    pub records: usize,
    /// Rows in the stacked table (twice `records`).
    pub stacked_rows: usize,
    pub fit: FitSummary,
}

impl WaveSection {
    /// Heading used in the rendered report.
    pub fn heading(&self) -> String {
        match &self.description {
            Some(desc) => format!("{} ({})", self.label, desc),
            None => self.label.clone(),
        }
    }

    /// Fixed effects whose credible interval excludes zero.
    pub fn credible_effects(&self) -> Vec<&CoefficientEstimate> {
        self.fit
            .fixed_effects
            .iter()
            .filter(|c| c.term != "(Intercept)" && c.summary.excludes_zero())
            .collect()
    }
}

/// Human label for a model term.
pub fn term_label(term: &str) -> &str {
    match term {
        "(Intercept)" => "Global intercept",
        "x_tt" => "xcoord (travel time)",
        "y_tt" => "ycoord (travel time)",
        "x_bd" => "xcoord (border distance)",
        "y_bd" => "ycoord (border distance)",
        other => other,
    }
}

/// Covariate a slope term refers to, if any.
pub fn term_covariate(term: &str) -> Option<&'static str> {
    match term.split('_').next() {
        Some("x") => Some("xcoord"),
        Some("y") => Some("ycoord"),
        _ => None,
    }
}
