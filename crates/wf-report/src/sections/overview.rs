//! Overview section data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overview section containing the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSection {
    /// Run identifier.
    pub run_id: String,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Duration in milliseconds.
    pub duration_ms: Option<u64>,

    // Input
    /// Input table path.
    pub data_path: String,
    /// Region the analysis is restricted to.
    pub region: String,
    /// Data rows read from the table.
    pub rows_read: usize,
    /// Rows kept after the region filter.
    pub rows_in_region: usize,

    // Model
    /// Name of the fitting engine.
    pub engine: String,
    /// Likelihood mode (`per_group` or `shared`).
    pub likelihood: String,
    pub credible_level: f64,

    // Configuration
    /// Where the configuration came from.
    pub config_source: String,
    /// Short hash of the effective configuration.
    pub config_id: String,

    // Counts
    pub waves_requested: usize,
    pub waves_succeeded: usize,
    pub waves_failed: usize,
}

impl OverviewSection {
    /// Get formatted duration.
    pub fn duration_formatted(&self) -> String {
        match self.duration_ms {
            Some(ms) if ms >= 60_000 => format!("{:.1} min", ms as f64 / 60_000.0),
            Some(ms) if ms >= 1_000 => format!("{:.1} s", ms as f64 / 1000.0),
            Some(ms) => format!("{} ms", ms),
            None => "N/A".to_string(),
        }
    }

    /// Overall run status.
    pub fn status(&self) -> &'static str {
        if self.waves_failed == 0 {
            "complete"
        } else if self.waves_succeeded > 0 {
            "partial"
        } else {
            "failed"
        }
    }
}
