//! Incident records and response groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One geocoded incident from the input table.
///
/// Records are immutable once loaded; wave membership is the set of wave keys
/// whose flag column was true on this row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// 1-based line number in the source file (header is line 1).
    pub line: u64,
    pub xcoord: f64,
    pub ycoord: f64,
    /// Average travel time to the nearest border crossing.
    pub travel_time: f64,
    /// Distance to the nearest border, in kilometres.
    pub border_distance_km: f64,
    pub wave_flags: BTreeSet<String>,
}

impl IncidentRecord {
    pub fn in_wave(&self, key: &str) -> bool {
        self.wave_flags.contains(key)
    }
}

/// The two stacked response variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseGroup {
    TravelTime,
    BorderDistance,
}

impl ResponseGroup {
    /// Both groups in stacking order.
    pub const ALL: [ResponseGroup; 2] = [ResponseGroup::TravelTime, ResponseGroup::BorderDistance];

    /// Group label used in the stacked table.
    pub fn label(self) -> &'static str {
        match self {
            ResponseGroup::TravelTime => "travel_time",
            ResponseGroup::BorderDistance => "border_distance",
        }
    }

    /// Suffix of the group-specific covariate names (`x_tt`, `y_bd`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            ResponseGroup::TravelTime => "tt",
            ResponseGroup::BorderDistance => "bd",
        }
    }

    /// Human description of the transformed response.
    pub fn response_description(self) -> &'static str {
        match self {
            ResponseGroup::TravelTime => "log(travel time + 1)",
            ResponseGroup::BorderDistance => "log(border distance km + 1)",
        }
    }

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        match self {
            ResponseGroup::TravelTime => 0,
            ResponseGroup::BorderDistance => 1,
        }
    }
}

impl std::fmt::Display for ResponseGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_labels_and_suffixes() {
        assert_eq!(ResponseGroup::TravelTime.label(), "travel_time");
        assert_eq!(ResponseGroup::BorderDistance.suffix(), "bd");
        assert_eq!(ResponseGroup::ALL[1].index(), 1);
    }

    #[test]
    fn group_serializes_snake_case() {
        let json = serde_json::to_string(&ResponseGroup::BorderDistance).unwrap();
        assert_eq!(json, r#""border_distance""#);
    }

    #[test]
    fn wave_membership() {
        let record = IncidentRecord {
            line: 2,
            xcoord: 1.0,
            ycoord: 2.0,
            travel_time: 0.0,
            border_distance_km: 0.0,
            wave_flags: ["third".to_string()].into_iter().collect(),
        };
        assert!(record.in_wave("third"));
        assert!(!record.in_wave("fourth"));
    }
}
