//! Long-format stacking of the two responses.
//!
//! For N transformed records the table holds 2N observations: N travel-time
//! observations followed by N border-distance observations, both in input
//! order. Each observation carries only its own group's covariates; the
//! null-masked column view is derived on demand.

use std::io::Write;

use serde::{Deserialize, Serialize};
use wf_common::{Error, ResponseGroup, Result};

use crate::transform::TransformedRecord;

/// One row of the stacked table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "group", rename_all = "snake_case")]
pub enum Observation {
    TravelTime { x: f64, y: f64, response: f64 },
    BorderDistance { x: f64, y: f64, response: f64 },
}

impl Observation {
    pub fn group(&self) -> ResponseGroup {
        match self {
            Observation::TravelTime { .. } => ResponseGroup::TravelTime,
            Observation::BorderDistance { .. } => ResponseGroup::BorderDistance,
        }
    }

    pub fn response(&self) -> f64 {
        match *self {
            Observation::TravelTime { response, .. }
            | Observation::BorderDistance { response, .. } => response,
        }
    }

    /// `(x, y)` covariates.
    pub fn coords(&self) -> (f64, f64) {
        match *self {
            Observation::TravelTime { x, y, .. } | Observation::BorderDistance { x, y, .. } => {
                (x, y)
            }
        }
    }

    /// Null-masked view of this observation.
    pub fn masked(&self) -> MaskedRow {
        let (x, y) = self.coords();
        match self.group() {
            ResponseGroup::TravelTime => MaskedRow {
                group: ResponseGroup::TravelTime,
                response: self.response(),
                x_tt: Some(x),
                y_tt: Some(y),
                x_bd: None,
                y_bd: None,
            },
            ResponseGroup::BorderDistance => MaskedRow {
                group: ResponseGroup::BorderDistance,
                response: self.response(),
                x_tt: None,
                y_tt: None,
                x_bd: Some(x),
                y_bd: Some(y),
            },
        }
    }
}

/// The long-format row with group-specific covariate columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskedRow {
    pub group: ResponseGroup,
    pub response: f64,
    pub x_tt: Option<f64>,
    pub y_tt: Option<f64>,
    pub x_bd: Option<f64>,
    pub y_bd: Option<f64>,
}

impl MaskedRow {
    /// The non-null covariate pair, if exactly one pair is present.
    pub fn active_pair(&self) -> Option<(f64, f64)> {
        match (self.x_tt, self.y_tt, self.x_bd, self.y_bd) {
            (Some(x), Some(y), None, None) => Some((x, y)),
            (None, None, Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

/// The stacked long-format table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StackedTable {
    observations: Vec<Observation>,
}

impl StackedTable {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Masked view of row `i`.
    pub fn masked_row(&self, i: usize) -> Option<MaskedRow> {
        self.observations.get(i).map(Observation::masked)
    }

    pub fn masked_rows(&self) -> impl Iterator<Item = MaskedRow> + '_ {
        self.observations.iter().map(Observation::masked)
    }

    /// Number of observations in `group`.
    pub fn group_count(&self, group: ResponseGroup) -> usize {
        self.observations
            .iter()
            .filter(|o| o.group() == group)
            .count()
    }

    /// Responses of `group`, in table order.
    pub fn responses(&self, group: ResponseGroup) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|o| o.group() == group)
            .map(Observation::response)
            .collect()
    }

    /// Write the masked long table as CSV with empty cells for nulls.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| Error::Io(std::io::Error::other(e.to_string()));

        out.write_record(["group", "response", "x_tt", "y_tt", "x_bd", "y_bd"])
            .map_err(csv_err)?;
        for row in self.masked_rows() {
            let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
            out.write_record([
                row.group.label().to_string(),
                row.response.to_string(),
                cell(row.x_tt),
                cell(row.y_tt),
                cell(row.x_bd),
                cell(row.y_bd),
            ])
            .map_err(csv_err)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Stack transformed records into the 2N-row long table.
pub fn stack(records: &[TransformedRecord]) -> StackedTable {
    let travel = records.iter().map(|r| Observation::TravelTime {
        x: r.xcoord,
        y: r.ycoord,
        response: r.log_travel_time,
    });
    let border = records.iter().map(|r| Observation::BorderDistance {
        x: r.xcoord,
        y: r.ycoord,
        response: r.log_border_distance,
    });
    StackedTable {
        observations: travel.chain(border).collect(),
    }
}
