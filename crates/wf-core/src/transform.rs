//! The `log(x + 1)` response transform.

use serde::{Deserialize, Serialize};
use wf_common::{Error, Result};
use wf_config::ColumnNames;

use crate::data::WaveSubset;

/// One incident with both responses on the log scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub line: u64,
    pub xcoord: f64,
    pub ycoord: f64,
    pub log_travel_time: f64,
    pub log_border_distance: f64,
}

/// `ln(1 + value)` for finite `value >= 0`.
///
/// Negative values are rejected before transforming; NaN and infinities are
/// malformed.
pub fn log1p_checked(value: f64, column: &str, line: u64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::MalformedValue {
            line,
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(Error::NegativeValue {
            line,
            column: column.to_string(),
            value,
        });
    }
    Ok(value.ln_1p())
}

/// Transform both responses of every record, preserving order.
pub fn transform_subset(
    subset: &WaveSubset,
    columns: &ColumnNames,
) -> Result<Vec<TransformedRecord>> {
    subset
        .records
        .iter()
        .map(|r| {
            Ok(TransformedRecord {
                line: r.line,
                xcoord: r.xcoord,
                ycoord: r.ycoord,
                log_travel_time: log1p_checked(r.travel_time, &columns.travel_time, r.line)?,
                log_border_distance: log1p_checked(
                    r.border_distance_km,
                    &columns.border_distance,
                    r.line,
                )?,
            })
        })
        .collect()
}
