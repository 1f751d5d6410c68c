//! Delimited input table loader.
//!
//! Reads the incident table, checks that every configured column exists, and
//! keeps the rows of the configured region. Rows outside the region are not
//! parsed beyond their region field.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use wf_common::{Error, IncidentRecord, Result};
use wf_config::{DataSettings, WaveSpec};

use super::filter::WaveSubset;

/// Region-filtered incidents, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentTable {
    /// Display name of the source (usually the file path).
    pub source: String,
    /// Data rows read, excluding the header.
    pub rows_read: usize,
    /// Records whose region matched.
    pub records: Vec<IncidentRecord>,
}

impl IncidentTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records flagged for `wave`, in input order.
    pub fn wave_subset(&self, wave: &WaveSpec) -> WaveSubset {
        WaveSubset {
            wave: wave.clone(),
            records: self
                .records
                .iter()
                .filter(|r| r.in_wave(&wave.key))
                .cloned()
                .collect(),
        }
    }

    /// One independent subset per wave.
    pub fn wave_subsets(&self, waves: &[WaveSpec]) -> Vec<WaveSubset> {
        waves.iter().map(|w| self.wave_subset(w)).collect()
    }
}

/// Column positions resolved against the header row.
struct ColumnIndex {
    region: usize,
    xcoord: usize,
    ycoord: usize,
    travel_time: usize,
    border_distance: usize,
    flags: Vec<(String, String, usize)>,
}

/// Load incidents from the file named in `settings.path`.
pub fn load_incidents(settings: &DataSettings, waves: &[WaveSpec]) -> Result<IncidentTable> {
    let path = Path::new(&settings.path);
    let file = File::open(path)
        .map_err(|e| Error::Data(format!("cannot open {}: {}", path.display(), e)))?;
    load_incidents_from_reader(file, &path.display().to_string(), settings, waves)
}

/// Load incidents from any reader. `source_name` is used in error messages.
pub fn load_incidents_from_reader<R: Read>(
    reader: R,
    source_name: &str,
    settings: &DataSettings,
    waves: &[WaveSpec],
) -> Result<IncidentTable> {
    let delimiter = u8::try_from(settings.delimiter).map_err(|_| {
        Error::InvalidConfig(format!(
            "delimiter {:?} is not a single byte",
            settings.delimiter
        ))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Data(format!("{}: {}", source_name, e)))?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    let index = resolve_columns(&headers, source_name, settings, waves)?;
    let columns = &settings.columns;

    let mut rows_read = 0usize;
    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::Data(format!("{}: {}", source_name, e)))?;
        rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);

        let region = record.get(index.region).unwrap_or("").trim();
        if region != settings.region {
            continue;
        }

        let field = |idx: usize| record.get(idx).unwrap_or("");

        let mut wave_flags = BTreeSet::new();
        for (key, column, idx) in &index.flags {
            if parse_flag(field(*idx), column, line)? {
                wave_flags.insert(key.clone());
            }
        }

        records.push(IncidentRecord {
            line,
            xcoord: parse_number(field(index.xcoord), &columns.xcoord, line)?,
            ycoord: parse_number(field(index.ycoord), &columns.ycoord, line)?,
            travel_time: parse_number(field(index.travel_time), &columns.travel_time, line)?,
            border_distance_km: parse_number(
                field(index.border_distance),
                &columns.border_distance,
                line,
            )?,
            wave_flags,
        });
    }

    debug!(
        source = source_name,
        rows_read,
        rows_in_region = records.len(),
        region = %settings.region,
        "Input table parsed"
    );

    Ok(IncidentTable {
        source: source_name.to_string(),
        rows_read,
        records,
    })
}

fn resolve_columns(
    headers: &[String],
    source_name: &str,
    settings: &DataSettings,
    waves: &[WaveSpec],
) -> Result<ColumnIndex> {
    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn {
                column: name.to_string(),
                source_name: source_name.to_string(),
            })
    };

    let columns = &settings.columns;
    let mut flags = Vec::with_capacity(waves.len());
    for wave in waves {
        flags.push((wave.key.clone(), wave.flag_column.clone(), find(&wave.flag_column)?));
    }

    Ok(ColumnIndex {
        region: find(&settings.region_column)?,
        xcoord: find(&columns.xcoord)?,
        ycoord: find(&columns.ycoord)?,
        travel_time: find(&columns.travel_time)?,
        border_distance: find(&columns.border_distance)?,
        flags,
    })
}

fn parse_number(raw: &str, column: &str, line: u64) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::MalformedValue {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Parse a boolean wave flag: `1/0`, `true/false`, `t/f`, `yes/no`, `y/n`
/// (case-insensitive).
pub fn parse_flag(raw: &str, column: &str, line: u64) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        _ => Err(Error::MalformedValue {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_config::AnalysisConfig;

    const TABLE: &str = "\
Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km
Western Europe,1,0,2.35,48.85,12.5,40.2
North America,1,1,-74.0,40.7,3.0,500.0
Western Europe,0,TRUE,-3.7,40.4,0,0
Western Europe,no,yes,13.4,52.5,7.25,88.0
";

    fn load(text: &str) -> Result<IncidentTable> {
        let config = AnalysisConfig::default();
        load_incidents_from_reader(text.as_bytes(), "test.csv", &config.data, &config.waves)
    }

    #[test]
    fn keeps_region_rows_in_order() {
        let table = load(TABLE).unwrap();
        assert_eq!(table.rows_read, 4);
        assert_eq!(table.len(), 3);
        assert_eq!(table.records[0].line, 2);
        assert_eq!(table.records[1].line, 4);
        assert_eq!(table.records[1].travel_time, 0.0);
        assert!(table.records[0].in_wave("third"));
        assert!(!table.records[0].in_wave("fourth"));
        assert!(table.records[1].in_wave("fourth"));
    }

    #[test]
    fn wave_subsets_are_independent() {
        let config = AnalysisConfig::default();
        let table = load(TABLE).unwrap();
        let subsets = table.wave_subsets(&config.waves);
        assert_eq!(subsets[0].len(), 1);
        assert_eq!(subsets[1].len(), 2);
        assert_eq!(subsets[1].records[0].xcoord, -3.7);
    }

    #[test]
    fn missing_column_names_column_and_source() {
        let text = "Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average\n";
        let err = load(text).unwrap_err();
        match err {
            Error::MissingColumn {
                column,
                source_name,
            } => {
                assert_eq!(column, "B_Dist_km");
                assert_eq!(source_name, "test.csv");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_value_in_region_row_is_fatal() {
        let text = "\
Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km
Western Europe,1,0,2.35,48.85,abc,40.2
";
        let err = load(text).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedValue { line: 2, ref column, ref value }
                if column == "Travel_Time_Average" && value == "abc"
        ));
    }

    #[test]
    fn malformed_value_outside_region_is_ignored() {
        let text = "\
Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km
South Asia,maybe,0,x,y,abc,NaN
Western Europe,1,0,2.35,48.85,1,2
";
        let table = load(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows_read, 2);
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let text = "\
Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km
Western Europe,1,0,inf,48.85,1,2
";
        assert!(matches!(load(text).unwrap_err(), Error::MalformedValue { .. }));
    }

    #[test]
    fn negative_values_are_loaded_for_the_transform_to_reject() {
        let text = "\
Region,Third_Wave,Fourth_Wave,xcoord,ycoord,Travel_Time_Average,B_Dist_km
Western Europe,1,0,1,2,-1,2
";
        let table = load(text).unwrap();
        assert_eq!(table.records[0].travel_time, -1.0);
    }

    #[test]
    fn flag_parsing() {
        for raw in ["1", "TRUE", " yes ", "t", "Y"] {
            assert!(parse_flag(raw, "Third_Wave", 2).unwrap(), "{raw}");
        }
        for raw in ["0", "false", "No", "F"] {
            assert!(!parse_flag(raw, "Third_Wave", 2).unwrap(), "{raw}");
        }
        assert!(parse_flag("", "Third_Wave", 2).is_err());
        assert!(parse_flag("2", "Third_Wave", 2).is_err());
    }

    #[test]
    fn custom_delimiter_and_padded_headers() {
        let mut config = AnalysisConfig::default();
        config.data.delimiter = ';';
        let text = "Region ; Third_Wave;Fourth_Wave;xcoord;ycoord;Travel_Time_Average;B_Dist_km\n\
Western Europe;1;0;1;2;3;4\n";
        let table =
            load_incidents_from_reader(text.as_bytes(), "semi.csv", &config.data, &config.waves)
                .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].border_distance_km, 4.0);
    }
}
