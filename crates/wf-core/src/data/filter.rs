//! Wave subsets of the region-filtered table.

use wf_common::{Error, IncidentRecord, Result};
use wf_config::WaveSpec;

/// Records sharing one wave flag set to true. Subsets own their records and
/// share nothing with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSubset {
    pub wave: WaveSpec,
    pub records: Vec<IncidentRecord>,
}

impl WaveSubset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fail with `EmptySubset` when no record belongs to the wave.
    pub fn ensure_non_empty(&self, region: &str) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptySubset {
                wave: self.wave.key.clone(),
                region: region.to_string(),
            });
        }
        Ok(())
    }
}
