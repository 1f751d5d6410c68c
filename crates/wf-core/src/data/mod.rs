//! Input table loading and wave subsetting.

pub mod filter;
pub mod loader;

pub use filter::WaveSubset;
pub use loader::{load_incidents, load_incidents_from_reader, parse_flag, IncidentTable};
