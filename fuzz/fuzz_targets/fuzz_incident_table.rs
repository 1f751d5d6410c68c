//! Fuzz target for the incident table reader.
//!
//! Feeds arbitrary bytes through load → subset → transform → stack. Every
//! stage must return an error instead of panicking, and a successful stack
//! always has two rows per record.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wf_config::AnalysisConfig;
use wf_core::data::load_incidents_from_reader;
use wf_core::stack::stack;
use wf_core::transform_subset;

fuzz_target!(|data: &[u8]| {
    let config = AnalysisConfig::default();
    let Ok(table) = load_incidents_from_reader(data, "fuzz.csv", &config.data, &config.waves)
    else {
        return;
    };
    for subset in table.wave_subsets(&config.waves) {
        if let Ok(records) = transform_subset(&subset, &config.data.columns) {
            assert_eq!(stack(&records).len(), 2 * records.len());
        }
    }
});
