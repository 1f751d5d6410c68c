//! Fuzz target for analysis.json parsing and validation.
//!
//! Arbitrary bytes must parse to a config or an error, and any parsed config
//! must validate or be rejected without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wf_config::{validate_config, AnalysisConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = AnalysisConfig::from_json(json) {
        let _ = validate_config(&config);
    }
});
