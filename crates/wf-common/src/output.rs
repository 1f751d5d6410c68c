//! Output format specifications.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable Markdown report with narrative (default)
    #[default]
    Md,

    /// Structured JSON for downstream tooling
    Json,

    /// One line per wave for quick checks
    Summary,
}

impl OutputFormat {
    /// Whether the format is meant for machines rather than people.
    pub fn is_machine_readable(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Md => write!(f, "md"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for format in [OutputFormat::Md, OutputFormat::Json, OutputFormat::Summary] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
    }

    #[test]
    fn only_json_is_machine_readable() {
        assert!(OutputFormat::Json.is_machine_readable());
        assert!(!OutputFormat::Md.is_machine_readable());
    }
}
