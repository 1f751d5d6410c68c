//! Configuration snapshots for reproducible reports.
//!
//! A snapshot captures the configuration a run actually used, so two reports
//! can be compared by hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::AnalysisConfig;
use crate::resolve::ResolvedConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// SHA-256 of the effective configuration, serialized canonically.
    pub config_hash: String,

    /// SHA-256 of the raw file content, when a file was loaded.
    #[serde(default)]
    pub file_hash: Option<String>,

    pub summary: ConfigSummary,
}

/// Key configuration values for quick reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub data_path: String,
    pub region: String,
    pub waves: Vec<String>,
    pub likelihood: String,
    pub credible_level: f64,
}

impl ConfigSnapshot {
    /// Snapshot a resolved configuration after CLI overrides were applied.
    pub fn new(resolved: &ResolvedConfig, effective: &AnalysisConfig) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: effective.schema_version.clone(),
            path: resolved.path.path.as_ref().map(|p| p.display().to_string()),
            source: resolved.path.source.to_string(),
            config_hash: hash_config(effective),
            file_hash: resolved.raw.as_deref().map(hash_content),
            summary: ConfigSummary::from_config(effective),
        }
    }

    /// Snapshot of built-in defaults with no file loaded.
    pub fn defaults_only() -> Self {
        let config = AnalysisConfig::default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            path: None,
            source: crate::resolve::ConfigSource::BuiltinDefault.to_string(),
            config_hash: hash_config(&config),
            file_hash: None,
            summary: ConfigSummary::from_config(&config),
        }
    }

    /// Check if this snapshot describes the same effective configuration.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Short identifier (first 12 chars of the config hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &AnalysisConfig) -> Self {
        ConfigSummary {
            data_path: config.data.path.clone(),
            region: config.data.region.clone(),
            waves: config.waves.iter().map(|w| w.key.clone()).collect(),
            likelihood: config.model.likelihood.to_string(),
            credible_level: config.integration.credible_level,
        }
    }
}

fn hash_config(config: &AnalysisConfig) -> String {
    // Struct field order is fixed, so this serialization is stable.
    match serde_json::to_string(config) {
        Ok(json) => hash_content(&json),
        Err(_) => hash_content(""),
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{ConfigPath, ConfigSource};

    fn resolved(raw: Option<&str>) -> ResolvedConfig {
        ResolvedConfig {
            config: AnalysisConfig::default(),
            path: ConfigPath {
                path: raw.map(|_| "/tmp/analysis.json".into()),
                source: if raw.is_some() {
                    ConfigSource::CliArgument
                } else {
                    ConfigSource::BuiltinDefault
                },
            },
            raw: raw.map(str::to_string),
        }
    }

    #[test]
    fn test_defaults_snapshot() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert!(snapshot.file_hash.is_none());
        assert_eq!(snapshot.source, "builtin default");
        assert_eq!(snapshot.summary.waves, vec!["third", "fourth"]);
        assert_eq!(snapshot.config_hash.len(), 64);
    }

    #[test]
    fn test_same_config_same_hash() {
        let a = ConfigSnapshot::new(&resolved(None), &AnalysisConfig::default());
        let b = ConfigSnapshot::defaults_only();
        assert!(a.matches(&b));
        assert_eq!(a.short_id().len(), 12);
    }

    #[test]
    fn test_override_changes_hash() {
        let mut changed = AnalysisConfig::default();
        changed.data.region = "South America".to_string();
        let a = ConfigSnapshot::new(&resolved(Some("{}")), &changed);
        let b = ConfigSnapshot::defaults_only();
        assert!(!a.matches(&b));
        assert_eq!(a.summary.region, "South America");
        assert!(a.file_hash.is_some());
        assert_eq!(a.path.as_deref(), Some("/tmp/analysis.json"));
    }
}
