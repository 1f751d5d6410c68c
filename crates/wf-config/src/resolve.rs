//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variable → XDG path → defaults.

use std::path::{Path, PathBuf};

use crate::analysis::AnalysisConfig;
use crate::validate::{ValidationError, ValidationResult};

/// Where the analysis configuration was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via `--config`.
    CliArgument,

    /// Set via `WAVEFIT_CONFIG`.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable naming the configuration file.
pub const ENV_CONFIG_PATH: &str = "WAVEFIT_CONFIG";

const CONFIG_FILENAME: &str = "analysis.json";

/// Application name for XDG directories.
const APP_NAME: &str = "wavefit";

/// A configuration path together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigPath {
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// A loaded configuration plus the raw file content it was parsed from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AnalysisConfig,
    pub path: ConfigPath,
    /// Raw JSON content; `None` when running on built-in defaults.
    pub raw: Option<String>,
}

/// Resolve the configuration file path.
///
/// CLI and environment paths are returned whether or not the file exists;
/// the XDG location is only used when the file is present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> ConfigPath {
    if let Some(path) = cli_path {
        return ConfigPath {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        if !env_path.trim().is_empty() {
            return ConfigPath {
                path: Some(PathBuf::from(env_path)),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.is_file() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    ConfigPath::default()
}

/// Resolve, load and validate the analysis configuration.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<ResolvedConfig> {
    let path = resolve_config_path(cli_path);

    let (config, raw) = match &path.path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", p.display(), e))
            })?;
            (AnalysisConfig::from_json(&raw)?, Some(raw))
        }
        None => (AnalysisConfig::default(), None),
    };

    crate::validate::validate_config(&config)?;

    Ok(ResolvedConfig { config, path, raw })
}

/// Get the XDG config directory for wavefit.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
