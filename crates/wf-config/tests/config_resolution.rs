//! Configuration resolution and loading tests against real files.
//!
//! Covers:
//! - Resolution order (CLI > env > XDG > defaults)
//! - Partial files merged with defaults
//! - Validation failures surfaced from load_config
//! - Snapshot hashes of loaded files

use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tempfile::TempDir;
use wf_config::resolve::ENV_CONFIG_PATH;
use wf_config::{
    load_config, resolve_config_path, AnalysisConfig, ConfigSnapshot, ConfigSource,
    LikelihoodMode, ValidationError,
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(path: &Path, json: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config parent");
    }
    fs::write(path, json).expect("write config");
}

#[test]
fn cli_path_beats_environment() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH]);
        let dir = TempDir::new().expect("tempdir");
        let cli = dir.path().join("cli.json");
        let from_env = dir.path().join("env.json");
        write_config(&cli, r#"{"data": {"region": "North America"}}"#);
        write_config(&from_env, r#"{"data": {"region": "South Asia"}}"#);
        env::set_var(ENV_CONFIG_PATH, &from_env);

        let resolved = load_config(Some(&cli)).expect("load");
        assert_eq!(resolved.path.source, ConfigSource::CliArgument);
        assert_eq!(resolved.config.data.region, "North America");
    });
}

#[test]
fn environment_used_without_cli() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH]);
        let dir = TempDir::new().expect("tempdir");
        let from_env = dir.path().join("env.json");
        write_config(
            &from_env,
            r#"{"model": {"likelihood": "shared"}, "report": {"decimals": 2}}"#,
        );
        env::set_var(ENV_CONFIG_PATH, &from_env);

        let resolved = load_config(None).expect("load");
        assert_eq!(resolved.path.source, ConfigSource::Environment);
        assert_eq!(resolved.config.model.likelihood, LikelihoodMode::Shared);
        assert_eq!(resolved.config.report.decimals, 2);
        assert_eq!(resolved.config.waves.len(), 2);
    });
}

#[test]
fn xdg_config_used_when_present() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, "XDG_CONFIG_HOME"]);
        env::remove_var(ENV_CONFIG_PATH);
        let dir = TempDir::new().expect("tempdir");
        env::set_var("XDG_CONFIG_HOME", dir.path());

        let resolved = resolve_config_path(None);
        if cfg!(target_os = "linux") {
            assert_eq!(resolved.source, ConfigSource::BuiltinDefault);
            assert!(resolved.path.is_none());

            write_config(
                &dir.path().join("wavefit").join("analysis.json"),
                r#"{"integration": {"credible_level": 0.9}}"#,
            );
            let resolved = load_config(None).expect("load");
            assert_eq!(resolved.path.source, ConfigSource::XdgConfig);
            assert_eq!(resolved.config.integration.credible_level, 0.9);
        }
    });
}

#[test]
fn defaults_when_nothing_configured() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, "XDG_CONFIG_HOME"]);
        env::remove_var(ENV_CONFIG_PATH);
        let dir = TempDir::new().expect("tempdir");
        env::set_var("XDG_CONFIG_HOME", dir.path());

        if cfg!(target_os = "linux") {
            let resolved = load_config(None).expect("load");
            assert_eq!(resolved.path.source, ConfigSource::BuiltinDefault);
            assert!(resolved.raw.is_none());
            assert_eq!(resolved.config, AnalysisConfig::default());
        }
    });
}

#[test]
fn invalid_file_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("bad.json");
    write_config(&path, r#"{"integration": {"credible_level": 1.2}}"#);
    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { .. }));

    write_config(&path, r#"{"waves": "third"}"#);
    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn snapshot_records_file_hash() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("analysis.json");
    write_config(&path, "{}");

    let resolved = load_config(Some(&path)).expect("load");
    let snapshot = ConfigSnapshot::new(&resolved, &resolved.config);
    assert_eq!(
        snapshot.file_hash.as_deref(),
        // sha256 of "{}"
        Some("44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a")
    );
    assert!(snapshot.matches(&ConfigSnapshot::defaults_only()));
}

#[test]
fn json_schema_describes_sections() {
    let schema = wf_config::config_json_schema();
    let text = schema.to_string();
    for section in ["data", "waves", "model", "integration", "report"] {
        assert!(text.contains(section), "schema missing {}", section);
    }
}
