//! Structured event vocabulary for logging.
//!
//! Every pipeline event carries the run ID, the stage, and (when applicable)
//! the wave key.

use serde::{Deserialize, Serialize};

/// Processing stages in the wavefit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading and region-filtering the input table.
    Load,
    /// Wave subsetting and the log(x + 1) transform.
    Transform,
    /// Building the long-format stacked table.
    Stack,
    /// Fitting the joint Gaussian model.
    Fit,
    /// Report rendering and output.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Transform => "transform",
            Stage::Stack => "stack",
            Stage::Fit => "fit",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    // Load stage
    pub const LOAD_STARTED: &str = "load.started";
    pub const LOAD_FINISHED: &str = "load.finished";

    // Per-wave stages
    pub const WAVE_SUBSET: &str = "wave.subset";
    pub const TRANSFORM_FINISHED: &str = "transform.finished";
    pub const STACK_FINISHED: &str = "stack.finished";
    pub const STACK_EXPORTED: &str = "stack.exported";
    pub const FIT_STARTED: &str = "fit.started";
    pub const FIT_MODE_FOUND: &str = "fit.mode_found";
    pub const FIT_FINISHED: &str = "fit.finished";
    pub const WAVE_FAILED: &str = "wave.failed";

    // Report
    pub const REPORT_WRITTEN: &str = "report.written";

    /// Leading segment of every event name above, used as a tracing target.
    pub const TARGET_PREFIXES: &[&str] =
        &["run", "config", "load", "wave", "transform", "stack", "fit", "report"];
}

/// Context for emitting events with a consistent run ID.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Wave currently being analysed, if any.
    pub wave: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            wave: None,
        }
    }

    /// Context scoped to one wave.
    pub fn for_wave(&self, wave: impl Into<String>) -> Self {
        LogContext {
            run_id: self.run_id.clone(),
            wave: Some(wave.into()),
        }
    }

    /// Wave key for log fields; empty outside a wave.
    pub fn wave_key(&self) -> &str {
        self.wave.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_and_serde() {
        assert_eq!(Stage::Transform.to_string(), "transform");
        assert_eq!(serde_json::to_string(&Stage::Fit).unwrap(), "\"fit\"");
    }

    #[test]
    fn test_wave_context() {
        let ctx = LogContext::new("run-abc");
        assert_eq!(ctx.wave_key(), "");
        let wave = ctx.for_wave("third");
        assert_eq!(wave.run_id, "run-abc");
        assert_eq!(wave.wave_key(), "third");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_names::RUN_STARTED, "run.started");
        assert_eq!(event_names::FIT_FINISHED, "fit.finished");
    }

    #[test]
    fn test_every_event_has_a_listed_prefix() {
        use event_names::*;
        let all = [
            RUN_STARTED,
            RUN_FINISHED,
            CONFIG_LOADED,
            CONFIG_DEFAULT_USED,
            LOAD_STARTED,
            LOAD_FINISHED,
            WAVE_SUBSET,
            TRANSFORM_FINISHED,
            STACK_FINISHED,
            STACK_EXPORTED,
            FIT_STARTED,
            FIT_MODE_FOUND,
            FIT_FINISHED,
            WAVE_FAILED,
            REPORT_WRITTEN,
        ];
        for name in all {
            let prefix = name.split('.').next().unwrap();
            assert!(TARGET_PREFIXES.contains(&prefix), "{name}");
        }
    }
}
