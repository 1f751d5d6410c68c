//! Exit codes for the wavefit CLI.
//!
//! Exit codes communicate the run outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-3: Operational outcomes
//! - 10-19: User/input errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use wf_common::{Error, ErrorCategory};

/// Exit codes for wavefit operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-3)
    // ========================================================================
    /// Every requested wave was fitted and reported
    Clean = 0,

    /// Report written, but at least one wave failed
    PartialFail = 3,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, unreadable or invalid
    ConfigError = 11,

    /// Input table missing columns or holding malformed values
    DataError = 12,

    /// Model fit failed for every wave, or aborted with --fail-fast
    FitError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DataError => "ERR_DATA",
            ExitCode::FitError => "ERR_FIT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Exit code for an error that ended the run.
    pub fn for_error(err: &Error) -> Self {
        Self::for_category(err.category())
    }

    /// Exit code for an error category.
    pub fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Data => ExitCode::DataError,
            ErrorCategory::Inference => ExitCode::FitError,
            ErrorCategory::Report => ExitCode::InternalError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
