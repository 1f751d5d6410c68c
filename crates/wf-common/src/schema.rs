//! Versioning for serialized analysis output.

/// Schema version stamped into JSON reports.
pub const SCHEMA_VERSION: &str = "1.0.0";
