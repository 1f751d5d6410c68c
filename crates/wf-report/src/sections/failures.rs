//! Failed-wave section data.

use serde::{Deserialize, Serialize};
use wf_common::error::BatchError;

/// One wave whose analysis did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    pub wave: String,
    pub code: u32,
    pub category: String,
    pub message: String,
}

impl From<&BatchError> for FailureRow {
    fn from(err: &BatchError) -> Self {
        FailureRow {
            wave: err.item_id.clone(),
            code: err.error.code,
            category: err.error.category.to_string(),
            message: err.error.message.clone(),
        }
    }
}
