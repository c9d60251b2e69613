//! Error taxonomy for the core pipeline.
//!
//! Every error here is recoverable per ticker: `screen` turns the data errors
//! into reason-coded Reject verdicts, so a single defective series never
//! aborts a batch.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("verdict cannot be annotated: {0}")]
    NotAnnotatable(String),
}

impl CoreError {
    /// Stable reason code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotAnnotatable(_) => "not_annotatable",
        }
    }
}
