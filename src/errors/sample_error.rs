//! Error types for sample loading.

use thiserror::Error;

/// Errors raised by a sample provider.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("No sample exists at index {index}")]
    NotFound { index: usize },

    #[error("Sample {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("Failed to read sample {index} from '{path}': {source}")]
    Io {
        index: usize,
        path: String,
        source: std::io::Error,
    },
}

impl SampleError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        SampleError::Malformed {
            index,
            reason: reason.into(),
        }
    }
}
