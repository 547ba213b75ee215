//! Error types for benchmark configuration, execution and export.

use thiserror::Error;

use super::{BackendError, DatasetError, InstructionModelError, PackedModelError, SampleError};

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("A benchmark run is already in progress")]
    AlreadyRunning,

    #[error("Invalid sample count: {value}. Must be greater than 0")]
    InvalidSampleCount { value: u32 },

    #[error("Failed to parse configuration file '{path}': {source}")]
    ConfigParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Configuration validation error for field '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    InstructionModel(#[from] InstructionModelError),

    #[error(transparent)]
    PackedModel(#[from] PackedModelError),

    #[error("Failed to export report to '{path}': {source}")]
    Export {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid dataset file '{path}': {source}")]
    Dataset { path: String, source: DatasetError },

    #[error("Failed to write sample file '{path}': {source}")]
    SampleWrite {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid report row {row}: {message}")]
    InvalidReport { row: usize, message: String },

    #[error("Malformed results table at line {line}: {message}")]
    ResultsParse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchmarkError {
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        BenchmarkError::ConfigValidation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
