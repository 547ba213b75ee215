//! Error types for backend adapters.

use thiserror::Error;

/// Errors raised while loading a model or running inference through a backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend '{backend}' failed to load model '{path}': {message}")]
    ModelLoad {
        backend: String,
        path: String,
        message: String,
    },

    #[error("Backend '{backend}' inference failed: {message}")]
    Inference { backend: String, message: String },
}

impl BackendError {
    pub fn model_load(
        backend: impl Into<String>,
        path: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        BackendError::ModelLoad {
            backend: backend.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn inference(backend: impl Into<String>, message: impl ToString) -> Self {
        BackendError::Inference {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}
