//! Backend adapters: one uniform `{load, warmup, infer}` contract per runtime.

use crate::benchmarks::benchmark_types::{BackendConfig, BackendKind};
use crate::errors::{BackendError, BackendResult};
use crate::samples::{CLASS_COUNT, PIXEL_COUNT, Sample};
use std::any::Any;

pub mod instruction_backend;
pub mod packed_backend;

pub use instruction_backend::InstructionBackend;
pub use packed_backend::PackedBackend;

/// Opaque reference to a loaded model, owned by the backend that produced it.
pub struct BackendHandle {
    backend: String,
    model: Box<dyn Any + Send>,
}

impl BackendHandle {
    pub fn new<T: Any + Send>(backend: impl Into<String>, model: T) -> Self {
        Self {
            backend: backend.into(),
            model: Box::new(model),
        }
    }

    /// Name of the backend that loaded this handle.
    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    /// Borrows the loaded model, failing when the handle came from a different
    /// kind of backend.
    pub fn model_mut<T: Any>(&mut self) -> BackendResult<&mut T> {
        let backend = self.backend.clone();
        self.model
            .downcast_mut::<T>()
            .ok_or_else(|| BackendError::inference(backend, "handle was loaded by another backend"))
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Uniform contract over one inference runtime.
///
/// Backends never time themselves: the orchestrator wraps `load` and `infer` with
/// its own clock so every runtime is measured the same way.
pub trait Backend: Send + Sync {
    /// Stable name used in logs and column headers.
    fn name(&self) -> &str;

    /// Acquires and initializes the model. Every call re-reads the artifact.
    fn load(&self) -> BackendResult<BackendHandle>;

    /// One discarded inference on the reference sample.
    fn warmup(&self, handle: &mut BackendHandle, reference: &Sample) -> BackendResult<()> {
        self.infer(handle, reference).map(|_| ())
    }

    /// Runs inference on `sample` and returns the predicted class.
    fn infer(&self, handle: &mut BackendHandle, sample: &Sample) -> BackendResult<u8>;
}

/// Creates the backend described by a configuration entry.
pub fn create_backend(config: &BackendConfig) -> Box<dyn Backend> {
    match config.kind {
        BackendKind::Instruction => Box::new(InstructionBackend::new(
            config.name.clone(),
            config.model_path.clone(),
        )),
        BackendKind::Packed => Box::new(PackedBackend::new(
            config.name.clone(),
            config.model_path.clone(),
        )),
    }
}

/// Index of the largest value. Ties resolve to the lowest index, NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Maps a class-score vector to a digit prediction.
pub(crate) fn predicted_class(backend: &str, scores: &[f32]) -> BackendResult<u8> {
    if scores.len() != CLASS_COUNT {
        return Err(BackendError::inference(
            backend,
            format!("expected {} class scores, got {}", CLASS_COUNT, scores.len()),
        ));
    }
    argmax(scores)
        .map(|class| class as u8)
        .ok_or_else(|| BackendError::inference(backend, "all class scores are NaN"))
}

/// Checks that a loaded model maps a digit image to one score per class.
pub(crate) fn check_model_shape(
    backend: &str,
    path: &str,
    feature_size: usize,
    output_size: usize,
) -> BackendResult<()> {
    if feature_size != PIXEL_COUNT || output_size != CLASS_COUNT {
        return Err(BackendError::model_load(
            backend,
            path,
            format!(
                "model maps {} inputs to {} outputs, expected {} to {}",
                feature_size, output_size, PIXEL_COUNT, CLASS_COUNT
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), Some(0));
        assert_eq!(argmax(&[f32::NAN, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_predicted_class_rejects_wrong_width() {
        assert!(matches!(
            predicted_class("a", &[1.0, 2.0]),
            Err(BackendError::Inference { .. })
        ));
        let mut scores = [0.0; CLASS_COUNT];
        scores[9] = 1.0;
        assert_eq!(predicted_class("a", &scores).unwrap(), 9);
    }

    #[test]
    fn test_handle_downcast_mismatch() {
        let mut handle = BackendHandle::new("a", 42u32);
        assert_eq!(*handle.model_mut::<u32>().unwrap(), 42);
        assert!(matches!(
            handle.model_mut::<String>(),
            Err(BackendError::Inference { .. })
        ));
    }
}
