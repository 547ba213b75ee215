//! Adapter over the instruction runtime (JSON instruction model artifacts).

use super::{Backend, BackendHandle, check_model_shape, predicted_class};
use crate::errors::{BackendError, BackendResult};
use crate::instruction_model::InstructionModel;
use crate::samples::Sample;
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Model plus a computation buffer reused across inferences on the same handle.
struct LoadedInstructionModel {
    model: InstructionModel,
    buffer: Vec<f32>,
}

pub struct InstructionBackend {
    name: String,
    model_path: PathBuf,
}

impl InstructionBackend {
    pub fn new(name: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            model_path: model_path.into(),
        }
    }

    fn path_label(&self) -> String {
        self.model_path.display().to_string()
    }
}

impl Backend for InstructionBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> BackendResult<BackendHandle> {
        let json = fs::read_to_string(&self.model_path)
            .map_err(|e| BackendError::model_load(&self.name, self.path_label(), e))?;
        let model = InstructionModel::from_json_str(&json)
            .map_err(|e| BackendError::model_load(&self.name, self.path_label(), e))?;
        check_model_shape(
            &self.name,
            &self.path_label(),
            model.get_feature_size(),
            model.get_output_size(),
        )?;

        debug!(
            "{}: loaded instruction model ({} floats of computation memory)",
            self.name,
            model.required_memory()
        );
        let buffer = vec![0.0f32; model.required_memory()];
        Ok(BackendHandle::new(
            self.name.clone(),
            LoadedInstructionModel { model, buffer },
        ))
    }

    fn infer(&self, handle: &mut BackendHandle, sample: &Sample) -> BackendResult<u8> {
        let loaded = handle.model_mut::<LoadedInstructionModel>()?;
        let feature_size = loaded.model.get_feature_size();
        if sample.pixels().len() != feature_size {
            return Err(BackendError::inference(
                &self.name,
                format!(
                    "sample {} has {} pixels, model expects {}",
                    sample.index(),
                    sample.pixels().len(),
                    feature_size
                ),
            ));
        }

        loaded.buffer[..feature_size].copy_from_slice(sample.pixels());
        loaded
            .model
            .predict_with_buffer(&mut loaded.buffer)
            .map_err(|e| BackendError::inference(&self.name, e))?;

        let start = loaded.model.get_output_index_start();
        let end = start + loaded.model.get_output_size();
        predicted_class(&self.name, &loaded.buffer[start..end])
    }
}
