//! Adapter over the packed runtime (binary little-endian f32 artifacts).

use super::{Backend, BackendHandle, check_model_shape, predicted_class};
use crate::errors::{BackendError, BackendResult};
use crate::packed::PackedModel;
use crate::samples::Sample;
use log::debug;
use std::fs;
use std::path::PathBuf;

struct LoadedPackedModel {
    model: PackedModel,
    compute_buffer: Vec<f32>,
}

pub struct PackedBackend {
    name: String,
    model_path: PathBuf,
}

impl PackedBackend {
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

impl Backend for PackedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> BackendResult<BackendHandle> {
        let bytes = fs::read(&self.model_path)
            .map_err(|e| BackendError::model_load(&self.name, self.path_label(), e))?;
        let model = PackedModel::from_bytes(&bytes)
            .map_err(|e| BackendError::model_load(&self.name, self.path_label(), e))?;
        check_model_shape(
            &self.name,
            &self.path_label(),
            model.feature_size(),
            model.output_size(),
        )?;

        debug!(
            "{}: loaded packed model ({} words, {} floats of compute buffer)",
            self.name,
            model.full_size(),
            model.compute_buffer_size()
        );
        let compute_buffer = vec![0.0f32; model.compute_buffer_size()];
        Ok(BackendHandle::new(
            self.name.clone(),
            LoadedPackedModel {
                model,
                compute_buffer,
            },
        ))
    }

    fn infer(&self, handle: &mut BackendHandle, sample: &Sample) -> BackendResult<u8> {
        let loaded = handle.model_mut::<LoadedPackedModel>()?;
        let feature_size = loaded.model.feature_size();
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

        loaded.compute_buffer[..feature_size].copy_from_slice(sample.pixels());
        loaded
            .model
            .predict_with_buffer(&mut loaded.compute_buffer)
            .map_err(|e| BackendError::inference(&self.name, e))?;

        let start = loaded.model.output_start();
        let end = start + loaded.model.output_size();
        predicted_class(&self.name, &loaded.compute_buffer[start..end])
    }
}
