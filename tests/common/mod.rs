//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use digitbench::activation::Activation;
use digitbench::backends::{Backend, BackendHandle};
use digitbench::errors::{BackendError, BackendResult};
use digitbench::instruction_model_info::{DotInstructionInfo, InstructionInfo, InstructionModelInfo};
use digitbench::samples::{PIXEL_COUNT, Sample};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

pub const HIDDEN_SIZE: usize = 16;

/// A 784 -> 16 (ReLU) -> 10 (softmax) classifier that predicts the class whose
/// pixel (pixel `c` for class `c`) is the brightest of the first ten pixels.
pub fn digit_model_info() -> InstructionModelInfo {
    let mut hidden_weights = vec![vec![0.0f32; PIXEL_COUNT]; HIDDEN_SIZE];
    for (row, weights) in hidden_weights.iter_mut().enumerate() {
        weights[row] = 1.0;
    }
    let mut output_weights = vec![vec![0.0f32; HIDDEN_SIZE]; 10];
    for (class, weights) in output_weights.iter_mut().enumerate() {
        weights[class] = 1.0;
    }

    InstructionModelInfo {
        features: Some(vec![format!("pixels[{}]", PIXEL_COUNT)]),
        feature_size: None,
        computation_buffer_sizes: vec![PIXEL_COUNT, HIDDEN_SIZE, 10],
        instructions: vec![
            InstructionInfo::Dot(DotInstructionInfo {
                input: 0,
                output: 1,
                weights: 0,
                activation: Some(Activation::Relu),
            }),
            InstructionInfo::Dot(DotInstructionInfo {
                input: 1,
                output: 2,
                weights: 1,
                activation: Some(Activation::Softmax),
            }),
        ],
        weights: vec![hidden_weights, output_weights],
        bias: vec![vec![0.0; HIDDEN_SIZE], vec![0.0; 10]],
        validation_data: None,
    }
}

/// Sample whose pixel `label` is lit, so the digit model predicts `label`.
pub fn digit_sample(index: usize, label: u8) -> Sample {
    let mut pixels = vec![0.0f32; PIXEL_COUNT];
    pixels[label as usize] = 1.0;
    Sample::new(index, pixels, label).unwrap()
}

pub fn samples_with_labels(labels: &[u8]) -> Vec<Sample> {
    labels
        .iter()
        .enumerate()
        .map(|(index, &label)| digit_sample(index, label))
        .collect()
}

/// Backend whose prediction is a function of the sample, with optional delays and
/// injected load or inference failures.
pub struct MockBackend {
    name: String,
    predict: fn(&Sample) -> u8,
    load_delay: Duration,
    infer_delay: Duration,
    fail_load_on_call: Option<usize>,
    panic_load_on_call: Option<usize>,
    fail_infer_on_call: Option<usize>,
    loads: Arc<AtomicUsize>,
    infers: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(name: &str, predict: fn(&Sample) -> u8) -> Self {
        Self {
            name: name.to_string(),
            predict,
            load_delay: Duration::ZERO,
            infer_delay: Duration::ZERO,
            fail_load_on_call: None,
            panic_load_on_call: None,
            fail_infer_on_call: None,
            loads: Arc::new(AtomicUsize::new(0)),
            infers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Predicts the label.
    pub fn always_right(name: &str) -> Self {
        Self::new(name, |sample| sample.label())
    }

    /// Predicts `(label + 1) % 10`.
    pub fn always_wrong(name: &str) -> Self {
        Self::new(name, |sample| (sample.label() + 1) % 10)
    }

    pub fn with_delays(mut self, load: Duration, infer: Duration) -> Self {
        self.load_delay = load;
        self.infer_delay = infer;
        self
    }

    /// Counter of `load` calls, still readable once the backend is boxed.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }

    /// Counter of `infer` calls, warm-ups included.
    pub fn infer_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.infers)
    }

    /// Fails the `n`-th call to `load` (0-based).
    pub fn failing_load_on_call(mut self, n: usize) -> Self {
        self.fail_load_on_call = Some(n);
        self
    }

    /// Panics inside the `n`-th call to `load` (0-based).
    pub fn panicking_load_on_call(mut self, n: usize) -> Self {
        self.panic_load_on_call = Some(n);
        self
    }

    /// Fails the `n`-th call to `infer` (0-based, warm-ups included).
    pub fn failing_infer_on_call(mut self, n: usize) -> Self {
        self.fail_infer_on_call = Some(n);
        self
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> BackendResult<BackendHandle> {
        let call = self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.load_delay);
        if self.panic_load_on_call == Some(call) {
            panic!("injected panic in {} load", self.name);
        }
        if self.fail_load_on_call == Some(call) {
            return Err(BackendError::model_load(&self.name, "mock", "injected failure"));
        }
        Ok(BackendHandle::new(self.name.clone(), call))
    }

    fn infer(&self, handle: &mut BackendHandle, sample: &Sample) -> BackendResult<u8> {
        handle.model_mut::<usize>()?;
        let call = self.infers.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.infer_delay);
        if self.fail_infer_on_call == Some(call) {
            return Err(BackendError::inference(&self.name, "injected failure"));
        }
        Ok((self.predict)(sample))
    }
}
