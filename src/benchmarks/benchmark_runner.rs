//! Core benchmark execution logic.

use super::benchmark_types::{BenchmarkConfig, Phase, RunOptions, RunState};
use super::export::{CsvFileExporter, ReportExporter, is_column_safe};
use super::performance_metrics::measure;
use super::progress::{LogProgressSink, ProgressSink};
use super::report::{Report, ResultRow, TimedResult};
use crate::backends::{Backend, BackendHandle, create_backend};
use crate::errors::{BackendError, BackendResult, BenchmarkError, BenchmarkResult};
use crate::samples::{CLASS_COUNT, JsonDirSampleProvider, Sample, SampleProvider};
use log::{error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::mem;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default location of the benchmark configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "configs/digitbench.json";

/// Configuration loader that handles JSON files with fallbacks
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a configuration file with fallback to defaults
    pub fn load_config<T>(path: &Path, config_name: &str) -> BenchmarkResult<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BenchmarkError::ConfigParse {
                    path: path.display().to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using default configuration for {}",
                    path.display(),
                    config_name
                );
                Ok(T::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load and validate the benchmark configuration
    pub fn load_benchmark_config(path: &Path) -> BenchmarkResult<BenchmarkConfig> {
        let config: BenchmarkConfig = Self::load_config(path, "digitbench")?;
        config.validate()?;
        Ok(config)
    }
}

/// Prediction of one timed inference call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub prediction: u8,
    pub elapsed_ms: f64,
}

/// Calls `infer` under the orchestrator's clock and checks that the prediction is
/// a digit class.
pub fn timed_infer(
    backend: &dyn Backend,
    handle: &mut BackendHandle,
    sample: &Sample,
) -> BackendResult<Inference> {
    let (prediction, elapsed_ms) = measure(|| backend.infer(handle, sample));
    let prediction = prediction?;
    if prediction as usize >= CLASS_COUNT {
        return Err(BackendError::inference(
            backend.name(),
            format!("prediction {} is not a digit class", prediction),
        ));
    }
    Ok(Inference {
        prediction,
        elapsed_ms,
    })
}

/// Drives the measurement loop: for every sample, every backend in configuration
/// order is loaded, warmed up on the reference sample and timed on the sample.
///
/// A single run executes at a time; `start` from another thread while a run is in
/// progress is rejected with [`BenchmarkError::AlreadyRunning`].
pub struct BenchmarkOrchestrator {
    provider: Box<dyn SampleProvider>,
    backends: Vec<Box<dyn Backend>>,
    exporter: Box<dyn ReportExporter>,
    progress: Box<dyn ProgressSink>,
    options: RunOptions,
    state: Mutex<RunState>,
}

impl BenchmarkOrchestrator {
    /// Creates an orchestrator logging progress through `log`.
    /// Backend names must be unique and column-safe.
    pub fn new(
        provider: Box<dyn SampleProvider>,
        backends: Vec<Box<dyn Backend>>,
        exporter: Box<dyn ReportExporter>,
    ) -> BenchmarkResult<Self> {
        if backends.is_empty() {
            return Err(BenchmarkError::config(
                "backends",
                "At least one backend is required",
            ));
        }
        let mut seen = HashSet::new();
        for backend in &backends {
            if !is_column_safe(backend.name()) || !seen.insert(backend.name().to_string()) {
                return Err(BenchmarkError::config(
                    "backends.name",
                    format!("'{}' is not a unique column-safe name", backend.name()),
                ));
            }
        }

        Ok(Self {
            provider,
            backends,
            exporter,
            progress: Box::new(LogProgressSink),
            options: RunOptions::default(),
            state: Mutex::new(RunState::Idle),
        })
    }

    /// Builds the orchestrator described by a configuration: samples from
    /// `data_dir`, one backend per entry, CSV export to `output`.
    pub fn from_config(config: &BenchmarkConfig) -> BenchmarkResult<Self> {
        config.validate()?;
        let backends = config.backends.iter().map(create_backend).collect();
        let orchestrator = Self::new(
            Box::new(JsonDirSampleProvider::new(&config.data_dir)),
            backends,
            Box::new(CsvFileExporter::new(&config.output, config.csv_precision)),
        )?;
        Ok(orchestrator.with_options(config.run_options()))
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RunState {
        self.lock_state().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_running()
    }

    /// Runs the benchmark over samples `0..sample_count`.
    ///
    /// On success the report is handed to the exporter and returned. On any
    /// collaborator error the run stops, the completed rows are kept in
    /// [`RunState::Failed`], nothing is exported and the error is returned.
    pub fn start(&self, sample_count: u32) -> BenchmarkResult<Report> {
        if sample_count == 0 {
            return Err(BenchmarkError::InvalidSampleCount {
                value: sample_count,
            });
        }

        {
            let mut state = self.lock_state();
            if state.is_running() {
                warn!("Rejected start: a benchmark run is already in progress");
                return Err(BenchmarkError::AlreadyRunning);
            }
            *state = RunState::Running {
                sample_index: 0,
                phase: Phase::Fetching,
            };
        }

        info!(
            "Starting benchmark over {} samples with backends {:?}",
            sample_count,
            self.backend_names()
        );
        self.progress.log("Test started.");

        let mut guard = RunGuard::new(&self.state);
        let outcome = self.run_samples(sample_count, &mut guard.rows).and_then(|()| {
            let report = Report::new(self.backend_names(), guard.rows.clone())?;
            self.exporter.export(&report)?;
            Ok(report)
        });
        let rows = guard.disarm();

        match outcome {
            Ok(report) => {
                *self.lock_state() = RunState::Done {
                    rows: report.rows().to_vec(),
                };
                self.progress.log(&format!(
                    "Benchmark complete. {} samples exported.",
                    report.len()
                ));
                Ok(report)
            }
            Err(e) => {
                error!("Benchmark failed after {} samples: {}", rows.len(), e);
                self.progress
                    .log(&format!("Benchmark failed after {} samples: {}", rows.len(), e));
                *self.lock_state() = RunState::Failed {
                    error: e.to_string(),
                    completed: rows,
                };
                Err(e)
            }
        }
    }

    fn run_samples(&self, sample_count: u32, rows: &mut Vec<ResultRow>) -> BenchmarkResult<()> {
        let reference = self.provider.get_sample(self.options.reference_index)?;
        let mut handles: Vec<Option<BackendHandle>> = self.backends.iter().map(|_| None).collect();

        for index in 0..sample_count as usize {
            self.set_phase(index, Phase::Fetching);
            let sample = self.provider.get_sample(index)?;
            self.progress.log(&format!("Sample {} ...", index));

            let mut results = Vec::with_capacity(self.backends.len());
            for (backend, slot) in self.backends.iter().zip(handles.iter_mut()) {
                results.push(self.measure_backend(backend.as_ref(), slot, &sample, &reference)?);
            }

            rows.push(ResultRow {
                sample_index: index,
                label: sample.label(),
                results,
            });
        }

        Ok(())
    }

    /// Loads (unless a kept handle is reused), warms up and times one backend on
    /// one sample.
    fn measure_backend(
        &self,
        backend: &dyn Backend,
        slot: &mut Option<BackendHandle>,
        sample: &Sample,
        reference: &Sample,
    ) -> BenchmarkResult<TimedResult> {
        let name = backend.name();
        let mut load_time_ms = 0.0;

        if self.options.reload_per_sample || slot.is_none() {
            let (handle, elapsed_ms) = self.load_backend(backend, sample.index(), reference)?;
            load_time_ms = elapsed_ms;
            *slot = Some(handle);
        }
        let handle = slot
            .as_mut()
            .ok_or_else(|| BackendError::inference(name, "model is not loaded"))?;

        self.set_phase(sample.index(), Phase::Inferring);
        let inference = timed_infer(backend, handle, sample)?;
        self.progress.log(&format!(
            "{} Prediction: {}, Actual: {} ({:.2} ms)",
            name,
            inference.prediction,
            sample.label(),
            inference.elapsed_ms
        ));

        Ok(TimedResult {
            backend_name: name.to_string(),
            load_time_ms,
            infer_time_ms: inference.elapsed_ms,
            prediction: inference.prediction,
            correct: inference.prediction == sample.label(),
        })
    }

    /// Timed load followed by the warm-up. The warm-up is part of the measured time
    /// only when `warmup_in_load_time` is set.
    fn load_backend(
        &self,
        backend: &dyn Backend,
        sample_index: usize,
        reference: &Sample,
    ) -> BackendResult<(BackendHandle, f64)> {
        self.set_phase(sample_index, Phase::Loading);
        let warmup_in_load_time = self.options.warmup_in_load_time;
        let (loaded, elapsed_ms) = measure(|| -> BackendResult<BackendHandle> {
            let mut handle = backend.load()?;
            if warmup_in_load_time {
                backend.warmup(&mut handle, reference)?;
            }
            Ok(handle)
        });
        let mut handle = loaded?;
        self.progress
            .log(&format!("{} Loading time: {:.2} ms", backend.name(), elapsed_ms));

        if !warmup_in_load_time {
            self.set_phase(sample_index, Phase::WarmingUp);
            backend.warmup(&mut handle, reference)?;
        }
        Ok((handle, elapsed_ms))
    }

    fn set_phase(&self, sample_index: usize, phase: Phase) {
        *self.lock_state() = RunState::Running {
            sample_index,
            phase,
        };
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the rows of the run in progress. Dropped while still armed, which only
/// happens when the loop unwinds, it moves the run to [`RunState::Failed`] so the
/// orchestrator accepts a new `start`.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
    rows: Vec<ResultRow>,
    armed: bool,
}

impl<'a> RunGuard<'a> {
    fn new(state: &'a Mutex<RunState>) -> Self {
        Self {
            state,
            rows: Vec::new(),
            armed: true,
        }
    }

    fn disarm(mut self) -> Vec<ResultRow> {
        self.armed = false;
        mem::take(&mut self.rows)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        error!("Benchmark panicked after {} samples", self.rows.len());
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RunState::Failed {
            error: "run panicked".to_string(),
            completed: mem::take(&mut self.rows),
        };
    }
}
