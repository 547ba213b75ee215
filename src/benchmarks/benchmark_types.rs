//! Benchmark configuration and run-state definitions.

use crate::benchmarks::export::is_column_safe;
use crate::benchmarks::report::ResultRow;
use crate::errors::{BenchmarkError, BenchmarkResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Which runtime a backend entry drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON instruction model artifact.
    Instruction,
    /// Binary packed model artifact.
    Packed,
}

/// One benchmarked runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name used in logs and as the CSV column suffix.
    pub name: String,
    pub kind: BackendKind,
    pub model_path: PathBuf,
}

/// Configuration for a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub name: String,
    pub description: String,
    /// Number of samples to run, starting at index 0.
    pub sample_count: u32,
    /// Directory holding the `sample-<i>.json` files.
    pub data_dir: PathBuf,
    /// Index of the sample used for warm-up.
    pub reference_index: usize,
    /// Load every backend again for each sample. When false each backend is loaded
    /// once per run and only the first row carries a load time.
    pub reload_per_sample: bool,
    /// Include the warm-up call in the measured load time.
    pub warmup_in_load_time: bool,
    /// Decimals written for times in the CSV export.
    pub csv_precision: usize,
    /// Path of the CSV export.
    pub output: PathBuf,
    /// Backends in column order.
    pub backends: Vec<BackendConfig>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            name: "digit_classification".to_string(),
            description: "Load and inference latency of the digit classifier on two runtimes"
                .to_string(),
            sample_count: 100,
            data_dir: PathBuf::from("public/data"),
            reference_index: 0,
            reload_per_sample: true,
            warmup_in_load_time: false,
            csv_precision: 2,
            output: PathBuf::from("results.csv"),
            backends: vec![
                BackendConfig {
                    name: "Instruction".to_string(),
                    kind: BackendKind::Instruction,
                    model_path: PathBuf::from("public/model/model.json"),
                },
                BackendConfig {
                    name: "Packed".to_string(),
                    kind: BackendKind::Packed,
                    model_path: PathBuf::from("public/model/model.bin"),
                },
            ],
        }
    }
}

/// Highest number of decimals accepted for CSV times.
pub const MAX_CSV_PRECISION: usize = 9;

impl BenchmarkConfig {
    /// Validates the configuration
    pub fn validate(&self) -> BenchmarkResult<()> {
        if self.sample_count == 0 {
            return Err(BenchmarkError::InvalidSampleCount {
                value: self.sample_count,
            });
        }

        if self.csv_precision > MAX_CSV_PRECISION {
            return Err(BenchmarkError::config(
                "csv_precision",
                format!("Must be at most {}", MAX_CSV_PRECISION),
            ));
        }

        if self.backends.is_empty() {
            return Err(BenchmarkError::config(
                "backends",
                "At least one backend is required",
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if !is_column_safe(&backend.name) {
                return Err(BenchmarkError::config(
                    "backends.name",
                    format!(
                        "'{}' must be non-empty and use only ASCII letters, digits, '_' or '-'",
                        backend.name
                    ),
                ));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(BenchmarkError::config(
                    "backends.name",
                    format!("'{}' is used by more than one backend", backend.name),
                ));
            }
            if backend.model_path.as_os_str().is_empty() {
                return Err(BenchmarkError::config(
                    "backends.model_path",
                    format!("'{}' has no model path", backend.name),
                ));
            }
        }

        Ok(())
    }

    /// Options that shape the measurement loop.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            reference_index: self.reference_index,
            reload_per_sample: self.reload_per_sample,
            warmup_in_load_time: self.warmup_in_load_time,
        }
    }
}

/// Measurement loop options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub reference_index: usize,
    pub reload_per_sample: bool,
    pub warmup_in_load_time: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reference_index: 0,
            reload_per_sample: true,
            warmup_in_load_time: false,
        }
    }
}

/// Step of the measurement loop currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Loading,
    WarmingUp,
    Inferring,
}

/// Orchestrator state. `Done` and `Failed` are idle: a new run may start from them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running { sample_index: usize, phase: Phase },
    Done { rows: Vec<ResultRow> },
    Failed {
        error: String,
        completed: Vec<ResultRow>,
    },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }
}
