//! Benchmark results and their per-backend summaries.

use crate::errors::{BenchmarkError, BenchmarkResult};

/// Outcome of one backend on one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedResult {
    pub backend_name: String,
    pub load_time_ms: f64,
    pub infer_time_ms: f64,
    /// Predicted class, 0-9.
    pub prediction: u8,
    /// `prediction == label` of the row.
    pub correct: bool,
}

/// All backend results for one sample, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub sample_index: usize,
    pub label: u8,
    pub results: Vec<TimedResult>,
}

impl ResultRow {
    /// Result of the backend called `name`.
    pub fn result(&self, name: &str) -> Option<&TimedResult> {
        self.results.iter().find(|r| r.backend_name == name)
    }
}

/// Finalized results of a run. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    backend_names: Vec<String>,
    rows: Vec<ResultRow>,
}

impl Report {
    /// Builds a report, checking that every row holds exactly one result per
    /// backend, in `backend_names` order, and that predictions are classes.
    pub fn new(backend_names: Vec<String>, rows: Vec<ResultRow>) -> BenchmarkResult<Self> {
        for (position, row) in rows.iter().enumerate() {
            let names_match = row.results.len() == backend_names.len()
                && row
                    .results
                    .iter()
                    .zip(&backend_names)
                    .all(|(result, name)| &result.backend_name == name);
            if !names_match {
                return Err(BenchmarkError::InvalidReport {
                    row: position,
                    message: format!(
                        "row for sample {} does not hold one result per backend in order",
                        row.sample_index
                    ),
                });
            }
            for result in &row.results {
                if result.prediction > 9 || result.correct != (result.prediction == row.label) {
                    return Err(BenchmarkError::InvalidReport {
                        row: position,
                        message: format!(
                            "inconsistent result for '{}' on sample {}",
                            result.backend_name, row.sample_index
                        ),
                    });
                }
            }
        }

        Ok(Self {
            backend_names,
            rows,
        })
    }

    pub fn backend_names(&self) -> &[String] {
        &self.backend_names
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Aggregates per backend, in column order.
    pub fn summaries(&self) -> Vec<BackendSummary> {
        self.backend_names
            .iter()
            .enumerate()
            .map(|(column, name)| BackendSummary::from_rows(name, column, &self.rows))
            .collect()
    }
}

/// Per-backend aggregate over a report.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSummary {
    pub name: String,
    pub samples: usize,
    pub mean_load_ms: f64,
    pub mean_infer_ms: f64,
    /// Fraction of correct predictions in [0, 1].
    pub accuracy: f64,
    /// Load time of the first row.
    pub cold_start_load_ms: f64,
    /// Least-squares slope of load time over sample index.
    pub load_trend_ms_per_sample: f64,
    /// Least-squares slope of inference time over sample index.
    pub infer_trend_ms_per_sample: f64,
}

impl BackendSummary {
    fn from_rows(name: &str, column: usize, rows: &[ResultRow]) -> Self {
        let indexes: Vec<f64> = rows.iter().map(|row| row.sample_index as f64).collect();
        let loads: Vec<f64> = rows.iter().map(|row| row.results[column].load_time_ms).collect();
        let infers: Vec<f64> = rows.iter().map(|row| row.results[column].infer_time_ms).collect();
        let correct = rows.iter().filter(|row| row.results[column].correct).count();

        Self {
            name: name.to_string(),
            samples: rows.len(),
            mean_load_ms: mean(&loads),
            mean_infer_ms: mean(&infers),
            accuracy: if rows.is_empty() {
                0.0
            } else {
                correct as f64 / rows.len() as f64
            },
            cold_start_load_ms: loads.first().copied().unwrap_or(0.0),
            load_trend_ms_per_sample: ols_slope(&indexes, &loads),
            infer_trend_ms_per_sample: ols_slope(&indexes, &infers),
        }
    }

    pub fn overhead_ratio(&self, baseline: &BackendSummary) -> f64 {
        self.mean_infer_ms / baseline.mean_infer_ms
    }

    pub fn overhead_percentage(&self, baseline: &BackendSummary) -> f64 {
        (self.overhead_ratio(baseline) - 1.0) * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Ordinary least-squares slope of `ys` over `xs`. Zero when undefined.
pub fn ols_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = mean(&xs[..n]);
    let mean_y = mean(&ys[..n]);

    let (covariance, variance) = xs[..n]
        .iter()
        .zip(&ys[..n])
        .fold((0.0, 0.0), |(cov, var), (&x, &y)| {
            (cov + (x - mean_x) * (y - mean_y), var + (x - mean_x) * (x - mean_x))
        });

    if variance == 0.0 {
        0.0
    } else {
        covariance / variance
    }
}
