//! Benchmark harness: configuration, the measurement loop, reports and export.

pub mod benchmark_runner;
pub mod benchmark_types;
pub mod export;
pub mod performance_metrics;
pub mod progress;
pub mod report;

pub use benchmark_runner::{
    BenchmarkOrchestrator, ConfigLoader, DEFAULT_CONFIG_PATH, Inference, timed_infer,
};
pub use benchmark_types::{
    BackendConfig, BackendKind, BenchmarkConfig, Phase, RunOptions, RunState,
};
pub use export::{
    CsvFileExporter, DEFAULT_RESULTS_FILE, MemoryExporter, ReportExporter, csv_header,
    parse_csv, read_results, render_csv,
};
pub use performance_metrics::{measure, print_summary};
pub use progress::{LogProgressSink, MemoryProgressSink, ProgressSink, StdoutProgressSink};
pub use report::{BackendSummary, Report, ResultRow, TimedResult};
