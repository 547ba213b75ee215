//! Error types for the benchmark harness.
//!
//! Each concern owns a specific error enum instead of a generic wrapper such as
//! `anyhow` or `Box<dyn Error>`, so callers can match on the exact failure.

mod backend_error;
mod benchmark_error;
mod dataset_error;
mod instruction_model_error;
mod packed_model_error;
mod sample_error;

pub use backend_error::BackendError;
pub use benchmark_error::BenchmarkError;
pub use dataset_error::DatasetError;
pub use instruction_model_error::InstructionModelError;
pub use packed_model_error::PackedModelError;
pub use sample_error::SampleError;

/// Result type alias for sample provider operations.
pub type SampleResult<T> = std::result::Result<T, SampleError>;

/// Result type alias for backend adapter operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for instruction model operations.
pub type InstructionModelResult<T> = std::result::Result<T, InstructionModelError>;

/// Result type alias for packed model operations.
pub type PackedModelResult<T> = std::result::Result<T, PackedModelError>;

/// Result type alias for IDX dataset decoding.
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

/// Result type alias for benchmark runs and their configuration.
pub type BenchmarkResult<T> = std::result::Result<T, BenchmarkError>;
