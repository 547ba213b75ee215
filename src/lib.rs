//! Benchmark harness comparing the latency and accuracy of two inference runtimes
//! on the same digit classifier.
//!
//! Samples come from a [`SampleProvider`], each runtime sits behind a [`Backend`]
//! adapter, and the [`BenchmarkOrchestrator`] runs the timed load/inference loop,
//! collects a [`Report`] and exports it as CSV.
//!
//! Two runtimes ship with the crate: the instruction runtime executes JSON
//! instruction models through [`InstructionModel`], the packed runtime executes the
//! flat binary format of [`PackedModel`].

pub mod activation;
pub mod backends;
pub mod benchmarks;
pub mod errors;
pub mod instruction_model;
pub mod instruction_model_info;
pub mod instructions;
pub mod packed;
pub mod samples;

pub use activation::Activation;
pub use backends::{Backend, BackendHandle, InstructionBackend, PackedBackend, argmax};
pub use benchmarks::{BenchmarkConfig, BenchmarkOrchestrator, Report, ResultRow, TimedResult};
pub use instruction_model::InstructionModel;
pub use instruction_model_info::{InstructionModelInfo, ValidationData};
pub use packed::PackedModel;
pub use samples::{InMemorySampleProvider, JsonDirSampleProvider, Sample, SampleProvider};
