//! Sample loading and dataset generation.

pub mod generation;
pub mod provider;
pub mod sample;

pub use generation::{IdxDataset, write_dataset};
pub use provider::{InMemorySampleProvider, JsonDirSampleProvider, SampleProvider, sample_path};
pub use sample::{CLASS_COUNT, PIXEL_COUNT, Sample, quantize_pixel};
