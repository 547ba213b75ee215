//! Sources of labeled samples.

use super::sample::Sample;
use crate::errors::{SampleError, SampleResult};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A finite, ordered, indexable set of labeled samples.
///
/// Fetching is a pure read: calling `get_sample` twice with the same index returns
/// equal samples, and indexes may be requested in any order.
pub trait SampleProvider: Send + Sync {
    fn get_sample(&self, index: usize) -> SampleResult<Sample>;
}

/// Reads `sample-<i>.json` files from a directory.
#[derive(Debug, Clone)]
pub struct JsonDirSampleProvider {
    dir: PathBuf,
}

impl JsonDirSampleProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the sample at `index`.
    pub fn sample_path(&self, index: usize) -> PathBuf {
        sample_path(&self.dir, index)
    }
}

/// Path of the `sample-<i>.json` file under `dir`.
pub fn sample_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("sample-{}.json", index))
}

impl SampleProvider for JsonDirSampleProvider {
    fn get_sample(&self, index: usize) -> SampleResult<Sample> {
        let path = self.sample_path(index);
        debug!("Reading sample {} from {}", index, path.display());

        let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => SampleError::NotFound { index },
            _ => SampleError::Io {
                index,
                path: path.display().to_string(),
                source,
            },
        })?;
        Sample::from_json_str(index, &content)
    }
}

/// Serves samples from memory. Sample `i` is the `i`-th element.
#[derive(Debug, Clone, Default)]
pub struct InMemorySampleProvider {
    samples: Vec<Sample>,
}

impl InMemorySampleProvider {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleProvider for InMemorySampleProvider {
    fn get_sample(&self, index: usize) -> SampleResult<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(SampleError::NotFound { index })
    }
}
