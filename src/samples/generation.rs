//! Offline dataset generation from MNIST IDX files.
//!
//! Turns an `images` / `labels` IDX pair into the `sample-<i>.json` files read by
//! [`JsonDirSampleProvider`](super::JsonDirSampleProvider). Pixels are scaled to
//! [0, 1] and rounded to the nearest multiple of 1/255.

use super::provider::sample_path;
use super::sample::{CLASS_COUNT, PIXEL_COUNT, Sample, quantize_pixel};
use crate::errors::{BenchmarkError, BenchmarkResult, DatasetError, DatasetResult};
use log::info;
use std::fs;
use std::path::Path;

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

/// Decoded IDX image/label pair.
#[derive(Debug, Clone)]
pub struct IdxDataset {
    images: Vec<u8>,
    labels: Vec<u8>,
}

impl IdxDataset {
    /// Reads and decodes an images file and its labels file.
    pub fn open(images_path: &Path, labels_path: &Path) -> BenchmarkResult<Self> {
        let images = fs::read(images_path)?;
        let labels = fs::read(labels_path)?;
        Self::from_bytes(&images, &labels).map_err(|source| BenchmarkError::Dataset {
            path: format!("{} / {}", images_path.display(), labels_path.display()),
            source,
        })
    }

    /// Decodes the raw contents of an images file and a labels file.
    pub fn from_bytes(images: &[u8], labels: &[u8]) -> DatasetResult<Self> {
        let image_header = read_header(images, IDX_IMAGES_MAGIC, 4)?;
        let label_header = read_header(labels, IDX_LABELS_MAGIC, 2)?;

        let (count, rows, cols) = (image_header[1], image_header[2], image_header[3]);
        if rows * cols != PIXEL_COUNT {
            return Err(DatasetError::ImageShape {
                rows,
                cols,
                expected: PIXEL_COUNT,
            });
        }
        if label_header[1] != count {
            return Err(DatasetError::CountMismatch {
                images: count,
                labels: label_header[1],
            });
        }

        let image_data = &images[16..];
        let label_data = &labels[8..];
        if image_data.len() != count * PIXEL_COUNT || label_data.len() != count {
            return Err(DatasetError::PayloadLength { count });
        }
        if let Some(&label) = label_data.iter().find(|&&l| l as usize >= CLASS_COUNT) {
            return Err(DatasetError::LabelOutOfRange { label });
        }

        Ok(Self {
            images: image_data.to_vec(),
            labels: label_data.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Builds the sample at `index`, or `None` past the end.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        let label = *self.labels.get(index)?;
        let pixels = self.images[index * PIXEL_COUNT..(index + 1) * PIXEL_COUNT]
            .iter()
            .map(|&byte| quantize_pixel(byte as f32 / 255.0))
            .collect();
        Sample::new(index, pixels, label).ok()
    }
}

/// Parses an IDX header: the magic word followed by `dims - 1` big-endian sizes.
/// Returns every word of the header.
fn read_header(bytes: &[u8], magic: u32, words: usize) -> DatasetResult<Vec<usize>> {
    if bytes.len() < words * 4 {
        return Err(DatasetError::TruncatedHeader {
            expected: words * 4,
        });
    }
    let header: Vec<u32> = bytes[..words * 4]
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if header[0] != magic {
        return Err(DatasetError::InvalidMagic {
            found: header[0],
            expected: magic,
        });
    }
    Ok(header.into_iter().map(|word| word as usize).collect())
}

/// Writes the first `count` samples (all of them when `None`) as
/// `sample-<i>.json` files under `out_dir`. Returns the number written.
pub fn write_dataset(
    dataset: &IdxDataset,
    out_dir: &Path,
    count: Option<usize>,
) -> BenchmarkResult<usize> {
    fs::create_dir_all(out_dir)?;
    let count = count.unwrap_or(dataset.len()).min(dataset.len());

    for index in 0..count {
        let Some(sample) = dataset.sample(index) else {
            break;
        };
        let path = sample_path(out_dir, index);
        let json = sample
            .to_json_string()
            .map_err(|source| BenchmarkError::SampleWrite {
                path: path.display().to_string(),
                source,
            })?;
        fs::write(&path, json)?;
    }

    info!("Wrote {} samples to {}", count, out_dir.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::{JsonDirSampleProvider, SampleProvider};

    fn idx_pair(labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut images = Vec::new();
        for word in [IDX_IMAGES_MAGIC, labels.len() as u32, 28, 28] {
            images.extend_from_slice(&word.to_be_bytes());
        }
        for (i, _) in labels.iter().enumerate() {
            images.extend((0..PIXEL_COUNT).map(|p| ((p + i) % 256) as u8));
        }

        let mut label_bytes = Vec::new();
        for word in [IDX_LABELS_MAGIC, labels.len() as u32] {
            label_bytes.extend_from_slice(&word.to_be_bytes());
        }
        label_bytes.extend_from_slice(labels);
        (images, label_bytes)
    }

    #[test]
    fn test_decode_idx() {
        let (images, labels) = idx_pair(&[5, 0, 4]);
        let dataset = IdxDataset::from_bytes(&images, &labels).unwrap();
        assert_eq!(dataset.len(), 3);

        let sample = dataset.sample(1).unwrap();
        assert_eq!(sample.label(), 0);
        assert_eq!(sample.pixels()[0], 1.0 / 255.0);
        assert_eq!(sample.pixels()[254], 1.0);
        assert!(dataset.sample(3).is_none());
    }

    #[test]
    fn test_rejects_bad_magic_and_counts() {
        let (images, labels) = idx_pair(&[1, 2]);
        assert_eq!(
            IdxDataset::from_bytes(&images, &images).unwrap_err(),
            DatasetError::InvalidMagic {
                found: IDX_IMAGES_MAGIC,
                expected: IDX_LABELS_MAGIC
            }
        );
        assert_eq!(
            IdxDataset::from_bytes(&images, &labels[..9]).unwrap_err(),
            DatasetError::PayloadLength { count: 2 }
        );
        assert_eq!(
            IdxDataset::from_bytes(&images, &labels[..4]).unwrap_err(),
            DatasetError::TruncatedHeader { expected: 8 }
        );

        let (_, three_labels) = idx_pair(&[1, 2, 3]);
        assert_eq!(
            IdxDataset::from_bytes(&images, &three_labels).unwrap_err(),
            DatasetError::CountMismatch {
                images: 2,
                labels: 3
            }
        );

        let (images, mut labels) = idx_pair(&[1, 2]);
        labels[9] = 12;
        assert_eq!(
            IdxDataset::from_bytes(&images, &labels).unwrap_err(),
            DatasetError::LabelOutOfRange { label: 12 }
        );
    }

    #[test]
    fn test_open_reports_file_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = idx_pair(&[3]);
        let images_path = dir.path().join("images.idx");
        let labels_path = dir.path().join("labels.idx");
        fs::write(&images_path, &images).unwrap();
        fs::write(&labels_path, &labels[..8]).unwrap();

        let err = IdxDataset::open(&images_path, &labels_path).unwrap_err();
        assert!(matches!(
            err,
            BenchmarkError::Dataset {
                source: DatasetError::PayloadLength { count: 1 },
                ..
            }
        ));
        assert!(err.to_string().contains("labels.idx"));
    }

    #[test]
    fn test_write_dataset_is_readable() {
        let (images, labels) = idx_pair(&[7, 2, 1]);
        let dataset = IdxDataset::from_bytes(&images, &labels).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let written = write_dataset(&dataset, dir.path(), Some(2)).unwrap();
        assert_eq!(written, 2);

        let provider = JsonDirSampleProvider::new(dir.path());
        assert_eq!(provider.get_sample(0).unwrap(), dataset.sample(0).unwrap());
        assert_eq!(provider.get_sample(1).unwrap().label(), 2);
        assert!(provider.get_sample(2).is_err());
    }
}
