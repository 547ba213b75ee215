//! The labeled record fed to every backend.

use crate::errors::{SampleError, SampleResult};
use serde::{Deserialize, Serialize};

/// Width of a digit image in pixels.
pub const IMAGE_WIDTH: usize = 28;

/// Height of a digit image in pixels.
pub const IMAGE_HEIGHT: usize = 28;

/// Number of pixels in one sample.
pub const PIXEL_COUNT: usize = IMAGE_WIDTH * IMAGE_HEIGHT;

/// Number of digit classes.
pub const CLASS_COUNT: usize = 10;

/// One labeled digit image. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    index: usize,
    pixels: Vec<f32>,
    label: u8,
}

/// On-disk shape of a sample file.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SampleRecord {
    pub pixels: Vec<f32>,
    pub label: i64,
}

impl Sample {
    /// Creates a sample, checking the pixel count, the label range and that every
    /// pixel is finite.
    pub fn new(index: usize, pixels: Vec<f32>, label: u8) -> SampleResult<Self> {
        if pixels.len() != PIXEL_COUNT {
            return Err(SampleError::malformed(
                index,
                format!("expected {} pixels, found {}", PIXEL_COUNT, pixels.len()),
            ));
        }
        if label as usize >= CLASS_COUNT {
            return Err(SampleError::malformed(
                index,
                format!("label {} is outside 0-9", label),
            ));
        }
        if let Some(position) = pixels.iter().position(|p| !p.is_finite()) {
            return Err(SampleError::malformed(
                index,
                format!("pixel {} is not finite", position),
            ));
        }

        Ok(Self {
            index,
            pixels,
            label,
        })
    }

    /// Parses the JSON text of a sample file, `{"pixels": [...], "label": n}`.
    pub fn from_json_str(index: usize, json: &str) -> SampleResult<Self> {
        let record: SampleRecord = serde_json::from_str(json)
            .map_err(|e| SampleError::malformed(index, format!("invalid JSON: {}", e)))?;
        let label = u8::try_from(record.label)
            .map_err(|_| SampleError::malformed(index, format!("label {} is outside 0-9", record.label)))?;
        Self::new(index, record.pixels, label)
    }

    /// Serializes the sample to the JSON shape read by [`Sample::from_json_str`].
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&SampleRecord {
            pixels: self.pixels.clone(),
            label: self.label as i64,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Ground-truth class, 0-9.
    pub fn label(&self) -> u8 {
        self.label
    }
}

/// Rounds an intensity in [0, 1] to the nearest multiple of 1/255.
pub fn quantize_pixel(value: f32) -> f32 {
    (value * 255.0).round() / 255.0
}
