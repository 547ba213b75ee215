//! Error types for decoding MNIST IDX files.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DatasetError {
    #[error("File is shorter than its {expected}-byte header")]
    TruncatedHeader { expected: usize },

    #[error("Bad magic {found:#010x}, expected {expected:#010x}")]
    InvalidMagic { found: u32, expected: u32 },

    #[error("Images are {rows}x{cols}, expected {expected} pixels")]
    ImageShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("{images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },

    #[error("Payload length does not match the declared count of {count}")]
    PayloadLength { count: usize },

    #[error("Label {label} is outside 0-9")]
    LabelOutOfRange { label: u8 },
}
