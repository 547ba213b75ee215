//! Error types for the packed flat-buffer model format.

use thiserror::Error;

/// Errors specific to packed model encoding, decoding and execution.
#[derive(Error, Debug)]
pub enum PackedModelError {
    #[error("Compute buffer size {required} exceeds the packed maximum {max_size}")]
    ComputeBufferTooLarge { required: usize, max_size: usize },

    #[error("Unknown opcode {opcode:#x} in instruction {instruction_index}")]
    UnknownOpcode { opcode: u32, instruction_index: usize },

    #[error("Invalid activation type: {activation_id}")]
    InvalidActivation { activation_id: u32 },

    #[error("Invalid packed model binary: {message}")]
    InvalidModelBinary { message: String },

    #[error("Missing weights for instruction at index {instruction_index}")]
    MissingWeights { instruction_index: usize },

    #[error("Input size mismatch: expected {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error(
        "Instruction {instruction_index} reads or writes outside the compute buffer ({end} > {buffer_size})"
    )]
    OutOfBounds {
        instruction_index: usize,
        end: usize,
        buffer_size: usize,
    },
}
