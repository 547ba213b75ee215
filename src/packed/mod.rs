//! Packed runtime: executes a model stored as one contiguous `f32` array.
//!
//! # Memory Layout
//!
//! All model data is packed into a single contiguous f32 array:
//! - Header (11 f32s) - model metadata, integers stored bit-cast as f32
//! - Instructions (N x 8 f32s each)
//! - Weights (row-major matrices, each followed by its bias)
//!
//! On disk the array is written as little-endian `f32` words. A packed model is
//! produced from an instruction model with [`PackedModel::from_info`].

pub mod packed_instruction;
pub mod packed_model;

pub use packed_instruction::{PackedInstruction, opcodes};
pub use packed_model::{PACKED_MODEL_MAGIC, PACKED_MODEL_VERSION, PackedModel};
