//! Fixed-width instruction encoding for the packed model format.

use crate::activation::Activation;

/// Opcode constants of the packed format.
pub mod opcodes {
    pub const DOT: u32 = 0x01;
    pub const ACTIVATION: u32 = 0x02;
    pub const COPY: u32 = 0x05;
}

/// Encoded instruction (32 bytes / 8 u32s).
///
/// For DOT, `param0` is the weights offset, `param1` the input size and `param2`
/// the activation code. ACTIVATION only uses `param2`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedInstruction {
    pub opcode: u32,
    pub input_ptr: u32,
    pub output_ptr: u32,
    pub data_size: u32,
    pub param0: u32,
    pub param1: u32,
    pub param2: u32,
    pub reserved: u32,
}

impl PackedInstruction {
    pub const SIZE_BYTES: usize = 32;
    pub const SIZE_U32S: usize = 8;

    /// Create a DOT instruction.
    pub fn dot(
        input_ptr: u32,
        output_ptr: u32,
        output_size: u32,
        weights_offset: u32,
        input_size: u32,
        activation: Option<Activation>,
    ) -> Self {
        Self {
            opcode: opcodes::DOT,
            input_ptr,
            output_ptr,
            data_size: output_size,
            param0: weights_offset,
            param1: input_size,
            param2: Activation::to_code(activation),
            reserved: 0,
        }
    }

    /// Create an ACTIVATION instruction.
    pub fn activation(ptr: u32, size: u32, activation: Activation) -> Self {
        Self {
            opcode: opcodes::ACTIVATION,
            input_ptr: ptr,
            output_ptr: ptr,
            data_size: size,
            param2: Activation::to_code(Some(activation)),
            ..Self::default()
        }
    }

    /// Create a COPY instruction.
    pub fn copy(src_ptr: u32, dst_ptr: u32, size: u32) -> Self {
        Self {
            opcode: opcodes::COPY,
            input_ptr: src_ptr,
            output_ptr: dst_ptr,
            data_size: size,
            ..Self::default()
        }
    }

    /// Convert to f32 array (for packing into single f32 buffer).
    /// Each u32 field is bitcast to f32.
    pub fn to_f32_array(&self) -> [f32; Self::SIZE_U32S] {
        let words: [u32; Self::SIZE_U32S] = bytemuck::cast(*self);
        words.map(f32::from_bits)
    }

    /// Decode an instruction from its packed f32 words.
    pub fn from_f32_slice(words: &[f32; Self::SIZE_U32S]) -> Self {
        bytemuck::cast(words.map(f32::to_bits))
    }
}
