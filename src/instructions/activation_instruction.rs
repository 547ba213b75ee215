//! Activation instruction implementation.

use crate::activation::Activation;
use crate::errors::InstructionModelResult;
use crate::instructions::Instruction;

/// Represents an instruction that applies an activation function to values in place.
pub struct ActivationInstruction {
    activation: Activation,
    output_ptr: usize,
    data_size: usize,
}

impl ActivationInstruction {
    pub fn new(activation: Activation, output_ptr: usize, data_size: usize) -> Self {
        Self {
            activation,
            output_ptr,
            data_size,
        }
    }
}

impl Instruction for ActivationInstruction {
    fn output_ptr(&self) -> usize {
        self.output_ptr
    }

    fn data_size(&self) -> usize {
        self.data_size
    }

    fn apply(&self, unified_computation_buffer: &mut [f32]) -> InstructionModelResult<()> {
        let start = self.output_ptr;
        let end = start + self.data_size;
        self.activation
            .apply_in_place(&mut unified_computation_buffer[start..end]);
        Ok(())
    }
}
