//! Copy instruction implementation.

use crate::errors::InstructionModelResult;
use crate::instructions::Instruction;

/// Represents an instruction that copies data from one buffer location to another.
pub struct CopyInstruction {
    input_ptr: usize,
    output_ptr: usize,
    data_size: usize,
}

impl CopyInstruction {
    pub fn new(input_ptr: usize, output_ptr: usize, data_size: usize) -> Self {
        Self {
            input_ptr,
            output_ptr,
            data_size,
        }
    }
}

impl Instruction for CopyInstruction {
    fn output_ptr(&self) -> usize {
        self.output_ptr
    }

    fn data_size(&self) -> usize {
        self.data_size
    }

    fn apply(&self, unified_computation_buffer: &mut [f32]) -> InstructionModelResult<()> {
        unified_computation_buffer.copy_within(
            self.input_ptr..self.input_ptr + self.data_size,
            self.output_ptr,
        );
        Ok(())
    }
}
