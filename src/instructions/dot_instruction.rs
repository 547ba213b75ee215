//! Dot product instruction implementation.
//!
//! Represents an instruction that performs a complete dot product operation,
//! similar to the Dense layer in common deep learning frameworks.

use crate::activation::Activation;
use crate::errors::InstructionModelResult;
use crate::instructions::{Instruction, activation_instruction::ActivationInstruction};

/// Instruction that performs a dense (matrix-vector) operation followed by bias and activation.
///
/// Weights are stored row-major in a single contiguous vector so the hot loop walks
/// memory linearly.
pub struct DotInstruction {
    weights: Vec<f32>,
    bias: Vec<f32>,
    input_ptr: usize,
    input_size: usize,
    output_ptr: usize,
    data_size: usize,
    activation_instruction: Option<ActivationInstruction>,
}

impl DotInstruction {
    /// Creates a new DotInstruction. `weights` has shape [output_size, input_size].
    pub fn new(
        input_ptr: usize,
        output_ptr: usize,
        input_size: usize,
        weights: &[Vec<f32>],
        bias: &[f32],
        activation: Option<Activation>,
    ) -> Self {
        let data_size = bias.len();
        let activation_instruction =
            activation.map(|act| ActivationInstruction::new(act, output_ptr, data_size));

        Self {
            weights: weights.concat(),
            bias: bias.to_vec(),
            input_ptr,
            input_size,
            output_ptr,
            data_size,
            activation_instruction,
        }
    }

    #[inline(always)]
    fn apply_forward_pass(&self, unified_computation_buffer: &mut [f32]) {
        let input_start = self.input_ptr;
        let output_start = self.output_ptr;

        for (row_index, (weights_row, &bias_value)) in self
            .weights
            .chunks_exact(self.input_size)
            .zip(self.bias.iter())
            .enumerate()
        {
            let input = &unified_computation_buffer[input_start..input_start + self.input_size];
            let sum = weights_row
                .iter()
                .zip(input.iter())
                .fold(bias_value, |acc, (&w, &x)| acc + w * x);
            unified_computation_buffer[output_start + row_index] = sum;
        }
    }
}

impl Instruction for DotInstruction {
    fn output_ptr(&self) -> usize {
        self.output_ptr
    }

    fn data_size(&self) -> usize {
        self.data_size
    }

    fn apply(&self, unified_computation_buffer: &mut [f32]) -> InstructionModelResult<()> {
        self.apply_forward_pass(unified_computation_buffer);

        if let Some(ref activation_instruction) = self.activation_instruction {
            activation_instruction.apply(unified_computation_buffer)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_with_relu() {
        // buffer: | input (2) | output (2) |
        let mut buffer = vec![1.0, 2.0, 0.0, 0.0];
        let instruction = DotInstruction::new(
            0,
            2,
            2,
            &[vec![1.0, 1.0], vec![-1.0, -1.0]],
            &[0.5, 0.5],
            Some(Activation::Relu),
        );

        instruction.apply(&mut buffer).unwrap();

        assert_eq!(buffer[2], 3.5);
        assert_eq!(buffer[3], 0.0);
        assert_eq!(instruction.output_ptr(), 2);
        assert_eq!(instruction.data_size(), 2);
    }
}
