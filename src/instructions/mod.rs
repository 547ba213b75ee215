//! Instruction implementations executed by the instruction runtime.
//!
//! Each instruction operates on a region of the unified computation buffer.
//! A digit classifier only needs dense layers, copies and activations.

use crate::errors::{InstructionModelError, InstructionModelResult};
use crate::instruction_model_info::InstructionInfo;

pub mod activation_instruction;
pub mod copy_instruction;
pub mod dot_instruction;

pub use activation_instruction::ActivationInstruction;
pub use copy_instruction::CopyInstruction;
pub use dot_instruction::DotInstruction;

/// Base trait for all instruction types.
///
/// All instructions know the output pointer and the size of the data they write,
/// the minimum information needed to locate the result of the operation.
pub trait Instruction: Send + Sync {
    /// Returns the output pointer that represents the first index in the buffer to copy to.
    fn output_ptr(&self) -> usize;

    /// Returns the size of the data that will be stored at the output pointer.
    fn data_size(&self) -> usize;

    /// Applies the instruction to the computation buffer.
    fn apply(&self, unified_computation_buffer: &mut [f32]) -> InstructionModelResult<()>;
}

/// Creates an instruction from instruction info and model context.
pub fn create_instruction(
    instruction_info: &InstructionInfo,
    computation_buffer_indexes: &[usize],
    computation_buffer_sizes: &[usize],
    weights: &[Vec<Vec<f32>>],
    bias: &[Vec<f32>],
) -> InstructionModelResult<Box<dyn Instruction>> {
    match instruction_info {
        InstructionInfo::Dot(info) => {
            if info.input == info.output {
                return Err(InstructionModelError::SameInputOutputIndexes {
                    instruction_type: "DOT".to_string(),
                });
            }
            if info.weights >= weights.len() {
                return Err(InstructionModelError::WeightsIndexOutOfBounds {
                    index: info.weights,
                });
            }

            let weights_matrix = &weights[info.weights];
            let bias_vector =
                bias.get(info.weights)
                    .ok_or(InstructionModelError::WeightsIndexOutOfBounds {
                        index: info.weights,
                    })?;

            let input_size = computation_buffer_sizes[info.input];
            let output_size = computation_buffer_sizes[info.output];

            if input_size == 0 {
                return Err(InstructionModelError::InvalidLayerSize);
            }
            if weights_matrix.len() != output_size {
                return Err(InstructionModelError::WeightsRowSizeMismatch {
                    weights_rows: weights_matrix.len(),
                    output_size,
                });
            }
            if bias_vector.len() != output_size {
                return Err(InstructionModelError::BiasOutputSizeMismatch {
                    bias_index: info.weights,
                    output_index: info.output,
                    bias_size: bias_vector.len(),
                    output_size,
                });
            }
            for row in weights_matrix {
                if row.len() != input_size {
                    return Err(InstructionModelError::WeightsColumnSizeMismatch {
                        input_index: info.input,
                        weights_columns: row.len(),
                        input_size,
                    });
                }
            }

            let instruction = DotInstruction::new(
                computation_buffer_indexes[info.input],
                computation_buffer_indexes[info.output],
                input_size,
                weights_matrix,
                bias_vector,
                info.activation,
            );
            Ok(Box::new(instruction))
        }
        InstructionInfo::Copy(info) => {
            if info.input == info.output {
                return Err(InstructionModelError::SameInputOutputIndexes {
                    instruction_type: "COPY".to_string(),
                });
            }
            let data_size = computation_buffer_sizes[info.input];
            let output_size = computation_buffer_sizes[info.output];
            if info.internal_index + data_size > output_size {
                return Err(InstructionModelError::InternalIndexOutOfBounds {
                    internal_index: info.internal_index,
                    data_size,
                    output_size,
                });
            }

            let instruction = CopyInstruction::new(
                computation_buffer_indexes[info.input],
                computation_buffer_indexes[info.output] + info.internal_index,
                data_size,
            );
            Ok(Box::new(instruction))
        }
        InstructionInfo::Activation(info) => {
            let instruction = ActivationInstruction::new(
                info.activation,
                computation_buffer_indexes[info.input],
                computation_buffer_sizes[info.input],
            );
            Ok(Box::new(instruction))
        }
    }
}
