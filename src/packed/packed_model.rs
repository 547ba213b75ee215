//! Packed model serialization, validation and execution.

use crate::activation::Activation;
use crate::errors::{InstructionModelError, PackedModelError, PackedModelResult};
use crate::instruction_model::InstructionModel;
use crate::instruction_model_info::{InstructionInfo, InstructionModelInfo};
use crate::packed::packed_instruction::{PackedInstruction, opcodes};

/// Magic number for the packed model binary format ("PKMI" in little-endian).
pub const PACKED_MODEL_MAGIC: u32 = 0x494D_4B50;

/// Format version.
pub const PACKED_MODEL_VERSION: u32 = 1;

/// Header size in f32s (11 fields).
pub const HEADER_SIZE_F32S: usize = 11;

/// Maximum compute buffer size (in f32s).
pub const MAX_PACKED_COMPUTE_BUFFER: usize = 1 << 20;

mod header {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 1;
    pub const FEATURE_SIZE: usize = 2;
    pub const OUTPUT_SIZE: usize = 3;
    pub const COMPUTE_BUFFER_SIZE: usize = 4;
    pub const INSTRUCTION_COUNT: usize = 5;
    pub const INSTRUCTIONS_OFFSET: usize = 6;
    pub const WEIGHTS_OFFSET: usize = 7;
    pub const WEIGHTS_LEN: usize = 8;
    pub const OUTPUT_START: usize = 9;
    pub const FULL_SIZE: usize = 10;
}

/// Represents a model serialized into a single contiguous f32 array.
#[derive(Debug, Clone)]
pub struct PackedModel {
    /// Single contiguous buffer containing header, instructions and weights.
    data: Vec<f32>,
    /// Decoded instructions, validated against the compute buffer and weights.
    instructions: Vec<PackedInstruction>,
    feature_size: usize,
    output_size: usize,
    compute_buffer_size: usize,
    output_start: usize,
    weights_offset: usize,
    weights_len: usize,
}

impl PackedModel {
    /// Create a packed model from an InstructionModelInfo.
    ///
    /// The info is first built into an [`InstructionModel`] so that only artifacts the
    /// instruction runtime accepts can be packed.
    pub fn from_info(info: &InstructionModelInfo) -> PackedModelResult<Self> {
        InstructionModel::new(info.clone()).map_err(|e| PackedModelError::InvalidModelBinary {
            message: format!("source instruction model is invalid: {}", e),
        })?;
        let feature_size = InstructionModel::calculate_feature_size(info).map_err(
            |e: InstructionModelError| PackedModelError::InvalidModelBinary {
                message: e.to_string(),
            },
        )?;

        let mut builder = PackedModelBuilder::new(info)?;
        let data = builder.build(feature_size)?;
        Self::from_f32_vec(data)
    }

    /// Decode and validate a packed model from its little-endian byte representation.
    pub fn from_bytes(bytes: &[u8]) -> PackedModelResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(PackedModelError::InvalidModelBinary {
                message: format!("length {} is not a multiple of 4 bytes", bytes.len()),
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::from_f32_vec(data)
    }

    /// Encode the model as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    fn from_f32_vec(data: Vec<f32>) -> PackedModelResult<Self> {
        let invalid = |message: String| PackedModelError::InvalidModelBinary { message };

        if data.len() < HEADER_SIZE_F32S {
            return Err(invalid(format!(
                "{} words is shorter than the {} word header",
                data.len(),
                HEADER_SIZE_F32S
            )));
        }
        let field = |index: usize| data[index].to_bits() as usize;

        if data[header::MAGIC].to_bits() != PACKED_MODEL_MAGIC {
            return Err(invalid(format!(
                "bad magic {:#x}",
                data[header::MAGIC].to_bits()
            )));
        }
        if data[header::VERSION].to_bits() != PACKED_MODEL_VERSION {
            return Err(invalid(format!(
                "unsupported version {}",
                data[header::VERSION].to_bits()
            )));
        }
        if field(header::FULL_SIZE) != data.len() {
            return Err(invalid(format!(
                "header declares {} words but found {}",
                field(header::FULL_SIZE),
                data.len()
            )));
        }

        let feature_size = field(header::FEATURE_SIZE);
        let output_size = field(header::OUTPUT_SIZE);
        let compute_buffer_size = field(header::COMPUTE_BUFFER_SIZE);
        let instruction_count = field(header::INSTRUCTION_COUNT);
        let instructions_offset = field(header::INSTRUCTIONS_OFFSET);
        let weights_offset = field(header::WEIGHTS_OFFSET);
        let weights_len = field(header::WEIGHTS_LEN);
        let output_start = field(header::OUTPUT_START);

        if compute_buffer_size > MAX_PACKED_COMPUTE_BUFFER {
            return Err(PackedModelError::ComputeBufferTooLarge {
                required: compute_buffer_size,
                max_size: MAX_PACKED_COMPUTE_BUFFER,
            });
        }
        if feature_size > compute_buffer_size || output_start + output_size != compute_buffer_size
        {
            return Err(invalid(format!(
                "inconsistent buffer layout: features {}, output {}..{}, buffer {}",
                feature_size,
                output_start,
                output_start + output_size,
                compute_buffer_size
            )));
        }
        let instructions_end = instructions_offset + instruction_count * PackedInstruction::SIZE_U32S;
        if instructions_offset != HEADER_SIZE_F32S
            || instructions_end != weights_offset
            || weights_offset + weights_len != data.len()
        {
            return Err(invalid("inconsistent section offsets".to_string()));
        }

        let instructions = data[instructions_offset..instructions_end]
            .chunks_exact(PackedInstruction::SIZE_U32S)
            .map(|words| {
                let mut array = [0.0f32; PackedInstruction::SIZE_U32S];
                array.copy_from_slice(words);
                PackedInstruction::from_f32_slice(&array)
            })
            .collect::<Vec<_>>();

        let model = PackedModel {
            data,
            instructions,
            feature_size,
            output_size,
            compute_buffer_size,
            output_start,
            weights_offset,
            weights_len,
        };
        model.validate_instructions()?;
        Ok(model)
    }

    /// Checks every instruction against the compute buffer and the weights section,
    /// so execution never indexes out of bounds.
    fn validate_instructions(&self) -> PackedModelResult<()> {
        for (index, inst) in self.instructions.iter().enumerate() {
            let data_size = inst.data_size as usize;
            let out_of_bounds = |end: usize| PackedModelError::OutOfBounds {
                instruction_index: index,
                end,
                buffer_size: self.compute_buffer_size,
            };
            let output_end = inst.output_ptr as usize + data_size;
            if output_end > self.compute_buffer_size {
                return Err(out_of_bounds(output_end));
            }

            match inst.opcode {
                opcodes::DOT => {
                    let input_end = inst.input_ptr as usize + inst.param1 as usize;
                    if input_end > self.compute_buffer_size {
                        return Err(out_of_bounds(input_end));
                    }
                    let weights_end =
                        inst.param0 as usize + data_size * (inst.param1 as usize + 1);
                    if weights_end > self.weights_len {
                        return Err(PackedModelError::MissingWeights {
                            instruction_index: index,
                        });
                    }
                    Activation::from_code(inst.param2).map_err(|activation_id| {
                        PackedModelError::InvalidActivation { activation_id }
                    })?;
                }
                opcodes::ACTIVATION => {
                    let activation = Activation::from_code(inst.param2).map_err(
                        |activation_id| PackedModelError::InvalidActivation { activation_id },
                    )?;
                    if activation.is_none() {
                        return Err(PackedModelError::InvalidActivation {
                            activation_id: inst.param2,
                        });
                    }
                }
                opcodes::COPY => {
                    let input_end = inst.input_ptr as usize + data_size;
                    if input_end > self.compute_buffer_size {
                        return Err(out_of_bounds(input_end));
                    }
                }
                opcode => {
                    return Err(PackedModelError::UnknownOpcode {
                        opcode,
                        instruction_index: index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs every instruction over the compute buffer.
    /// The features must already be written at the start of the buffer.
    pub fn predict_with_buffer(&self, compute_buffer: &mut [f32]) -> PackedModelResult<()> {
        if compute_buffer.len() < self.compute_buffer_size {
            return Err(PackedModelError::InputSizeMismatch {
                expected: self.compute_buffer_size,
                actual: compute_buffer.len(),
            });
        }
        let weights = &self.data[self.weights_offset..self.weights_offset + self.weights_len];

        for inst in &self.instructions {
            let data_size = inst.data_size as usize;
            let output_ptr = inst.output_ptr as usize;
            match inst.opcode {
                opcodes::DOT => {
                    let input_ptr = inst.input_ptr as usize;
                    let input_size = inst.param1 as usize;
                    let matrix_start = inst.param0 as usize;
                    let bias_start = matrix_start + data_size * input_size;

                    for row in 0..data_size {
                        let row_weights =
                            &weights[matrix_start + row * input_size..matrix_start + (row + 1) * input_size];
                        let mut sum = weights[bias_start + row];
                        for (col, &weight) in row_weights.iter().enumerate() {
                            sum += weight * compute_buffer[input_ptr + col];
                        }
                        compute_buffer[output_ptr + row] = sum;
                    }

                    if let Ok(Some(activation)) = Activation::from_code(inst.param2) {
                        activation.apply_in_place(&mut compute_buffer[output_ptr..output_ptr + data_size]);
                    }
                }
                opcodes::ACTIVATION => {
                    if let Ok(Some(activation)) = Activation::from_code(inst.param2) {
                        activation.apply_in_place(&mut compute_buffer[output_ptr..output_ptr + data_size]);
                    }
                }
                opcodes::COPY => {
                    let input_ptr = inst.input_ptr as usize;
                    compute_buffer.copy_within(input_ptr..input_ptr + data_size, output_ptr);
                }
                // Rejected by `validate_instructions`.
                _ => {}
            }
        }
        Ok(())
    }

    /// Predicts output, allocating a new compute buffer.
    pub fn predict(&self, input: &[f32]) -> PackedModelResult<Vec<f32>> {
        if input.len() != self.feature_size {
            return Err(PackedModelError::InputSizeMismatch {
                expected: self.feature_size,
                actual: input.len(),
            });
        }
        let mut compute_buffer = vec![0.0f32; self.compute_buffer_size];
        compute_buffer[..self.feature_size].copy_from_slice(input);
        self.predict_with_buffer(&mut compute_buffer)?;
        Ok(compute_buffer[self.output_start..self.output_start + self.output_size].to_vec())
    }

    #[cfg(test)]
    fn as_f32_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get the total model size in f32s.
    pub fn full_size(&self) -> usize {
        self.data.len()
    }

    /// Get feature size (input size).
    pub fn feature_size(&self) -> usize {
        self.feature_size
    }

    /// Get output size.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Get required compute buffer size.
    pub fn compute_buffer_size(&self) -> usize {
        self.compute_buffer_size
    }

    /// Get output start index in compute buffer.
    pub fn output_start(&self) -> usize {
        self.output_start
    }
}

/// Builder for constructing packed models.
struct PackedModelBuilder<'a> {
    info: &'a InstructionModelInfo,
    computation_buffer_indexes: Vec<usize>,
    computation_buffer_sizes: Vec<usize>,
    weights_data: Vec<f32>,
    weights_offsets: Vec<u32>,
    instructions: Vec<PackedInstruction>,
}

impl<'a> PackedModelBuilder<'a> {
    fn new(info: &'a InstructionModelInfo) -> PackedModelResult<Self> {
        let computation_buffer_sizes = info.computation_buffer_sizes.clone();
        let mut computation_buffer_indexes = vec![0usize];
        let mut current_idx = computation_buffer_sizes[0];

        for &size in computation_buffer_sizes.iter().skip(1) {
            computation_buffer_indexes.push(current_idx);
            current_idx += size;
        }

        if current_idx > MAX_PACKED_COMPUTE_BUFFER {
            return Err(PackedModelError::ComputeBufferTooLarge {
                required: current_idx,
                max_size: MAX_PACKED_COMPUTE_BUFFER,
            });
        }

        Ok(Self {
            info,
            computation_buffer_indexes,
            computation_buffer_sizes,
            weights_data: Vec::new(),
            weights_offsets: Vec::new(),
            instructions: Vec::new(),
        })
    }

    fn build(&mut self, feature_size: usize) -> PackedModelResult<Vec<f32>> {
        self.collect_weights();
        for (idx, inst_info) in self.info.instructions.iter().enumerate() {
            let packed = self.convert_instruction(inst_info, idx)?;
            self.instructions.push(packed);
        }

        let last = self.computation_buffer_sizes.len() - 1;
        let output_start = self.computation_buffer_indexes[last];
        let output_size = self.computation_buffer_sizes[last];
        let compute_buffer_size = output_start + output_size;

        let instructions_offset = HEADER_SIZE_F32S;
        let weights_offset =
            instructions_offset + self.instructions.len() * PackedInstruction::SIZE_U32S;
        let full_size = weights_offset + self.weights_data.len();

        let mut data: Vec<f32> = [
            PACKED_MODEL_MAGIC,
            PACKED_MODEL_VERSION,
            feature_size as u32,
            output_size as u32,
            compute_buffer_size as u32,
            self.instructions.len() as u32,
            instructions_offset as u32,
            weights_offset as u32,
            self.weights_data.len() as u32,
            output_start as u32,
            full_size as u32,
        ]
        .into_iter()
        .map(f32::from_bits)
        .collect();

        for inst in &self.instructions {
            data.extend_from_slice(&inst.to_f32_array());
        }
        data.extend_from_slice(&self.weights_data);

        Ok(data)
    }

    /// Flattens each weight matrix row-major and appends its bias.
    fn collect_weights(&mut self) {
        for (weights_matrix, bias_vec) in self.info.weights.iter().zip(self.info.bias.iter()) {
            self.weights_offsets.push(self.weights_data.len() as u32);
            for row in weights_matrix {
                self.weights_data.extend_from_slice(row);
            }
            self.weights_data.extend_from_slice(bias_vec);
        }
    }

    fn convert_instruction(
        &self,
        info: &InstructionInfo,
        idx: usize,
    ) -> PackedModelResult<PackedInstruction> {
        match info {
            InstructionInfo::Dot(dot_info) => {
                let weights_offset = self.weights_offsets.get(dot_info.weights).copied().ok_or(
                    PackedModelError::MissingWeights {
                        instruction_index: idx,
                    },
                )?;

                Ok(PackedInstruction::dot(
                    self.computation_buffer_indexes[dot_info.input] as u32,
                    self.computation_buffer_indexes[dot_info.output] as u32,
                    self.computation_buffer_sizes[dot_info.output] as u32,
                    weights_offset,
                    self.computation_buffer_sizes[dot_info.input] as u32,
                    dot_info.activation,
                ))
            }
            InstructionInfo::Activation(act_info) => Ok(PackedInstruction::activation(
                self.computation_buffer_indexes[act_info.input] as u32,
                self.computation_buffer_sizes[act_info.input] as u32,
                act_info.activation,
            )),
            InstructionInfo::Copy(copy_info) => Ok(PackedInstruction::copy(
                self.computation_buffer_indexes[copy_info.input] as u32,
                (self.computation_buffer_indexes[copy_info.output] + copy_info.internal_index)
                    as u32,
                self.computation_buffer_sizes[copy_info.input] as u32,
            )),
        }
    }
}
