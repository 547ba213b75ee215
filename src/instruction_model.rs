//! Instruction runtime: executes an instruction model over a unified computation buffer.
//!
//! The model is built from an [`InstructionModelInfo`] JSON artifact. Every computation
//! buffer is laid out back to back in a single `f32` vector; the first buffer holds the
//! features and the last buffer holds the model output.

use crate::errors::{InstructionModelError, InstructionModelResult};
use crate::instruction_model_info::{InstructionInfo, InstructionModelInfo};
use crate::instructions::{Instruction, create_instruction};

/// Maximum computation buffer size (default configuration)
const MAX_COMPUTATION_BUFFER_SIZE: usize = 1_000_000;

/// Maximum weight size (default configuration)
const MAX_WEIGHT_SIZE: usize = 10_000_000;

/// Tolerance used when checking the validation data embedded in an artifact.
const VALIDATION_DELTA: f32 = 1e-5;

/// A model configured to follow an optimized sequence of instructions.
pub struct InstructionModel {
    instructions: Vec<Box<dyn Instruction>>,
    feature_size: usize,
    computation_buffer_sizes: Vec<usize>,
    output_index_start: usize,
    output_index_end: usize,
}

impl InstructionModel {
    /// Creates a new InstructionModel from InstructionModelInfo.
    pub fn new(instruction_model_info: InstructionModelInfo) -> InstructionModelResult<Self> {
        Self::validate_inputs(&instruction_model_info)?;

        let computation_buffer_sizes = instruction_model_info.computation_buffer_sizes.clone();
        let feature_size = Self::calculate_feature_size(&instruction_model_info)?;

        let (computation_buffer_indexes, output_index_end) =
            Self::calculate_computation_buffer_indexes(&computation_buffer_sizes)?;
        let output_index_start =
            output_index_end - computation_buffer_sizes[computation_buffer_sizes.len() - 1];

        Self::validate_required_memory(output_index_end)?;

        let instructions = Self::validate_and_create_instructions(
            &instruction_model_info,
            &computation_buffer_indexes,
            &computation_buffer_sizes,
        )?;

        let model = InstructionModel {
            instructions,
            feature_size,
            computation_buffer_sizes,
            output_index_start,
            output_index_end,
        };

        if let Some(validation_data) = &instruction_model_info.validation_data {
            model.validate_model(
                &validation_data.inputs,
                &validation_data.expected_outputs,
                VALIDATION_DELTA,
            )?;
        }

        Ok(model)
    }

    /// Parses and builds a model from its JSON artifact text.
    pub fn from_json_str(json: &str) -> InstructionModelResult<Self> {
        Self::new(InstructionModelInfo::from_json_str(json)?)
    }

    /// Computes the total feature size based on the provided instruction model information.
    ///
    /// Features are either plain names (size 1) or `name[n]` for a vector feature of size n.
    pub fn calculate_feature_size(
        instruction_model_info: &InstructionModelInfo,
    ) -> InstructionModelResult<usize> {
        let Some(features) = &instruction_model_info.features else {
            return instruction_model_info
                .feature_size
                .ok_or(InstructionModelError::MissingFeatures);
        };

        let mut total_size = 0;
        for feature in features {
            total_size += Self::parse_feature_width(feature)?;
        }

        if let Some(feature_size) = instruction_model_info.feature_size {
            if feature_size != total_size {
                return Err(InstructionModelError::FeatureSizeMismatch {
                    expected: feature_size,
                    actual: total_size,
                });
            }
        }

        Ok(total_size)
    }

    fn parse_feature_width(feature: &str) -> InstructionModelResult<usize> {
        let invalid = || InstructionModelError::InvalidFeatureFormat {
            feature: feature.to_string(),
        };

        let Some(open_bracket) = feature.find('[') else {
            if feature.contains(']') {
                return Err(invalid());
            }
            return Ok(1);
        };

        if !feature.ends_with(']') || feature.chars().filter(|&c| c == '[' || c == ']').count() != 2
        {
            return Err(invalid());
        }

        let prefix = &feature[..open_bracket];
        let number_str = &feature[open_bracket + 1..feature.len() - 1];
        if prefix.is_empty() {
            return Err(invalid());
        }

        match number_str.parse::<usize>() {
            Ok(number) if number > 0 => Ok(number),
            _ => Err(invalid()),
        }
    }

    /// Validates that the specified feature size exactly fills one or more complete input buffers.
    fn validate_feature_size(feature_size: usize, buffer_sizes: &[usize]) -> InstructionModelResult<()> {
        let mut accumulated = 0;
        let mut accumulated_capacities = Vec::new();

        for &capacity in buffer_sizes {
            accumulated += capacity;
            accumulated_capacities.push(accumulated);
            if accumulated == feature_size {
                return Ok(());
            } else if accumulated > feature_size {
                break;
            }
        }

        Err(InstructionModelError::InvalidFeatureSize {
            expected: feature_size,
            actual: accumulated,
            capacities: accumulated_capacities,
        })
    }

    /// Performs basic initial validation of the inputs of the model.
    fn validate_inputs(instruction_model_info: &InstructionModelInfo) -> InstructionModelResult<()> {
        if instruction_model_info.features.is_none()
            && instruction_model_info.feature_size.is_none()
        {
            return Err(InstructionModelError::MissingFeatures);
        }

        if instruction_model_info.computation_buffer_sizes.is_empty() {
            return Err(InstructionModelError::NoLayersProvided);
        }

        if instruction_model_info.bias.len() != instruction_model_info.weights.len() {
            return Err(InstructionModelError::BiasWeightsMismatch);
        }

        if instruction_model_info.instructions.is_empty() {
            return Err(InstructionModelError::NoInstructionsProvided);
        }

        if instruction_model_info.bias.len() > instruction_model_info.instructions.len() {
            return Err(InstructionModelError::TooManyWeightsForInstructions);
        }

        let mut calculated_size = 0;
        for (i, bias_vec) in instruction_model_info.bias.iter().enumerate() {
            calculated_size += bias_vec.len();
            if bias_vec.len() != instruction_model_info.weights[i].len() {
                return Err(InstructionModelError::BiasWeightsSizeMismatch {
                    index: i,
                    bias_size: bias_vec.len(),
                    weights_size: instruction_model_info.weights[i].len(),
                });
            }
            for weights_row in &instruction_model_info.weights[i] {
                calculated_size += weights_row.len();
            }
        }

        if calculated_size > MAX_WEIGHT_SIZE {
            return Err(InstructionModelError::WeightSizeExceedsLimit {
                actual: calculated_size,
                max: MAX_WEIGHT_SIZE,
            });
        }

        Self::validate_feature_size(
            Self::calculate_feature_size(instruction_model_info)?,
            &instruction_model_info.computation_buffer_sizes,
        )?;

        if let Some(validation_data) = &instruction_model_info.validation_data {
            if validation_data.inputs.len() != validation_data.expected_outputs.len() {
                return Err(InstructionModelError::ValidationInputOutputMismatch);
            }
        }

        Ok(())
    }

    /// Validate if the model required memory is within the maximum allowed.
    fn validate_required_memory(output_index_end: usize) -> InstructionModelResult<()> {
        if output_index_end > MAX_COMPUTATION_BUFFER_SIZE {
            return Err(InstructionModelError::ComputationBufferSizeExceedsLimit {
                actual: output_index_end,
                max: MAX_COMPUTATION_BUFFER_SIZE,
            });
        }
        Ok(())
    }

    /// Returns the start offset of every buffer and the total unified buffer size.
    fn calculate_computation_buffer_indexes(
        computation_buffer_sizes: &[usize],
    ) -> InstructionModelResult<(Vec<usize>, usize)> {
        let mut computation_buffer_indexes = vec![0];
        let mut index = computation_buffer_sizes[0];

        for &computation_buffer_size in &computation_buffer_sizes[1..] {
            if computation_buffer_size == 0 {
                return Err(InstructionModelError::InvalidLayerSize);
            }
            computation_buffer_indexes.push(index);
            index += computation_buffer_size;
        }

        if index == 0 {
            return Err(InstructionModelError::InvalidUnifiedBufferSize);
        }

        Ok((computation_buffer_indexes, index))
    }

    fn validate_and_create_instructions(
        instruction_model_info: &InstructionModelInfo,
        computation_buffer_indexes: &[usize],
        computation_buffer_sizes: &[usize],
    ) -> InstructionModelResult<Vec<Box<dyn Instruction>>> {
        let weights = &instruction_model_info.weights;
        let bias = &instruction_model_info.bias;

        let mut instructions = Vec::new();
        let mut used_weights = vec![false; weights.len()];

        for instruction_info in &instruction_model_info.instructions {
            Self::validate_buffer_index(
                "input",
                instruction_info.input(),
                computation_buffer_sizes.len(),
            )?;
            Self::validate_buffer_index(
                "output",
                instruction_info.output(),
                computation_buffer_sizes.len(),
            )?;

            let instruction = create_instruction(
                instruction_info,
                computation_buffer_indexes,
                computation_buffer_sizes,
                weights,
                bias,
            )?;

            if let InstructionInfo::Dot(info) = instruction_info {
                used_weights[info.weights] = true;
            }

            instructions.push(instruction);
        }

        if let Some(index) = used_weights.iter().position(|&used| !used) {
            return Err(InstructionModelError::UnusedWeights { index });
        }

        Ok(instructions)
    }

    fn validate_buffer_index(label: &str, buffer_index: usize, max_size: usize) -> InstructionModelResult<()> {
        if buffer_index >= max_size {
            return Err(InstructionModelError::BufferIndexOutOfBounds {
                label: label.to_string(),
                index: buffer_index,
            });
        }
        Ok(())
    }

    /// Validates the model using inference on input data and comparing the expected outputs with the predicted outputs.
    pub fn validate_model(
        &self,
        inputs: &[Vec<f32>],
        outputs: &[Vec<f32>],
        delta: f32,
    ) -> InstructionModelResult<()> {
        if inputs.len() != outputs.len() {
            return Err(InstructionModelError::InputOutputCountMismatch);
        }

        let last_layer_size = self.get_output_size();

        for (i, (input, expected_output)) in inputs.iter().zip(outputs.iter()).enumerate() {
            if expected_output.len() != last_layer_size {
                return Err(InstructionModelError::ValidationOutputSizeMismatch {
                    index: i,
                    provided: expected_output.len(),
                    expected: last_layer_size,
                });
            }

            let computed = self.predict(input)?;
            let matches = expected_output
                .iter()
                .zip(computed.iter())
                .all(|(expected, actual)| (expected - actual).abs() <= delta);
            if !matches {
                return Err(InstructionModelError::ValidationMismatch {
                    case_number: i,
                    expected: expected_output.clone(),
                    computed,
                });
            }
        }

        Ok(())
    }

    /// Returns the required memory size.
    pub fn required_memory(&self) -> usize {
        self.output_index_end
    }

    /// Predicts output using the provided computation buffer.
    /// The features must already be written at the start of the buffer.
    pub fn predict_with_buffer(&self, unified_computation_buffer: &mut [f32]) -> InstructionModelResult<()> {
        if unified_computation_buffer.len() < self.output_index_end {
            return Err(InstructionModelError::ComputationBufferTooSmall {
                buffer_size: unified_computation_buffer.len(),
                required_size: self.output_index_end,
            });
        }

        for instruction in &self.instructions {
            instruction.apply(unified_computation_buffer)?;
        }

        Ok(())
    }

    /// Predicts output, allocating a new computation buffer.
    pub fn predict(&self, input: &[f32]) -> InstructionModelResult<Vec<f32>> {
        if input.len() != self.feature_size {
            return Err(InstructionModelError::ValidationInputSizeMismatch {
                provided: input.len(),
                expected: self.feature_size,
            });
        }

        let mut unified_computation_buffer = vec![0.0f32; self.output_index_end];
        unified_computation_buffer[..self.feature_size].copy_from_slice(input);

        self.predict_with_buffer(&mut unified_computation_buffer)?;

        Ok(unified_computation_buffer[self.output_index_start..self.output_index_end].to_vec())
    }

    /// Returns the size of the input layer.
    pub fn get_feature_size(&self) -> usize {
        self.feature_size
    }

    /// Returns the size of the output layer.
    pub fn get_output_size(&self) -> usize {
        self.computation_buffer_sizes[self.computation_buffer_sizes.len() - 1]
    }

    /// Returns the start index of the output layer in the computation buffer.
    pub fn get_output_index_start(&self) -> usize {
        self.output_index_start
    }
}
