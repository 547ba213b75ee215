//! Data structures for the instruction model artifact.
//!
//! An instruction model is the JSON representation of a trained network: a list of
//! computation buffer sizes, a sequence of instructions operating on those buffers, and
//! the weights they reference. It is the artifact loaded by the instruction runtime and
//! the source from which packed models are produced.

use crate::activation::Activation;
use crate::errors::InstructionModelResult;
use serde::{Deserialize, Serialize};

/// Validation data required for model evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationData {
    /// List of input data where each item is a list of feature values.
    pub inputs: Vec<Vec<f32>>,
    /// List of expected outputs corresponding to the input data.
    pub expected_outputs: Vec<Vec<f32>>,
}

/// Information required to configure a model instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstructionInfo {
    #[serde(rename = "DOT")]
    Dot(DotInstructionInfo),
    #[serde(rename = "COPY")]
    Copy(CopyInstructionInfo),
    #[serde(rename = "ACTIVATION")]
    Activation(ActivationInstructionInfo),
}

impl InstructionInfo {
    /// Returns the input buffer index read by this instruction.
    pub fn input(&self) -> usize {
        match self {
            InstructionInfo::Dot(info) => info.input,
            InstructionInfo::Copy(info) => info.input,
            InstructionInfo::Activation(info) => info.input,
        }
    }

    /// Returns the output buffer index for this instruction.
    /// For instructions operating in place, the output index is the input index.
    pub fn output(&self) -> usize {
        match self {
            InstructionInfo::Dot(info) => info.output,
            InstructionInfo::Copy(info) => info.output,
            InstructionInfo::Activation(info) => info.input,
        }
    }
}

/// Represents a dot product operation instruction (a dense layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotInstructionInfo {
    /// Input index of the target buffer.
    pub input: usize,
    /// Output index of the target buffer.
    pub output: usize,
    /// Weights index targeting the weights of a given layer.
    pub weights: usize,
    /// Activation function (may be null).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
}

/// Represents a sliced data copy operation instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyInstructionInfo {
    /// Input index of the target buffer.
    pub input: usize,
    /// Output index of the target buffer.
    pub output: usize,
    /// Start index of the target output layer.
    pub internal_index: usize,
}

/// Represents a single activation function operation instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationInstructionInfo {
    /// Input index of the target buffer. Same as the output because it operates in place.
    pub input: usize,
    /// Activation function (should not be null).
    pub activation: Activation,
}

/// Instruction model information required to build the computation graph.
/// At least one of [features, feature_size] must be defined. When both are provided, their size must match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionModelInfo {
    /// List of input features, e.g. `["pixels[784]"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    /// Size of the feature vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_size: Option<usize>,
    /// List of the computation buffer sizes.
    #[serde(rename = "buffer_sizes")]
    pub computation_buffer_sizes: Vec<usize>,
    /// List of instructions to compute the model output.
    pub instructions: Vec<InstructionInfo>,
    /// Weights as a list of matrices (each with shape: [output_size, input_size]).
    pub weights: Vec<Vec<Vec<f32>>>,
    /// Biases as a list of vectors (each with shape: [output_size]).
    pub bias: Vec<Vec<f32>>,
    /// Data used to validate the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_data: Option<ValidationData>,
}

impl InstructionModelInfo {
    /// Parses a model from its JSON text.
    pub fn from_json_str(json: &str) -> InstructionModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the model to JSON text.
    pub fn to_json_string(&self) -> InstructionModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
