//! Activation functions shared by both inference runtimes.
//!
//! The instruction runtime applies them through `ActivationInstruction`, the packed
//! runtime decodes them from the numeric code stored in each encoded instruction.
//! Both go through the same implementation so the runtimes agree numerically.

use serde::{Deserialize, Serialize};

/// Represents the type of activation function to be applied.
/// Note: A None value indicates that no activation function should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// Rectified Linear Unit activation function: f(x) = max(0, x).
    Relu,
    /// Sigmoid activation function: f(x) = 1 / (1 + exp(-x)).
    Sigmoid,
    /// Softmax activation function:
    ///
    /// ```text
    /// Softmax(x_i) = exp(x_i - max(x)) / sum_j exp(x_j - max(x))
    /// ```
    ///
    /// The maximum is subtracted before exponentiation to avoid overflow, the same way
    /// Keras computes the output layer of the trained classifier.
    Softmax,
    /// Hyperbolic tangent activation function: f(x) = tanh(x).
    Tanh,
}

/// Numeric activation codes used by the packed model format.
pub mod activation_codes {
    pub const NONE: u32 = 0x00;
    pub const RELU: u32 = 0x01;
    pub const SIGMOID: u32 = 0x02;
    pub const SOFTMAX: u32 = 0x03;
    pub const TANH: u32 = 0x04;
}

impl Activation {
    /// Encodes an optional activation into its packed code.
    pub fn to_code(activation: Option<Activation>) -> u32 {
        match activation {
            None => activation_codes::NONE,
            Some(Activation::Relu) => activation_codes::RELU,
            Some(Activation::Sigmoid) => activation_codes::SIGMOID,
            Some(Activation::Softmax) => activation_codes::SOFTMAX,
            Some(Activation::Tanh) => activation_codes::TANH,
        }
    }

    /// Decodes a packed code. `Ok(None)` means no activation.
    pub fn from_code(code: u32) -> Result<Option<Activation>, u32> {
        match code {
            activation_codes::NONE => Ok(None),
            activation_codes::RELU => Ok(Some(Activation::Relu)),
            activation_codes::SIGMOID => Ok(Some(Activation::Sigmoid)),
            activation_codes::SOFTMAX => Ok(Some(Activation::Softmax)),
            activation_codes::TANH => Ok(Some(Activation::Tanh)),
            other => Err(other),
        }
    }

    /// Apply the activation function to a single value.
    pub fn apply_single(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            // Only meaningful over a vector; see `apply_in_place`.
            Activation::Softmax => x.exp(),
        }
    }

    /// Apply the activation function to a slice of values in place.
    pub fn apply_in_place(self, values: &mut [f32]) {
        match self {
            Activation::Softmax => {
                let max_val = values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let mut sum = 0.0f32;

                for val in values.iter_mut() {
                    *val = (*val - max_val).exp();
                    sum += *val;
                }

                for val in values.iter_mut() {
                    *val /= sum;
                }
            }
            _ => {
                for val in values.iter_mut() {
                    *val = self.apply_single(*val);
                }
            }
        }
    }
}
