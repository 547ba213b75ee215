//! Tests for the instruction runtime and its JSON artifact.

mod common;

use digitbench::instruction_model_info::{
    ActivationInstructionInfo, CopyInstructionInfo, DotInstructionInfo, InstructionInfo,
};
use digitbench::samples::PIXEL_COUNT;
use digitbench::{Activation, InstructionModel, InstructionModelInfo, ValidationData, argmax};

const DELTA: f32 = 0.00005;

fn model_info(
    features: &[&str],
    computation_buffer_sizes: Vec<usize>,
    instructions: Vec<InstructionInfo>,
    weights: Vec<Vec<Vec<f32>>>,
    bias: Vec<Vec<f32>>,
) -> InstructionModelInfo {
    InstructionModelInfo {
        features: Some(features.iter().map(|f| f.to_string()).collect()),
        feature_size: None,
        computation_buffer_sizes,
        instructions,
        weights,
        bias,
        validation_data: None,
    }
}

/// Two inputs, two hidden ReLU nodes and one sigmoid output.
fn weights_for_complex_neural_network() -> (Vec<Vec<Vec<f32>>>, Vec<Vec<f32>>) {
    let weights_layer0 = vec![vec![2.0, 0.5], vec![-2.0, -0.5]];
    let bias_layer0 = vec![0.25, -0.25];
    let weights_layer1 = vec![vec![0.5, -1.0]];
    let bias_layer1 = vec![2.0];
    (
        vec![weights_layer0, weights_layer1],
        vec![bias_layer0, bias_layer1],
    )
}

#[test]
fn one_forward_pass() {
    let model = InstructionModel::new(model_info(
        &["feature1", "feature2"],
        vec![2, 1],
        vec![InstructionInfo::Dot(DotInstructionInfo {
            input: 0,
            output: 1,
            weights: 0,
            activation: None,
        })],
        vec![vec![vec![2.0, 0.5]]],
        vec![vec![0.25]],
    ))
    .expect("Model creation should succeed");

    // 1 * 2 - 1 * 0.5 + 0.25 = 1.75
    let result = model.predict(&[1.0, -1.0]).expect("Prediction should succeed");
    assert!((result[0] - 1.75).abs() < DELTA);

    // -1 * 2 + 1 * 0.5 + 0.25 = -1.25
    let result = model.predict(&[-1.0, 1.0]).expect("Prediction should succeed");
    assert!((result[0] - (-1.25)).abs() < DELTA);
}

#[test]
fn activation_layers() {
    let cases = [
        (Activation::Relu, [1.0, -1.0, 0.5], [1.0, 0.0, 0.5]),
        (Activation::Sigmoid, [1.0, 0.0, -0.5], [0.7311, 0.5, 0.3775]),
        (
            Activation::Softmax,
            [1.0, 2.0, 3.0],
            [0.09003057, 0.24472847, 0.66524096],
        ),
    ];

    for (activation, inputs, expected) in cases {
        let model = InstructionModel::new(model_info(
            &["f1", "f2", "f3"],
            vec![3],
            vec![InstructionInfo::Activation(ActivationInstructionInfo {
                input: 0,
                activation,
            })],
            vec![],
            vec![],
        ))
        .expect("Model creation should succeed");

        let outputs = model.predict(&inputs).expect("Prediction should succeed");
        for (output, expected) in outputs.iter().zip(expected) {
            assert!((output - expected).abs() < DELTA, "{:?}", activation);
        }
    }
}

#[test]
fn copy_layers() {
    let instructions = vec![
        InstructionInfo::Copy(CopyInstructionInfo {
            input: 0,
            output: 1,
            internal_index: 0,
        }),
        InstructionInfo::Copy(CopyInstructionInfo {
            input: 0,
            output: 2,
            internal_index: 0,
        }),
        InstructionInfo::Activation(ActivationInstructionInfo {
            input: 0,
            activation: Activation::Sigmoid,
        }),
        InstructionInfo::Activation(ActivationInstructionInfo {
            input: 1,
            activation: Activation::Relu,
        }),
        InstructionInfo::Copy(CopyInstructionInfo {
            input: 0,
            output: 2,
            internal_index: 4,
        }),
        InstructionInfo::Copy(CopyInstructionInfo {
            input: 1,
            output: 2,
            internal_index: 2,
        }),
        InstructionInfo::Copy(CopyInstructionInfo {
            input: 2,
            output: 3,
            internal_index: 0,
        }),
    ];

    let model = InstructionModel::new(model_info(
        &["feature1", "feature2"],
        vec![2, 2, 6, 6],
        instructions,
        vec![],
        vec![],
    ))
    .expect("Model creation should succeed");
    let result = model.predict(&[1.0, -1.0]).expect("Prediction should succeed");

    // [original inputs, relu results, sigmoid results]
    assert!((result[0] - 1.0).abs() < DELTA);
    assert!((result[1] - (-1.0)).abs() < DELTA);
    assert!((result[2] - 1.0).abs() < DELTA);
    assert!((result[3] - 0.0).abs() < DELTA);
    assert!((result[4] - 0.7311).abs() < DELTA);
    assert!((result[5] - 0.2689).abs() < DELTA);
}

#[test]
fn complex_neural_network() {
    let (weights, bias) = weights_for_complex_neural_network();
    let instructions = vec![
        InstructionInfo::Dot(DotInstructionInfo {
            input: 0,
            output: 1,
            weights: 0,
            activation: Some(Activation::Relu),
        }),
        InstructionInfo::Dot(DotInstructionInfo {
            input: 1,
            output: 2,
            weights: 1,
            activation: Some(Activation::Sigmoid),
        }),
    ];

    let model = InstructionModel::new(model_info(
        &["feature1", "feature2"],
        vec![2, 2, 1],
        instructions,
        weights,
        bias,
    ))
    .expect("Model creation should succeed");
    let result = model.predict(&[1.0, -1.0]).expect("Prediction should succeed");

    // sigmoid(relu(1.75) * 0.5 + relu(-1.75) * (-1) + 2) = sigmoid(2.875)
    assert!((result[0] - 0.9466).abs() < DELTA);
}

#[test]
fn embedded_validation_data() {
    let mut info = model_info(
        &["feature1", "feature2"],
        vec![2, 1],
        vec![InstructionInfo::Dot(DotInstructionInfo {
            input: 0,
            output: 1,
            weights: 0,
            activation: None,
        })],
        vec![vec![vec![2.0, 0.5]]],
        vec![vec![0.25]],
    );
    info.validation_data = Some(ValidationData {
        inputs: vec![vec![1.0, -1.0], vec![-1.0, 1.0]],
        expected_outputs: vec![vec![1.75], vec![-1.25]],
    });
    assert!(InstructionModel::new(info.clone()).is_ok());

    info.validation_data = Some(ValidationData {
        inputs: vec![vec![1.0, -1.0]],
        expected_outputs: vec![vec![1.5]],
    });
    assert!(InstructionModel::new(info).is_err());
}

#[test]
fn digit_classifier_from_json() {
    let json = common::digit_model_info().to_json_string().unwrap();
    assert!(json.contains("\"type\":\"DOT\""));
    assert!(json.contains("\"buffer_sizes\""));

    let model = InstructionModel::from_json_str(&json).expect("Model creation should succeed");
    assert_eq!(model.get_feature_size(), PIXEL_COUNT);
    assert_eq!(model.get_output_size(), 10);

    let sample = common::digit_sample(0, 6);
    let scores = model.predict(sample.pixels()).unwrap();
    assert!((scores.iter().sum::<f32>() - 1.0).abs() < DELTA);
    assert_eq!(argmax(&scores), Some(6));
}

#[test]
fn predict_with_external_buffer() {
    let model = InstructionModel::from_json_str(
        &common::digit_model_info().to_json_string().unwrap(),
    )
    .unwrap();

    let mut buffer = vec![0.0f32; model.required_memory()];
    buffer[..PIXEL_COUNT].copy_from_slice(common::digit_sample(0, 2).pixels());
    model.predict_with_buffer(&mut buffer).unwrap();

    let start = model.get_output_index_start();
    assert_eq!(argmax(&buffer[start..start + 10]), Some(2));
    assert!(model.predict_with_buffer(&mut buffer[..10]).is_err());
}
