//! Tests for error variants raised while building models and running benchmarks.

use digitbench::errors::{
    BackendError, BenchmarkError, InstructionModelError, PackedModelError, SampleError,
};
use digitbench::instruction_model::InstructionModel;
use digitbench::instruction_model_info::{
    CopyInstructionInfo, DotInstructionInfo, InstructionInfo, InstructionModelInfo,
};

mod instruction_model_error_tests {
    use super::*;

    fn copy_model(buffer_sizes: Vec<usize>) -> InstructionModelInfo {
        InstructionModelInfo {
            features: None,
            feature_size: Some(buffer_sizes[0]),
            computation_buffer_sizes: buffer_sizes,
            instructions: vec![InstructionInfo::Copy(CopyInstructionInfo {
                input: 0,
                output: 1,
                internal_index: 0,
            })],
            weights: vec![],
            bias: vec![],
            validation_data: None,
        }
    }

    #[test]
    fn test_computation_buffer_size_exceeds_limit() {
        let result = InstructionModel::new(copy_model(vec![1, 2_000_000]));
        assert!(matches!(
            result,
            Err(InstructionModelError::ComputationBufferSizeExceedsLimit { .. })
        ));
    }

    #[test]
    fn test_unused_weights() {
        let mut info = copy_model(vec![2, 2]);
        info.weights = vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]]];
        info.bias = vec![vec![1.0, 2.0]];

        let result = InstructionModel::new(info);
        assert!(matches!(
            result,
            Err(InstructionModelError::UnusedWeights { index: 0 })
        ));
    }

    #[test]
    fn test_copy_past_the_output_buffer() {
        let mut info = copy_model(vec![2, 2]);
        info.instructions = vec![InstructionInfo::Copy(CopyInstructionInfo {
            input: 0,
            output: 1,
            internal_index: 1,
        })];

        let result = InstructionModel::new(info);
        assert!(matches!(
            result,
            Err(InstructionModelError::InternalIndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_weights_shape_mismatch() {
        let mut info = copy_model(vec![2, 1]);
        info.instructions = vec![InstructionInfo::Dot(DotInstructionInfo {
            input: 0,
            output: 1,
            weights: 0,
            activation: None,
        })];
        info.weights = vec![vec![vec![1.0, 2.0, 3.0]]];
        info.bias = vec![vec![0.0]];

        let result = InstructionModel::new(info);
        assert!(matches!(
            result,
            Err(InstructionModelError::WeightsColumnSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_same_input_output_indexes() {
        let mut info = copy_model(vec![2, 2]);
        info.instructions = vec![InstructionInfo::Copy(CopyInstructionInfo {
            input: 1,
            output: 1,
            internal_index: 0,
        })];

        let result = InstructionModel::new(info);
        assert!(matches!(
            result,
            Err(InstructionModelError::SameInputOutputIndexes { .. })
        ));
    }

    #[test]
    fn test_output_buffer_index_out_of_bounds() {
        let mut info = copy_model(vec![2, 2]);
        info.instructions = vec![InstructionInfo::Copy(CopyInstructionInfo {
            input: 0,
            output: 4,
            internal_index: 0,
        })];

        let result = InstructionModel::new(info);
        assert!(matches!(
            result,
            Err(InstructionModelError::BufferIndexOutOfBounds { index: 4, .. })
        ));
    }

    #[test]
    fn test_predict_with_wrong_input_size() {
        let model = InstructionModel::new(copy_model(vec![2, 2])).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(InstructionModelError::ValidationInputSizeMismatch {
                provided: 1,
                expected: 2
            })
        ));
    }
}

mod error_display_tests {
    use super::*;

    #[test]
    fn test_basic_error_displays() {
        assert_eq!(
            InstructionModelError::MissingFeatures.to_string(),
            "Features or feature size must be provided"
        );
        assert_eq!(
            InstructionModelError::NoInstructionsProvided.to_string(),
            "At least one instruction is required"
        );
        assert_eq!(
            BenchmarkError::AlreadyRunning.to_string(),
            "A benchmark run is already in progress"
        );
        assert_eq!(
            BenchmarkError::InvalidSampleCount { value: 0 }.to_string(),
            "Invalid sample count: 0. Must be greater than 0"
        );
    }

    #[test]
    fn test_collaborator_error_displays() {
        assert_eq!(
            SampleError::NotFound { index: 7 }.to_string(),
            "No sample exists at index 7"
        );
        assert_eq!(
            BackendError::model_load("Packed", "model.bin", "bad magic").to_string(),
            "Backend 'Packed' failed to load model 'model.bin': bad magic"
        );
        assert_eq!(
            PackedModelError::UnknownOpcode {
                opcode: 0x7f,
                instruction_index: 2
            }
            .to_string(),
            "Unknown opcode 0x7f in instruction 2"
        );
    }

    #[test]
    fn test_benchmark_error_wraps_collaborators() {
        let error: BenchmarkError = SampleError::Malformed {
            index: 3,
            reason: "invalid JSON".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Sample 3 is malformed: invalid JSON");
        assert!(matches!(
            error,
            BenchmarkError::Sample(SampleError::Malformed { index: 3, .. })
        ));

        let error: BenchmarkError = BackendError::inference("Instruction", "shape").into();
        assert!(matches!(error, BenchmarkError::Backend(_)));
    }
}
