//! Deterministic stand-in segmentation backend
//!
//! Produces a soft circular foreground in the middle of the model input. Used
//! by tests and by the server when started without a model file.

use crate::{
    config::InferenceConfig,
    error::{EditError, Result},
    inference::InferenceBackend,
    models::{ModelInfo, PreprocessingConfig},
};
use ndarray::Array4;
use std::time::Duration;

const MOCK_SIZE: usize = 320;

/// Backend that predicts a centered soft disc instead of running a model
#[derive(Debug, Clone)]
pub struct MockBackend {
    initialized: bool,
    model_info: ModelInfo,
    preprocessing_config: PreprocessingConfig,
    should_fail_init: bool,
    should_fail_inference: bool,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            model_info: ModelInfo {
                name: "mock-soft-disc".to_string(),
                precision: "fp32".to_string(),
                size_bytes: 0,
                input_shape: (1, 3, MOCK_SIZE, MOCK_SIZE),
                output_shape: (1, 1, MOCK_SIZE, MOCK_SIZE),
            },
            preprocessing_config: PreprocessingConfig {
                target_size: [MOCK_SIZE as u32, MOCK_SIZE as u32],
                normalization_mean: [0.5, 0.5, 0.5],
                normalization_std: [1.0, 1.0, 1.0],
            },
            should_fail_init: false,
            should_fail_inference: false,
        }
    }

    /// A backend whose `initialize` always fails
    #[must_use]
    pub fn new_failing_init() -> Self {
        Self {
            should_fail_init: true,
            ..Self::new()
        }
    }

    /// A backend whose `infer` always fails
    #[must_use]
    pub fn new_failing_inference() -> Self {
        Self {
            should_fail_inference: true,
            ..Self::new()
        }
    }

    fn soft_disc(&self, batch_size: usize) -> Array4<f32> {
        let (_, _, height, width) = self.model_info.output_shape;
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(10.0);

        Array4::from_shape_fn((batch_size, 1, height, width), |(_, _, y, x)| {
            let dx = x as f32 - center_x;
            let dy = y as f32 - center_y;
            let distance = (dx * dx + dy * dy).sqrt();
            // Opaque core, linear falloff over the outer half of the radius
            ((radius - distance) / (radius / 2.0)).clamp(0.0, 1.0)
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _config: &InferenceConfig) -> Result<Option<Duration>> {
        if self.should_fail_init {
            return Err(EditError::model("Mock backend initialization failed"));
        }
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::ZERO))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(EditError::internal("Backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(EditError::inference("Mock backend inference failed"));
        }
        let (batch, channels, _, _) = input.dim();
        if channels != 3 {
            return Err(EditError::inference(format!(
                "Expected 3 input channels, got {channels}"
            )));
        }
        Ok(self.soft_disc(batch))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.model_info.input_shape
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.model_info.output_shape
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.preprocessing_config.clone())
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(self.model_info.clone())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_requires_initialize() {
        let mut backend = MockBackend::new();
        let input = Array4::<f32>::zeros((1, 3, MOCK_SIZE, MOCK_SIZE));
        assert!(backend.infer(&input).is_err());
    }

    #[test]
    fn test_soft_disc_shape_and_values() -> Result<()> {
        let mut backend = MockBackend::new();
        assert_eq!(backend.initialize(&InferenceConfig::default())?, Some(Duration::ZERO));
        assert_eq!(backend.initialize(&InferenceConfig::default())?, None);

        let input = Array4::<f32>::zeros((1, 3, MOCK_SIZE, MOCK_SIZE));
        let output = backend.infer(&input)?;
        assert_eq!(output.dim(), (1, 1, MOCK_SIZE, MOCK_SIZE));

        let mid = MOCK_SIZE / 2;
        assert!((output[[0, 0, mid, mid]] - 1.0).abs() < f32::EPSILON);
        assert!(output[[0, 0, 0, 0]].abs() < f32::EPSILON);
        assert!(output.iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn test_failing_variants() {
        let mut backend = MockBackend::new_failing_init();
        assert!(matches!(
            backend.initialize(&InferenceConfig::default()),
            Err(EditError::Model(_))
        ));

        let mut backend = MockBackend::new_failing_inference();
        backend.initialize(&InferenceConfig::default()).unwrap();
        let input = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(matches!(backend.infer(&input), Err(EditError::Inference(_))));
    }
}
