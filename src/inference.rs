//! Segmentation inference backend abstraction

use crate::config::InferenceConfig;
use crate::error::Result;
use crate::models::{ModelInfo, PreprocessingConfig};
use ndarray::Array4;
use std::time::Duration;

/// Trait for segmentation inference backends
///
/// Backends take a normalized `1x3xHxW` tensor and return a `1x1xHxW` foreground
/// probability map in `0..=1`.
pub trait InferenceBackend: Send {
    /// Initialize the backend with the given configuration
    ///
    /// Returns the model load time when a model was actually loaded.
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Model loading or validation errors
    fn initialize(&mut self, config: &InferenceConfig) -> Result<Option<Duration>>;

    /// Run inference on the input tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Tensor conversion errors
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Expected input shape (N, C, H, W)
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Expected output shape (N, C, H, W)
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Preprocessing this backend's model expects
    ///
    /// # Errors
    /// - Model metadata unavailable or invalid
    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Model information for this backend
    ///
    /// # Errors
    /// - Model metadata unavailable or invalid
    fn get_model_info(&self) -> Result<ModelInfo>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}
