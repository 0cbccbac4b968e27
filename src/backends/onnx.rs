//! ONNX Runtime backend for foreground segmentation models
//!
//! Loads a model through [`ModelManager`] and runs it with the CPU, CUDA, or
//! `CoreML` execution provider, falling back to CPU when an accelerator is
//! unavailable.

use crate::config::{ExecutionProvider, InferenceConfig};
use crate::error::{EditError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager, PreprocessingConfig};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::time::{Duration, Instant};

/// ONNX Runtime backend for segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Option<Session>,
    model_manager: ModelManager,
    initialized: bool,
}

impl OnnxBackend {
    /// List execution providers with availability status and descriptions
    ///
    /// Returns `(name, available, description)` tuples.
    #[must_use]
    pub fn list_providers() -> Vec<(String, bool, String)> {
        log::debug!(
            "Platform: {os}/{arch}, {cores} CPU cores",
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            cores = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        );

        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    /// Create a backend for the given model; nothing is loaded until [`InferenceBackend::initialize`]
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            session: None,
            model_manager,
            initialized: false,
        }
    }

    /// Load the model and build the ONNX Runtime session
    fn load_model(&mut self, config: &InferenceConfig) -> Result<Duration> {
        let model_load_start = Instant::now();
        let model_data = self.model_manager.load_model()?;

        let mut session_builder = Session::builder()
            .map_err(|e| EditError::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EditError::inference(format!("Failed to set optimization level: {e}")))?;

        session_builder = match config.execution_provider {
            ExecutionProvider::Auto => {
                // CUDA > CoreML > CPU
                let mut providers = Vec::new();

                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("🚀 CUDA execution provider is available and will be used");
                    providers.push(cuda_provider.build());
                } else {
                    log::debug!("CUDA execution provider is not available");
                }

                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("🍎 CoreML execution provider is available and will be used");
                    providers.push(coreml_provider.with_subgraphs(true).build());
                } else {
                    log::debug!("CoreML execution provider is not available");
                }

                if providers.is_empty() {
                    log::warn!("⚠️ No hardware acceleration available, falling back to CPU");
                    session_builder
                } else {
                    log::info!(
                        "✅ Hardware acceleration enabled with {count} provider(s)",
                        count = providers.len()
                    );
                    session_builder
                        .with_execution_providers(providers)
                        .map_err(|e| {
                            EditError::inference(format!(
                                "Failed to set auto execution providers: {e}"
                            ))
                        })?
                }
            },
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
                session_builder
            },
            ExecutionProvider::Cuda => {
                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("Using CUDA execution provider");
                    session_builder
                        .with_execution_providers([cuda_provider.build()])
                        .map_err(|e| {
                            EditError::inference(format!(
                                "Failed to set CUDA execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!(
                        "CUDA execution provider requested but not available, falling back to CPU"
                    );
                    session_builder
                }
            },
            ExecutionProvider::CoreMl => {
                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("🍎 Using CoreML execution provider (explicitly requested)");
                    session_builder
                        .with_execution_providers([coreml_provider.with_subgraphs(true).build()])
                        .map_err(|e| {
                            EditError::inference(format!(
                                "Failed to set CoreML execution provider: {e}"
                            ))
                        })?
                } else {
                    log::error!("🚫 CoreML execution provider requested but not available");
                    log::error!("  - Falling back to CPU (will be much slower)");
                    session_builder
                }
            },
        };

        let cores = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(8);
        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            cores
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (cores / 4).max(1)
        };

        let session = session_builder
            .with_parallel_execution(true)
            .map_err(|e| EditError::inference(format!("Failed to enable parallel execution: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| EditError::inference(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| EditError::inference(format!("Failed to set inter threads: {e}")))?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                EditError::model_error_with_context(
                    "create session for",
                    self.model_manager.get_model_path(),
                    &e.to_string(),
                )
            })?;

        let model_info = self.model_manager.get_info()?;
        log::debug!("✅ ONNX Runtime session created");
        log::debug!("  - Requested provider: {}", config.execution_provider);
        log::debug!(
            "  - Threading: {intra_threads} intra-op threads, {inter_threads} inter-op threads"
        );
        log::debug!("  - Model: {} ({})", model_info.name, model_info.precision);
        let size_mb = model_info.size_bytes as f64 / (1024.0 * 1024.0);
        log::debug!("  - Model size: {size_mb:.2} MB");

        self.session = Some(session);
        self.initialized = true;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );
        Ok(model_load_time)
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self, config: &InferenceConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.load_model(config).map(Some)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(EditError::internal("Backend not initialized"));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| EditError::internal("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone())
            .map_err(|e| EditError::inference(format!("Failed to convert input tensor: {e}")))?;

        // Positional inputs: model input names vary between exports
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| EditError::inference(format!("ONNX inference failed: {e}")))?;
        let core_inference_time = inference_start.elapsed();

        // Multi-output models (ISNet side outputs) put the fused mask first
        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| EditError::inference("No output tensors found"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| EditError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| EditError::inference(format!("Failed to extract output tensor: {e}")))?;

        let output_shape = output_tensor.shape().to_vec();
        let [n, c, h, w] = output_shape.as_slice() else {
            return Err(EditError::inference(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        };
        let result = Array4::from_shape_vec(
            (*n, *c, *h, *w),
            output_tensor.view().to_owned().into_raw_vec_and_offset().0,
        )
        .map_err(|e| EditError::inference(format!("Failed to reshape output tensor: {e}")))?;

        log::info!(
            "📊 Inference complete: {:.2}ms total ({:.2}ms in session)",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            core_inference_time.as_secs_f64() * 1000.0
        );
        Ok(result)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .get_info()
            .map_or((1, 3, 1024, 1024), |info| info.input_shape)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .get_info()
            .map_or((1, 1, 1024, 1024), |info| info.output_shape)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        self.model_manager.get_preprocessing_config()
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        self.model_manager.get_info()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
