//! Foreground segmentation processor
//!
//! Wraps an [`InferenceBackend`] and turns an image into a foreground mask and
//! an RGBA cutout. One processor is shared by every request; inference takes
//! the backend lock because backends need `&mut self`.

use crate::{
    backends::MockBackend,
    config::InferenceConfig,
    error::{EditError, Result},
    inference::InferenceBackend,
    types::SegmentationMask,
    utils::{ImagePreprocessor, Letterbox},
};
use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::Array4;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Shared handle to a segmentation backend
pub struct ForegroundProcessor {
    backend: Mutex<Box<dyn InferenceBackend>>,
    model_name: String,
}

impl std::fmt::Debug for ForegroundProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundProcessor")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl ForegroundProcessor {
    /// Initialize `backend` and wrap it
    ///
    /// # Errors
    /// - Backend initialization or model metadata failures
    pub fn new(mut backend: Box<dyn InferenceBackend>, config: &InferenceConfig) -> Result<Self> {
        if let Some(load_time) = backend.initialize(config)? {
            debug!(load_ms = load_time.as_millis() as u64, "segmentation backend initialized");
        }
        let model_name = backend.get_model_info()?.name;
        info!(model = %model_name, "background removal ready");
        Ok(Self {
            backend: Mutex::new(backend),
            model_name,
        })
    }

    /// Processor backed by the deterministic mock model
    ///
    /// # Errors
    /// - Never in practice; the mock always initializes
    pub fn mock() -> Result<Self> {
        Self::new(Box::new(MockBackend::new()), &InferenceConfig::default())
    }

    /// Processor backed by an ONNX model file or directory
    ///
    /// # Errors
    /// - Model discovery, loading, or session creation failures
    #[cfg(feature = "onnx")]
    pub fn from_model_path<P: AsRef<Path>>(path: P, config: &InferenceConfig) -> Result<Self> {
        let manager = crate::models::ModelManager::from_path(path, config.execution_provider)?;
        Self::new(
            Box::new(crate::backends::OnnxBackend::with_model_manager(manager)),
            config,
        )
    }

    /// Processor backed by an ONNX model file or directory
    ///
    /// # Errors
    /// - Always; this build has no ONNX Runtime support
    #[cfg(not(feature = "onnx"))]
    pub fn from_model_path<P: AsRef<Path>>(path: P, _config: &InferenceConfig) -> Result<Self> {
        Err(EditError::model_error_with_context(
            "load",
            path,
            "built without the `onnx` feature",
        ))
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Predict the foreground opacity of every pixel of `image`
    ///
    /// # Errors
    /// - Zero-sized image
    /// - Inference failures or an unexpected output shape
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn segment(&self, image: &DynamicImage) -> Result<SegmentationMask> {
        let start = Instant::now();
        let mut backend = self
            .backend
            .lock()
            .map_err(|_| EditError::internal("Segmentation backend lock poisoned"))?;

        let preprocessing_config = backend.get_preprocessing_config()?;
        let (input, letterbox) =
            ImagePreprocessor::preprocess_for_inference(image, &preprocessing_config)?;
        let output = backend.infer(&input)?;
        drop(backend);

        let [canvas_height, canvas_width] = preprocessing_config.target_size;
        let mask = tensor_to_mask(
            &output,
            &letterbox,
            (canvas_width, canvas_height),
            (image.width(), image.height()),
        )?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            foreground = mask.foreground_ratio(),
            "segmentation complete"
        );
        Ok(mask)
    }

    /// Segment `image` and return it with the mask as its alpha channel
    ///
    /// # Errors
    /// - See [`Self::segment`]
    pub fn cutout(&self, image: &DynamicImage) -> Result<(RgbaImage, SegmentationMask)> {
        let mask = self.segment(image)?;
        let cutout = apply_mask(image, &mask);
        Ok((cutout, mask))
    }
}

/// Map a `1x1xHxW` probability tensor back onto the source image
fn tensor_to_mask(
    tensor: &Array4<f32>,
    letterbox: &Letterbox,
    canvas: (u32, u32),
    source: (u32, u32),
) -> Result<SegmentationMask> {
    let (batch, channels, tensor_height, tensor_width) = tensor.dim();
    if batch != 1 || channels != 1 || tensor_height == 0 || tensor_width == 0 {
        return Err(EditError::processing(format!(
            "Invalid output tensor shape: {:?}",
            tensor.shape()
        )));
    }

    // Outputs may be a different resolution than the input canvas
    let scale_x = tensor_width as f32 / canvas.0 as f32;
    let scale_y = tensor_height as f32 / canvas.1 as f32;

    let (width, height) = source;
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let (canvas_x, canvas_y) = letterbox.to_canvas(x, y);
            let tx = ((canvas_x as f32 * scale_x) as usize).min(tensor_width - 1);
            let ty = ((canvas_y as f32 * scale_y) as usize).min(tensor_height - 1);
            let value = tensor.get([0, 0, ty, tx]).copied().unwrap_or(0.0);
            data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }
    Ok(SegmentationMask::new(data, source))
}

/// Attach the mask as alpha; fully transparent pixels become transparent black
fn apply_mask(image: &DynamicImage, mask: &SegmentationMask) -> RgbaImage {
    let mut result = image.to_rgba8();
    for (pixel, &alpha) in result.pixels_mut().zip(mask.data.iter()) {
        *pixel = if alpha > 0 {
            Rgba([pixel.0[0], pixel.0[1], pixel.0[2], alpha])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }
    result
}
