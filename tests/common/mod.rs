//! Shared fixtures for the integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use photoedit::{
    EditError, ForegroundProcessor, InferenceBackend, InferenceConfig, ModelInfo,
    PreprocessingConfig, Result,
};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Smooth color ramp that survives JPEG re-encoding with little loss
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Vertical black and white bands aligned to 8x8 JPEG blocks
pub fn block_stripes(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        if (x / 8) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("fixture encoding");
    bytes
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).expect("response is a decodable image")
}

pub fn mock_processor() -> Arc<ForegroundProcessor> {
    Arc::new(ForegroundProcessor::mock().expect("mock backend initializes"))
}

/// Backend predicting a hard-edged square covering the middle half of its input
#[derive(Debug)]
pub struct HardSquareBackend {
    size: usize,
    initialized: bool,
}

impl HardSquareBackend {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            initialized: false,
        }
    }
}

impl InferenceBackend for HardSquareBackend {
    fn initialize(&mut self, _config: &InferenceConfig) -> Result<Option<Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(EditError::inference("not initialized"));
        }
        let (_, _, height, width) = input.dim();
        let (low, high) = (self.size / 4, self.size * 3 / 4);
        Ok(Array4::from_shape_fn((1, 1, height, width), |(_, _, y, x)| {
            if (low..high).contains(&x) && (low..high).contains(&y) {
                1.0
            } else {
                0.0
            }
        }))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, self.size, self.size)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.size, self.size)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(PreprocessingConfig {
            target_size: [self.size as u32, self.size as u32],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        })
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(ModelInfo {
            name: "hard-square".to_string(),
            precision: "fp32".to_string(),
            size_bytes: 0,
            input_shape: self.input_shape(),
            output_shape: self.output_shape(),
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Sum of squared differences between horizontal and vertical neighbors
pub fn roughness(plane: &[u8], width: usize) -> u64 {
    let height = plane.len() / width;
    let mut total = 0u64;
    for y in 0..height {
        for x in 0..width {
            let here = i64::from(plane[y * width + x]);
            if x + 1 < width {
                let d = here - i64::from(plane[y * width + x + 1]);
                total += (d * d) as u64;
            }
            if y + 1 < height {
                let d = here - i64::from(plane[(y + 1) * width + x]);
                total += (d * d) as u64;
            }
        }
    }
    total
}
