//! Image to tensor preprocessing for segmentation models
//!
//! Images are letterboxed: resized with the aspect ratio preserved, centered
//! on a padded canvas of the model's input size, then normalized into an
//! NCHW tensor.

use crate::{
    error::{EditError, Result},
    models::PreprocessingConfig,
};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color around the resized image (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
        }
    }
}

/// Where the resized source landed on the model canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Source-to-canvas scale factor
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl Letterbox {
    /// Fit `source` inside `canvas` (both `(width, height)`)
    ///
    /// # Errors
    /// - Zero-sized source or canvas
    pub fn fit(source: (u32, u32), canvas: (u32, u32)) -> Result<Self> {
        let (width, height) = source;
        let (canvas_width, canvas_height) = canvas;
        if width == 0 || height == 0 || canvas_width == 0 || canvas_height == 0 {
            return Err(EditError::processing_stage_error(
                "preprocessing",
                &format!("cannot fit {width}x{height} into {canvas_width}x{canvas_height}"),
            ));
        }

        let scale = (canvas_width as f32 / width as f32).min(canvas_height as f32 / height as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, canvas_width);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, canvas_height);

        Ok(Self {
            scale,
            offset_x: (canvas_width - scaled_width) / 2,
            offset_y: (canvas_height - scaled_height) / 2,
            scaled_width,
            scaled_height,
        })
    }

    /// Canvas coordinate for a source pixel
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> (u32, u32) {
        let scaled_x = ((x as f32 * self.scale).round() as u32).min(self.scaled_width - 1);
        let scaled_y = ((y as f32 * self.scale).round() as u32).min(self.scaled_height - 1);
        (scaled_x + self.offset_x, scaled_y + self.offset_y)
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Letterbox and normalize `image` for inference
    ///
    /// Returns the NCHW tensor and the placement used, so outputs can be mapped
    /// back to source coordinates.
    ///
    /// # Errors
    /// - Zero-sized image or target size
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<(Array4<f32>, Letterbox)> {
        let [target_height, target_width] = preprocessing_config.target_size;
        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::fit(rgb_image.dimensions(), (target_width, target_height))?;

        let resized = imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            imageops::FilterType::Triangle,
        );
        let mut canvas =
            RgbImage::from_pixel(target_width, target_height, Rgb(options.padding_color));
        imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        Ok((Self::canvas_to_tensor(&canvas, preprocessing_config), letterbox))
    }

    /// Letterbox with white padding, the layout segmentation models are trained on
    ///
    /// # Errors
    /// - Zero-sized image or target size
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, Letterbox)> {
        Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())
    }

    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        Array4::from_shape_fn(
            (1, 3, height as usize, width as usize),
            |(_, channel, y, x)| {
                let value = f32::from(canvas.get_pixel(x as u32, y as u32).0[channel]) / 255.0;
                (value - config.normalization_mean[channel]) / config.normalization_std[channel]
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [size, size],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_letterbox_centers_wide_image() -> Result<()> {
        let letterbox = Letterbox::fit((200, 100), (64, 64))?;
        assert_eq!((letterbox.scaled_width, letterbox.scaled_height), (64, 32));
        assert_eq!((letterbox.offset_x, letterbox.offset_y), (0, 16));
        assert_eq!(letterbox.to_canvas(0, 0), (0, 16));
        assert_eq!(letterbox.to_canvas(199, 99), (63, 47));
        Ok(())
    }

    #[test]
    fn test_letterbox_rejects_empty() {
        assert!(Letterbox::fit((0, 10), (64, 64)).is_err());
    }

    #[test]
    fn test_tensor_shape_and_padding() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([0, 0, 0])));
        let (tensor, letterbox) = ImagePreprocessor::preprocess_for_inference(&image, &config(32))?;
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(letterbox.offset_y, 8);

        // White padding above, black image in the middle
        assert!((tensor[[0, 0, 0, 0]] - 0.5).abs() < 1e-6);
        assert!((tensor[[0, 2, 16, 16]] + 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_custom_padding_color() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 40, Rgb([255, 255, 255])));
        let options = PreprocessingOptions {
            padding_color: [0, 0, 0],
        };
        let (tensor, _) = ImagePreprocessor::preprocess_image(&image, &config(16), &options)?;
        assert!((tensor[[0, 1, 8, 0]] + 0.5).abs() < 1e-6);
        Ok(())
    }
}
