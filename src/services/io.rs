//! In-memory image decoding and encoding
//!
//! Requests carry the image in the multipart body and responses carry the
//! encoded result, so nothing here touches the filesystem.

use crate::{
    config::OutputFormat,
    error::{EditError, Result},
};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};

/// Service for decoding uploads and encoding results
pub struct ImageIOService;

impl ImageIOService {
    /// Decode an uploaded image, detecting its format from the bytes
    ///
    /// # Errors
    /// - `MissingInput` for an empty upload
    /// - `Decode` when the bytes are not a supported image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(EditError::missing_input("Uploaded image is empty"));
        }
        image::load_from_memory(bytes).map_err(|e| EditError::decode(e.to_string()))
    }

    /// Encode an opaque image as baseline JPEG
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
            .encode_image(image)
            .map_err(|e| EditError::processing(format!("Failed to encode JPEG: {e}")))?;
        Ok(buffer)
    }

    /// Encode an image with alpha as PNG
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| EditError::processing(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer)
    }

    /// Encode `image` in `format`; JPEG drops any alpha channel
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode(image: &DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => Self::encode_jpeg(&image.to_rgb8(), jpeg_quality),
            OutputFormat::Png => Self::encode_png(&image.to_rgba8()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn test_jpeg_round_trip_keeps_dimensions() -> Result<()> {
        let image = RgbImage::from_pixel(17, 9, Rgb([120, 60, 30]));
        let bytes = ImageIOService::encode_jpeg(&image, 90)?;
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = ImageIOService::load_from_bytes(&bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (17, 9));
        Ok(())
    }

    #[test]
    fn test_png_preserves_alpha() -> Result<()> {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 2, Rgba([10, 20, 30, 7]));
        let bytes = ImageIOService::encode_png(&image)?;

        let decoded = ImageIOService::load_from_bytes(&bytes)?.to_rgba8();
        assert_eq!(decoded, image);
        Ok(())
    }

    #[test]
    fn test_encode_jpeg_from_rgba_drops_alpha() -> Result<()> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 0])));
        let bytes = ImageIOService::encode(&image, OutputFormat::Jpeg, 95)?;
        assert!(ImageIOService::load_from_bytes(&bytes)?.color().channel_count() == 3);
        Ok(())
    }

    #[test]
    fn test_load_from_bytes_invalid() {
        let err = ImageIOService::load_from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EditError::Decode(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_load_from_bytes_empty() {
        let err = ImageIOService::load_from_bytes(&[]).unwrap_err();
        assert!(matches!(err, EditError::MissingInput(_)));
    }
}
