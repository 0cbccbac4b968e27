//! Result types shared by the pipelines and the server

use crate::config::OutputFormat;
use crate::services::OutputFormatHandler;

/// Encoded pipeline output ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

impl ProcessedImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self { bytes, format }
    }

    /// `Content-Type` header value for the bytes
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        OutputFormatHandler::content_type(self.format)
    }
}

/// Per-pixel foreground opacity predicted by the segmentation model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Row-major alpha values, `width * height` long
    pub data: Vec<u8>,
    /// `(width, height)`
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Share of pixels with any opacity, in `0..=1`
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&alpha| alpha > 0).count() as f32 / self.data.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_follows_format() {
        let png = ProcessedImage::new(vec![1, 2, 3], OutputFormat::Png);
        assert_eq!(png.content_type(), "image/png");
        let jpeg = ProcessedImage::new(Vec::new(), OutputFormat::Jpeg);
        assert_eq!(jpeg.content_type(), "image/jpeg");
    }

    #[test]
    fn test_mask_foreground_ratio() {
        let mask = SegmentationMask::new(vec![0, 255, 128, 0], (2, 2));
        assert!((mask.foreground_ratio() - 0.5).abs() < f32::EPSILON);
        assert_eq!(SegmentationMask::new(Vec::new(), (0, 0)).foreground_ratio(), 0.0);
    }
}
