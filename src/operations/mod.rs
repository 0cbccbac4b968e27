//! Image operation dispatcher
//!
//! [`OPERATIONS`] is the single routing table: every operation's name, HTTP
//! route, output format, and JPEG quality. [`dispatch`] decodes the upload,
//! runs the operation's pipeline, and encodes the result.

pub mod pipelines;

use crate::config::OutputFormat;
use crate::error::{EditError, Result};
use crate::params::{ManualEditParams, OperationParameters, SkyMode, SkyMood};
use crate::presets;
use crate::processor::ForegroundProcessor;
use crate::services::ImageIOService;
use crate::types::ProcessedImage;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, instrument};

/// Every operation the server exposes
///
/// Declaration order matches [`OPERATIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ManualEdit,
    /// Auto-contrast, unsharp mask, then tone boosts
    AutoEnhance,
    /// Auto-contrast then tone boosts, no sharpening
    AutoEnhanceBasic,
    RemoveBackground,
    ColorBoost,
    FaceSmooth,
    AutoRetouch,
    Hdr,
    Relight,
    Cartoonify,
    DepthFocus,
    SkyReplace,
    PortraitBoost,
    SkyMood,
    DetailEnhance,
}

/// Routing table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub operation: Operation,
    pub name: &'static str,
    pub route: &'static str,
    pub output: OutputFormat,
    /// Ignored for PNG output
    pub jpeg_quality: u8,
}

const fn jpeg(operation: Operation, name: &'static str, route: &'static str, quality: u8) -> OperationSpec {
    OperationSpec {
        operation,
        name,
        route,
        output: OutputFormat::Jpeg,
        jpeg_quality: quality,
    }
}

pub static OPERATIONS: &[OperationSpec] = &[
    jpeg(Operation::ManualEdit, "edit_image", "/edit_image", 90),
    jpeg(Operation::AutoEnhance, "auto_enhance", "/auto_enhance", 95),
    jpeg(Operation::AutoEnhanceBasic, "auto_enhance_basic", "/auto_enhance_basic", 90),
    OperationSpec {
        operation: Operation::RemoveBackground,
        name: "remove_background",
        route: "/remove_background",
        output: OutputFormat::Png,
        jpeg_quality: 95,
    },
    jpeg(Operation::ColorBoost, "ai_colorboost", "/ai_colorboost", 95),
    jpeg(Operation::FaceSmooth, "ai_facesmooth", "/ai_facesmooth", 95),
    jpeg(Operation::AutoRetouch, "ai_autoretouch", "/ai_autoretouch", 95),
    jpeg(Operation::Hdr, "ai_hdr", "/ai_hdr", 95),
    jpeg(Operation::Relight, "ai_relight", "/ai_relight", 95),
    jpeg(Operation::Cartoonify, "ai_cartoonify", "/ai_cartoonify", 95),
    jpeg(Operation::DepthFocus, "ai_depthfocus", "/ai_depthfocus", 95),
    jpeg(Operation::SkyReplace, "ai_skyreplace", "/ai_skyreplace", 95),
    jpeg(Operation::PortraitBoost, "ai_portraitboost", "/ai_portraitboost", 95),
    jpeg(Operation::SkyMood, "ai_skymood", "/ai_skymood", 95),
    jpeg(Operation::DetailEnhance, "ai_detailenhance", "/ai_detailenhance", 95),
];

impl Operation {
    /// This operation's routing table entry
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn spec(self) -> &'static OperationSpec {
        &OPERATIONS[self as usize]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    #[must_use]
    pub fn from_route(route: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|spec| spec.route == route)
            .map(|spec| spec.operation)
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.operation)
    }

    /// Whether the operation needs the segmentation model
    #[must_use]
    pub fn requires_segmentation(self) -> bool {
        matches!(self, Self::RemoveBackground | Self::SkyReplace)
    }
}

/// Shared state every dispatch reads
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Segmentation model; `None` disables background removal and sky replacement
    pub foreground: Option<Arc<ForegroundProcessor>>,
    /// Replaces the per-operation JPEG quality when set
    pub jpeg_quality_override: Option<u8>,
}

impl DispatchContext {
    fn foreground(&self, operation: Operation) -> Result<&ForegroundProcessor> {
        self.foreground.as_deref().ok_or_else(|| {
            EditError::model(format!(
                "Background removal model is not configured; '{}' is unavailable",
                operation.name()
            ))
        })
    }
}

/// Decode `bytes`, run `operation`, and encode the result
///
/// # Errors
/// - `MissingInput` / `Decode` for empty or undecodable uploads
/// - `InvalidParameter` for unparsable manual edit parameters
/// - `Model` when a segmentation operation runs without a model
/// - `Processing` / `Inference` for pipeline failures
#[instrument(skip(bytes, params, context), fields(operation = operation.name(), bytes = bytes.len()))]
pub fn dispatch(
    operation: Operation,
    bytes: &[u8],
    params: &OperationParameters,
    context: &DispatchContext,
) -> Result<ProcessedImage> {
    let start = Instant::now();
    let spec = operation.spec();

    // Parameters are validated before any decoding work
    let manual = match operation {
        Operation::ManualEdit => Some(ManualEditParams::from_params(params)?),
        _ => None,
    };

    let image = {
        let _span = info_span!("decode").entered();
        ImageIOService::load_from_bytes(bytes)?
    };
    debug!(width = image.width(), height = image.height(), "decoded upload");

    let rendered = {
        let _span = info_span!("pipeline").entered();
        run_pipeline(operation, &image, manual, params, context)?
    };

    let quality = context.jpeg_quality_override.unwrap_or(spec.jpeg_quality);
    let bytes = {
        let _span = info_span!("encode").entered();
        ImageIOService::encode(&rendered, spec.output, quality)?
    };
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        output_bytes = bytes.len(),
        "operation complete"
    );
    Ok(ProcessedImage::new(bytes, spec.output))
}

fn run_pipeline(
    operation: Operation,
    image: &DynamicImage,
    manual: Option<ManualEditParams>,
    params: &OperationParameters,
    context: &DispatchContext,
) -> Result<DynamicImage> {
    use pipelines as p;

    if operation.requires_segmentation() {
        let foreground = context.foreground(operation)?;
        if operation == Operation::RemoveBackground {
            let cutout =
                p::remove_background(image, foreground, &presets::BackgroundRemoval::default())?;
            return Ok(DynamicImage::ImageRgba8(cutout));
        }
        let composed = p::sky_replace(
            image,
            SkyMode::from_params(params),
            foreground,
            &presets::SkyReplace::default(),
            &mut rand::thread_rng(),
        )?;
        return Ok(DynamicImage::ImageRgb8(composed));
    }

    let rgb = image.to_rgb8();
    let out = match operation {
        Operation::ManualEdit => p::manual_edit(&rgb, &manual.unwrap_or_default()),
        Operation::AutoEnhance => p::auto_enhance(&rgb, &presets::AutoEnhanceExtended::default()),
        Operation::AutoEnhanceBasic => {
            p::auto_enhance_basic(&rgb, &presets::AutoEnhanceBasic::default())
        },
        Operation::ColorBoost => p::color_boost(&rgb, &presets::ColorBoost::default())?,
        Operation::FaceSmooth => p::face_smooth(&rgb, &presets::FaceSmooth::default())?,
        Operation::AutoRetouch => p::auto_retouch(&rgb, &presets::AutoRetouch::default())?,
        Operation::Hdr => p::hdr(&rgb, &presets::Hdr::default()),
        Operation::Relight => p::relight(&rgb, &presets::Relight::default())?,
        Operation::Cartoonify => p::cartoonify(&rgb, &presets::Cartoonify::default())?,
        Operation::DepthFocus => p::depth_focus(&rgb, &presets::DepthFocus::default()),
        Operation::PortraitBoost => p::portrait_boost(&rgb, &presets::PortraitBoost::default())?,
        Operation::SkyMood => p::sky_mood(
            &rgb,
            SkyMood::from_params(params),
            &presets::SkyMoodTint::default(),
        )?,
        Operation::DetailEnhance => p::detail_enhance(&rgb, &presets::DetailEnhance::default())?,
        Operation::RemoveBackground | Operation::SkyReplace => {
            return Err(EditError::internal("segmentation operation reached RGB dispatch"));
        },
    };
    Ok(DynamicImage::ImageRgb8(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg_upload(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        ImageIOService::encode_jpeg(&image, 95).unwrap()
    }

    #[test]
    fn test_routing_table_is_consistent() {
        assert_eq!(OPERATIONS.len(), 15);
        for (index, spec) in OPERATIONS.iter().enumerate() {
            assert_eq!(spec.operation as usize, index);
            assert_eq!(Operation::from_route(spec.route), Some(spec.operation));
            assert_eq!(Operation::from_name(spec.name), Some(spec.operation));
            assert_eq!(spec.operation.spec(), spec);
            assert!((1..=100).contains(&spec.jpeg_quality));
        }
        assert_eq!(Operation::from_route("/nope"), None);
    }

    #[test]
    fn test_only_background_removal_is_png() {
        for spec in OPERATIONS {
            let expected = if spec.operation == Operation::RemoveBackground {
                OutputFormat::Png
            } else {
                OutputFormat::Jpeg
            };
            assert_eq!(spec.output, expected, "{}", spec.name);
        }
    }

    #[test]
    fn test_segmentation_operations_need_model() {
        for spec in OPERATIONS {
            let needs_model = spec.operation.requires_segmentation();
            assert_eq!(
                needs_model,
                matches!(spec.operation, Operation::RemoveBackground | Operation::SkyReplace)
            );
            let result = dispatch(
                spec.operation,
                &jpeg_upload(8, 8),
                &OperationParameters::new(),
                &DispatchContext::default(),
            );
            assert_eq!(
                matches!(result, Err(EditError::Model(_))),
                needs_model,
                "{}",
                spec.name
            );
        }
    }

    #[test]
    fn test_dispatch_manual_edit_rotates() -> Result<()> {
        let params = OperationParameters::new().with("rotate", "90");
        let out = dispatch(
            Operation::ManualEdit,
            &jpeg_upload(16, 8),
            &params,
            &DispatchContext::default(),
        )?;
        assert_eq!(out.content_type(), "image/jpeg");
        let decoded = ImageIOService::load_from_bytes(&out.bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (8, 16));
        Ok(())
    }

    #[test]
    fn test_invalid_parameter_rejected_before_decode() {
        let params = OperationParameters::new().with("brightness", "bright");
        let err = dispatch(
            Operation::ManualEdit,
            b"not an image",
            &params,
            &DispatchContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidParameter { .. }));
    }

    #[test]
    fn test_segmentation_without_model_is_model_error() {
        let err = dispatch(
            Operation::RemoveBackground,
            &jpeg_upload(8, 8),
            &OperationParameters::new(),
            &DispatchContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EditError::Model(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_remove_background_returns_png_with_alpha() -> Result<()> {
        let context = DispatchContext {
            foreground: Some(Arc::new(ForegroundProcessor::mock()?)),
            jpeg_quality_override: None,
        };
        let out = dispatch(
            Operation::RemoveBackground,
            &jpeg_upload(32, 24),
            &OperationParameters::new(),
            &context,
        )?;
        assert_eq!(out.content_type(), "image/png");
        let decoded = ImageIOService::load_from_bytes(&out.bytes)?;
        assert!(decoded.color().has_alpha());
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
        Ok(())
    }

    #[test]
    fn test_quality_override_changes_output() -> Result<()> {
        let upload = jpeg_upload(64, 64);
        let params = OperationParameters::new();
        let default = dispatch(Operation::SkyMood, &upload, &params, &DispatchContext::default())?;
        let low = dispatch(
            Operation::SkyMood,
            &upload,
            &params,
            &DispatchContext {
                foreground: None,
                jpeg_quality_override: Some(10),
            },
        )?;
        assert!(low.bytes.len() < default.bytes.len());
        Ok(())
    }
}
