//! Fixed pipeline constants, one record per operation
//!
//! The `Default` impls hold the production values. Pipelines take these records
//! by reference so the numbers can be tuned or tested without touching the
//! control flow in [`crate::operations`].

use serde::{Deserialize, Serialize};

/// `saturate(|px * scale + offset|)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearGain {
    pub scale: f32,
    pub offset: f32,
}

impl LinearGain {
    #[must_use]
    pub const fn new(scale: f32, offset: f32) -> Self {
        Self { scale, offset }
    }
}

/// `saturate(a * first + b * second + gamma)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedBlend {
    pub first: f32,
    pub second: f32,
    pub gamma: f32,
}

impl WeightedBlend {
    #[must_use]
    pub const fn new(first: f32, second: f32, gamma: f32) -> Self {
        Self {
            first,
            second,
            gamma,
        }
    }
}

/// Sharpening by blending an image with its own Gaussian blur
///
/// The source weight is `1 - blur_weight`, so a negative `blur_weight` sharpens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnsharpBlend {
    pub sigma: f32,
    pub blur_weight: f32,
}

impl UnsharpBlend {
    #[must_use]
    pub const fn new(sigma: f32, blur_weight: f32) -> Self {
        Self { sigma, blur_weight }
    }

    #[must_use]
    pub fn source_weight(&self) -> f32 {
        1.0 - self.blur_weight
    }
}

/// Threshold-gated unsharp mask in the PIL style
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnsharpMask {
    pub radius: f32,
    pub percent: f32,
    pub threshold: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralParams {
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl BilateralParams {
    #[must_use]
    pub const fn new(diameter: u32, sigma_color: f32, sigma_space: f32) -> Self {
        Self {
            diameter,
            sigma_color,
            sigma_space,
        }
    }
}

/// Contrast-limited adaptive histogram equalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaheParams {
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl ClaheParams {
    #[must_use]
    pub const fn new(clip_limit: f32) -> Self {
        Self {
            clip_limit,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

/// Gaussian blur with an explicit odd kernel size (0 derives it from sigma)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianKernel {
    pub size: u32,
    pub sigma: f32,
}

impl GaussianKernel {
    #[must_use]
    pub const fn new(size: u32, sigma: f32) -> Self {
        Self { size, sigma }
    }
}

/// Domain-transform edge-preserving filter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePreserving {
    pub sigma_s: f32,
    pub sigma_r: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoEnhanceBasic {
    /// Percent trimmed from each histogram end
    pub cutoff: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for AutoEnhanceBasic {
    fn default() -> Self {
        Self {
            cutoff: 1.0,
            brightness: 1.1,
            contrast: 1.15,
            saturation: 1.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoEnhanceExtended {
    pub cutoff: f32,
    pub unsharp: UnsharpMask,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for AutoEnhanceExtended {
    fn default() -> Self {
        Self {
            cutoff: 1.0,
            unsharp: UnsharpMask {
                radius: 2.0,
                percent: 150.0,
                threshold: 2,
            },
            brightness: 1.05,
            contrast: 1.15,
            saturation: 1.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRemoval {
    /// Softens the model's alpha edges
    pub alpha_blur: GaussianKernel,
    /// Cleans the color channels of the cutout
    pub color: BilateralParams,
}

impl Default for BackgroundRemoval {
    fn default() -> Self {
        Self {
            alpha_blur: GaussianKernel::new(3, 0.0),
            color: BilateralParams::new(5, 50.0, 50.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBoost {
    pub clahe: ClaheParams,
    pub gain: LinearGain,
    pub unsharp: UnsharpBlend,
}

impl Default for ColorBoost {
    fn default() -> Self {
        Self {
            clahe: ClaheParams::new(3.0),
            gain: LinearGain::new(1.1, 8.0),
            unsharp: UnsharpBlend::new(3.0, -0.1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSmooth {
    pub bilateral: BilateralParams,
    /// original, smoothed
    pub blend: WeightedBlend,
    pub unsharp: UnsharpBlend,
    pub gain: LinearGain,
}

impl Default for FaceSmooth {
    fn default() -> Self {
        Self {
            bilateral: BilateralParams::new(15, 75.0, 75.0),
            blend: WeightedBlend::new(0.3, 0.7, 0.0),
            unsharp: UnsharpBlend::new(2.0, -0.15),
            gain: LinearGain::new(1.05, 5.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoRetouch {
    pub clahe: ClaheParams,
    pub bilateral: BilateralParams,
    /// balanced, smoothed
    pub blend: WeightedBlend,
    pub unsharp: UnsharpBlend,
    pub gain: LinearGain,
}

impl Default for AutoRetouch {
    fn default() -> Self {
        Self {
            clahe: ClaheParams::new(3.5),
            bilateral: BilateralParams::new(10, 50.0, 50.0),
            blend: WeightedBlend::new(0.6, 0.4, 0.0),
            unsharp: UnsharpBlend::new(3.0, -0.1),
            gain: LinearGain::new(1.08, 8.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hdr {
    pub detail: EdgePreserving,
    pub gain: LinearGain,
}

impl Default for Hdr {
    fn default() -> Self {
        Self {
            detail: EdgePreserving {
                sigma_s: 12.0,
                sigma_r: 0.15,
            },
            gain: LinearGain::new(1.2, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relight {
    pub gain: LinearGain,
}

impl Default for Relight {
    fn default() -> Self {
        Self {
            gain: LinearGain::new(1.1, 15.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartoonify {
    pub median_size: u32,
    pub threshold_block: u32,
    pub threshold_offset: f32,
    pub bilateral: BilateralParams,
    pub stylize: EdgePreserving,
    pub gain: LinearGain,
}

impl Default for Cartoonify {
    fn default() -> Self {
        Self {
            median_size: 7,
            threshold_block: 9,
            threshold_offset: 9.0,
            bilateral: BilateralParams::new(9, 150.0, 150.0),
            stylize: EdgePreserving {
                sigma_s: 150.0,
                sigma_r: 0.25,
            },
            gain: LinearGain::new(1.2, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthFocus {
    pub background_blur: GaussianKernel,
    /// Focus center as fractions of width and height
    pub center: (f32, f32),
    /// Focus radius as a fraction of `min(width, height)`
    pub radius: f32,
    pub mask_blur: GaussianKernel,
}

impl Default for DepthFocus {
    fn default() -> Self {
        Self {
            background_blur: GaussianKernel::new(45, 40.0),
            center: (0.5, 1.0 / 3.0),
            radius: 1.0 / 3.0,
            mask_blur: GaussianKernel::new(99, 30.0),
        }
    }
}

/// Inclusive-exclusive channel range for random star colors
pub type ChannelRange = (u8, u16);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyReplace {
    pub day: [u8; 3],
    pub stars_background: [u8; 3],
    pub stars_count: u32,
    pub galaxy_background: [u8; 3],
    pub galaxy_count: u32,
    pub galaxy_red: ChannelRange,
    pub galaxy_green: ChannelRange,
    pub galaxy_blue: ChannelRange,
}

impl Default for SkyReplace {
    fn default() -> Self {
        Self {
            day: [100, 180, 255],
            stars_background: [10, 10, 30],
            stars_count: 300,
            galaxy_background: [20, 10, 40],
            galaxy_count: 600,
            galaxy_red: (150, 255),
            galaxy_green: (80, 200),
            galaxy_blue: (200, 255),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortraitBoost {
    pub bilateral: BilateralParams,
    /// equalized, smoothed, offset
    pub blend: WeightedBlend,
    pub gain: LinearGain,
}

impl Default for PortraitBoost {
    fn default() -> Self {
        Self {
            bilateral: BilateralParams::new(9, 75.0, 75.0),
            blend: WeightedBlend::new(0.6, 0.4, 5.0),
            gain: LinearGain::new(1.1, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyMoodTint {
    /// original, overlay
    pub blend: WeightedBlend,
    pub sunset: [u8; 3],
    pub dusk: [u8; 3],
    pub night: [u8; 3],
}

impl Default for SkyMoodTint {
    fn default() -> Self {
        Self {
            blend: WeightedBlend::new(0.8, 0.2, 0.0),
            sunset: [255, 150, 80],
            dusk: [100, 120, 255],
            night: [50, 80, 200],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailEnhance {
    pub unsharp: UnsharpBlend,
    pub gain: LinearGain,
}

impl Default for DetailEnhance {
    fn default() -> Self {
        Self {
            unsharp: UnsharpBlend::new(2.0, -0.5),
            gain: LinearGain::new(1.1, 10.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsharp_weights_sum_to_one() {
        let blends = [
            ColorBoost::default().unsharp,
            FaceSmooth::default().unsharp,
            AutoRetouch::default().unsharp,
            DetailEnhance::default().unsharp,
        ];
        for blend in blends {
            assert!((blend.source_weight() + blend.blur_weight - 1.0).abs() < 1e-6);
            assert!(blend.blur_weight < 0.0, "unsharp blends must sharpen");
        }
        assert!((DetailEnhance::default().unsharp.source_weight() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_blur_kernels_are_odd() {
        let depth = DepthFocus::default();
        assert_eq!(depth.background_blur.size % 2, 1);
        assert_eq!(depth.mask_blur.size % 2, 1);
        assert_eq!(BackgroundRemoval::default().alpha_blur.size % 2, 1);
        assert_eq!(Cartoonify::default().median_size % 2, 1);
        assert_eq!(Cartoonify::default().threshold_block % 2, 1);
    }

    #[test]
    fn test_mood_blend_is_normalized() {
        let tint = SkyMoodTint::default();
        assert!((tint.blend.first + tint.blend.second - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_presets_serialize() {
        let json = serde_json::to_string(&ColorBoost::default()).unwrap();
        let back: ColorBoost = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ColorBoost::default());
    }
}
