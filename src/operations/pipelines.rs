//! One pipeline per operation
//!
//! Each function chains imaging primitives with the constants from its preset
//! record. Pipelines are pure apart from sky replacement, which draws random
//! points and therefore takes the random source as an argument.

use crate::error::Result;
use crate::imaging::clahe::{clahe, equalize_hist};
use crate::imaging::color::{luma, ChannelPlanes, ColorSpace};
use crate::imaging::edge_preserving::{detail_enhance as detail_filter, stylization};
use crate::imaging::filters::{
    adaptive_threshold_mean, add_weighted, bilateral_filter, gaussian_blur_sized, linear_gain,
    mask_with, median_blur, unsharp_blend,
};
use crate::imaging::geometry::{mirror, rotate_expand};
use crate::imaging::sky::{composite_over, mood_tint, synthesize_sky};
use crate::imaging::{enhance, from_samples};
use crate::params::{ManualEditParams, SkyMode, SkyMood};
use crate::presets;
use crate::processor::ForegroundProcessor;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use rand::Rng;
use tracing::debug_span;

/// Rotate, mirror, then apply each enhancer whose factor differs from 1
#[must_use]
pub fn manual_edit(image: &RgbImage, edit: &ManualEditParams) -> RgbImage {
    if edit.is_identity() {
        return image.clone();
    }
    let mut out = if edit.rotate == 0.0 {
        image.clone()
    } else {
        rotate_expand(image, edit.rotate)
    };
    if edit.flip {
        out = mirror(&out);
    }
    if edit.brightness != 1.0 {
        out = enhance::brightness(&out, edit.brightness);
    }
    if edit.contrast != 1.0 {
        out = enhance::contrast(&out, edit.contrast);
    }
    if edit.saturation != 1.0 {
        out = enhance::saturation(&out, edit.saturation);
    }
    if edit.sharpness != 1.0 {
        out = enhance::sharpness(&out, edit.sharpness);
    }
    out
}

#[must_use]
pub fn auto_enhance_basic(image: &RgbImage, preset: &presets::AutoEnhanceBasic) -> RgbImage {
    let out = enhance::autocontrast(image, preset.cutoff);
    let out = enhance::brightness(&out, preset.brightness);
    let out = enhance::contrast(&out, preset.contrast);
    enhance::saturation(&out, preset.saturation)
}

#[must_use]
pub fn auto_enhance(image: &RgbImage, preset: &presets::AutoEnhanceExtended) -> RgbImage {
    let out = enhance::autocontrast(image, preset.cutoff);
    let out = enhance::unsharp_mask(&out, preset.unsharp);
    let out = enhance::brightness(&out, preset.brightness);
    let out = enhance::contrast(&out, preset.contrast);
    enhance::saturation(&out, preset.saturation)
}

/// Cut out the subject, then soften its alpha and clean its colors
///
/// # Errors
/// - Segmentation failures
pub fn remove_background(
    image: &DynamicImage,
    foreground: &ForegroundProcessor,
    preset: &presets::BackgroundRemoval,
) -> Result<RgbaImage> {
    let (cutout, _) = foreground.cutout(image)?;
    let _span = debug_span!("refine_cutout").entered();
    refine_cutout(&cutout, preset)
}

/// Blur the alpha channel and bilateral-filter the color channels separately
///
/// # Errors
/// - Never in practice; all planes share the cutout's size
pub fn refine_cutout(cutout: &RgbaImage, preset: &presets::BackgroundRemoval) -> Result<RgbaImage> {
    let (width, height) = cutout.dimensions();
    let alpha = GrayImage::from_fn(width, height, |x, y| Luma([cutout.get_pixel(x, y).0[3]]));
    let color = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, _] = cutout.get_pixel(x, y).0;
        Rgb([r, g, b])
    });

    let alpha = gaussian_blur_sized(&alpha, preset.alpha_blur);
    let color = bilateral_filter(&color, preset.color);

    let samples = color
        .pixels()
        .zip(alpha.pixels())
        .flat_map(|(c, a)| [c.0[0], c.0[1], c.0[2], a.0[0]])
        .collect();
    from_samples(width, height, samples)
}

/// Local contrast on Lab lightness, gain, then a light unsharp blend
///
/// # Errors
/// - Channel split or blend size mismatches
pub fn color_boost(image: &RgbImage, preset: &presets::ColorBoost) -> Result<RgbImage> {
    let balanced = ChannelPlanes::split(image, ColorSpace::Lab)
        .map_first(|lightness| clahe(lightness, preset.clahe))?
        .merge()?;
    let boosted = linear_gain(&balanced, preset.gain);
    unsharp_blend(&boosted, preset.unsharp)
}

/// Blend a strong bilateral smoothing back over the original
///
/// # Errors
/// - Blend size mismatches
pub fn face_smooth(image: &RgbImage, preset: &presets::FaceSmooth) -> Result<RgbImage> {
    let smooth = bilateral_filter(image, preset.bilateral);
    let softened = add_weighted(image, &smooth, preset.blend)?;
    let sharpened = unsharp_blend(&softened, preset.unsharp)?;
    Ok(linear_gain(&sharpened, preset.gain))
}

/// Lighting balance, mild smoothing, sharpening, tone fix
///
/// # Errors
/// - Channel split or blend size mismatches
pub fn auto_retouch(image: &RgbImage, preset: &presets::AutoRetouch) -> Result<RgbImage> {
    let balanced = ChannelPlanes::split(image, ColorSpace::Lab)
        .map_first(|lightness| clahe(lightness, preset.clahe))?
        .merge()?;
    let smooth = bilateral_filter(&balanced, preset.bilateral);
    let blended = add_weighted(&balanced, &smooth, preset.blend)?;
    let sharpened = unsharp_blend(&blended, preset.unsharp)?;
    Ok(linear_gain(&sharpened, preset.gain))
}

#[must_use]
pub fn hdr(image: &RgbImage, preset: &presets::Hdr) -> RgbImage {
    linear_gain(&detail_filter(image, preset.detail), preset.gain)
}

/// Equalize the HSV value channel, then lift
///
/// # Errors
/// - Channel split size mismatches
pub fn relight(image: &RgbImage, preset: &presets::Relight) -> Result<RgbImage> {
    let relit = ChannelPlanes::split(image, ColorSpace::Hsv)
        .map_last(equalize_hist)?
        .merge()?;
    Ok(linear_gain(&relit, preset.gain))
}

/// Edge mask from a median-blurred gray copy, smoothed colors kept inside it, then stylized
///
/// # Errors
/// - Mask size mismatches
pub fn cartoonify(image: &RgbImage, preset: &presets::Cartoonify) -> Result<RgbImage> {
    let gray = median_blur(&luma(image), preset.median_size);
    let edges = adaptive_threshold_mean(&gray, preset.threshold_block, preset.threshold_offset);
    let color = bilateral_filter(image, preset.bilateral);
    let cartoon = mask_with(&color, &edges)?;
    let stylized = stylization(&cartoon, preset.stylize);
    Ok(linear_gain(&stylized, preset.gain))
}

/// Keep a soft disc sharp and blur everything around it
#[must_use]
pub fn depth_focus(image: &RgbImage, preset: &presets::DepthFocus) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let blurred = gaussian_blur_sized(image, preset.background_blur);

    let center = (
        (width as f32 * preset.center.0) as i32,
        (height as f32 * preset.center.1) as i32,
    );
    let radius = (width.min(height) as f32 * preset.radius) as i32;
    let mut mask = GrayImage::new(width, height);
    draw_filled_circle_mut(&mut mask, center, radius, Luma([255]));
    let mask = gaussian_blur_sized(&mask, preset.mask_blur);

    RgbImage::from_fn(width, height, |x, y| {
        let weight = f32::from(mask.get_pixel(x, y).0[0]) / 255.0;
        let sharp = image.get_pixel(x, y).0;
        let soft = blurred.get_pixel(x, y).0;
        Rgb(std::array::from_fn(|c| {
            (f32::from(sharp[c]) * weight + f32::from(soft[c]) * (1.0 - weight)) as u8
        }))
    })
}

/// Composite the segmented subject over a synthesized sky
///
/// # Errors
/// - Segmentation failures
pub fn sky_replace<R: Rng>(
    image: &DynamicImage,
    mode: SkyMode,
    foreground: &ForegroundProcessor,
    preset: &presets::SkyReplace,
    rng: &mut R,
) -> Result<RgbImage> {
    let (cutout, _) = foreground.cutout(image)?;
    let sky = synthesize_sky(cutout.width(), cutout.height(), mode, preset, rng);
    composite_over(&sky, &cutout)
}

/// Equalize YUV luma, blend with a bilateral copy, then lift
///
/// # Errors
/// - Channel split or blend size mismatches
pub fn portrait_boost(image: &RgbImage, preset: &presets::PortraitBoost) -> Result<RgbImage> {
    let enhanced = ChannelPlanes::split(image, ColorSpace::Yuv)
        .map_first(equalize_hist)?
        .merge()?;
    let smooth = bilateral_filter(&enhanced, preset.bilateral);
    let blended = add_weighted(&enhanced, &smooth, preset.blend)?;
    Ok(linear_gain(&blended, preset.gain))
}

/// # Errors
/// - Blend size mismatches
pub fn sky_mood(image: &RgbImage, mood: SkyMood, preset: &presets::SkyMoodTint) -> Result<RgbImage> {
    mood_tint(image, mood, preset)
}

/// # Errors
/// - Blend size mismatches
pub fn detail_enhance(image: &RgbImage, preset: &presets::DetailEnhance) -> Result<RgbImage> {
    let detailed = unsharp_blend(image, preset.unsharp)?;
    Ok(linear_gain(&detailed, preset.gain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn photo(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 64 * 4) as u8,
            ])
        })
    }

    #[test]
    fn test_identity_manual_edit() {
        let image = photo(20, 10);
        assert_eq!(manual_edit(&image, &ManualEditParams::default()), image);
    }

    #[test]
    fn test_manual_edit_rotates_before_mirroring() {
        let mut image = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 255, 255]));
        let edit = ManualEditParams {
            rotate: 90.0,
            flip: true,
            ..ManualEditParams::default()
        };
        let out = manual_edit(&image, &edit);
        assert_eq!(out.dimensions(), (2, 4));
        // Rotation puts the marker top-right, mirroring brings it back top-left
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_fixed_pipelines_preserve_dimensions() -> Result<()> {
        let image = photo(37, 23);
        assert_eq!(auto_enhance_basic(&image, &Default::default()).dimensions(), (37, 23));
        assert_eq!(auto_enhance(&image, &Default::default()).dimensions(), (37, 23));
        assert_eq!(color_boost(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(face_smooth(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(auto_retouch(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(hdr(&image, &Default::default()).dimensions(), (37, 23));
        assert_eq!(relight(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(cartoonify(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(depth_focus(&image, &Default::default()).dimensions(), (37, 23));
        assert_eq!(portrait_boost(&image, &Default::default())?.dimensions(), (37, 23));
        assert_eq!(detail_enhance(&image, &Default::default())?.dimensions(), (37, 23));
        Ok(())
    }

    #[test]
    fn test_depth_focus_center_sharp_corner_blurred() {
        let image = RgbImage::from_fn(300, 300, |x, y| {
            if (x / 3 + y / 3) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let preset = presets::DepthFocus::default();
        let blurred = gaussian_blur_sized(&image, preset.background_blur);
        let out = depth_focus(&image, &preset);

        let distance = |a: u8, b: u8| (i32::from(a) - i32::from(b)).abs();
        let (cx, cy) = (150, 100);
        let center = out.get_pixel(cx, cy).0[0];
        assert!(
            distance(center, image.get_pixel(cx, cy).0[0])
                < distance(center, blurred.get_pixel(cx, cy).0[0])
        );
        let corner = out.get_pixel(299, 299).0[0];
        assert!(
            distance(corner, blurred.get_pixel(299, 299).0[0])
                < distance(corner, image.get_pixel(299, 299).0[0])
        );
    }

    #[test]
    fn test_relight_flat_image_is_gain_only() -> Result<()> {
        let flat = RgbImage::from_pixel(10, 10, Rgb([60, 60, 60]));
        let out = relight(&flat, &presets::Relight::default())?;
        // 1.1 * 60 + 15
        assert!(out.pixels().all(|p| p.0 == [81, 81, 81]));
        Ok(())
    }

    #[test]
    fn test_relight_two_levels_reach_black_and_white() -> Result<()> {
        let image = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([60, 60, 60])
            } else {
                Rgb([120, 120, 120])
            }
        });
        let out = relight(&image, &presets::Relight::default())?;
        assert_eq!(out.get_pixel(0, 0).0, [15, 15, 15]);
        assert_eq!(out.get_pixel(9, 0).0, [255, 255, 255]);
        Ok(())
    }

    #[test]
    fn test_portrait_boost_flat_image_not_blown_out() -> Result<()> {
        let flat = RgbImage::from_pixel(10, 10, Rgb([60, 60, 60]));
        let out = portrait_boost(&flat, &presets::PortraitBoost::default())?;
        // (0.6 + 0.4) * 60 + 5, then 1.1 * 65 + 10
        assert!(out.iter().all(|&v| (81..=82).contains(&v)), "{:?}", out.get_pixel(0, 0));
        Ok(())
    }

    #[test]
    fn test_detail_enhance_flat_image_is_gain_only() -> Result<()> {
        let flat = RgbImage::from_pixel(12, 12, Rgb([100, 100, 100]));
        let out = detail_enhance(&flat, &presets::DetailEnhance::default())?;
        // 1.1 * 100 + 10, give or take blur rounding
        assert!(out.iter().all(|&v| (119..=122).contains(&v)));
        Ok(())
    }

    #[test]
    fn test_refine_cutout_keeps_alpha_range() -> Result<()> {
        let mut cutout = RgbaImage::new(10, 10);
        for y in 3..7 {
            for x in 3..7 {
                cutout.put_pixel(x, y, image::Rgba([200, 50, 50, 255]));
            }
        }
        let refined = refine_cutout(&cutout, &presets::BackgroundRemoval::default())?;
        assert_eq!(refined.dimensions(), (10, 10));
        // The alpha edge is softened into intermediate values
        assert!(refined.pixels().any(|p| p.0[3] > 0 && p.0[3] < 255));
        assert_eq!(refined.get_pixel(0, 0).0[3], 0);
        Ok(())
    }

    #[test]
    fn test_sky_replace_keeps_subject() -> Result<()> {
        let processor = ForegroundProcessor::mock()?;
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 60, Rgb([10, 200, 10])));
        let mut rng = StdRng::seed_from_u64(11);
        let out = sky_replace(
            &image,
            SkyMode::Day,
            &processor,
            &presets::SkyReplace::default(),
            &mut rng,
        )?;
        assert_eq!(out.get_pixel(30, 30), &Rgb([10, 200, 10]));
        assert_eq!(out.get_pixel(0, 59), &Rgb([100, 180, 255]));
        Ok(())
    }

    #[test]
    fn test_unknown_mood_matches_night() -> Result<()> {
        let image = photo(8, 8);
        let preset = presets::SkyMoodTint::default();
        let night = sky_mood(&image, SkyMood::Night, &preset)?;
        let unknown: SkyMood = "aurora".parse().unwrap_or_default();
        assert_eq!(sky_mood(&image, unknown, &preset)?, night);
        Ok(())
    }
}
