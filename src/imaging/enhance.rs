//! Pillow-style enhancers
//!
//! Each enhancer blends the image with a "degenerate" version of itself:
//! `out = degenerate + factor * (image - degenerate)`, clipped and truncated.
//! A factor of 1.0 returns the image unchanged, 0.0 returns the degenerate.

use super::clip_u8;
use super::color::{luma, luma_of};
use crate::presets::UnsharpMask;
use image::{Rgb, RgbImage};

fn blend_toward(image: &RgbImage, degenerate: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for (dst, &base) in out.iter_mut().zip(degenerate.iter()) {
        let base_f = f32::from(base);
        *dst = clip_u8(base_f + factor * (f32::from(*dst) - base_f));
    }
    out
}

/// Scale toward black
#[must_use]
pub fn brightness(image: &RgbImage, factor: f32) -> RgbImage {
    let black = RgbImage::new(image.width(), image.height());
    blend_toward(image, &black, factor)
}

/// Scale toward the mean gray level
#[must_use]
pub fn contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let pixels = u64::from(image.width()) * u64::from(image.height());
    let mean = if pixels == 0 {
        0
    } else {
        let total: u64 = image.pixels().map(|p| u64::from(luma_of(p.0))).sum();
        ((total as f64 / pixels as f64) + 0.5) as u8
    };
    let gray = RgbImage::from_pixel(image.width(), image.height(), Rgb([mean, mean, mean]));
    blend_toward(image, &gray, factor)
}

/// Scale toward the grayscale image
#[must_use]
pub fn saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let gray = luma(image);
    let degenerate = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let l = gray.get_pixel(x, y).0[0];
        Rgb([l, l, l])
    });
    blend_toward(image, &degenerate, factor)
}

/// Scale toward a 3x3 smoothed copy; factors above 1 sharpen
#[must_use]
pub fn sharpness(image: &RgbImage, factor: f32) -> RgbImage {
    blend_toward(image, &smooth(image), factor)
}

/// 3x3 `[1 1 1; 1 5 1; 1 1 1] / 13` smoothing; the one-pixel border is copied through
fn smooth(image: &RgbImage) -> RgbImage {
    const KERNEL: [[u32; 3]; 3] = [[1, 1, 1], [1, 5, 1], [1, 1, 1]];
    const SCALE: f32 = 13.0;

    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = [0_u32; 3];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    let p = image.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for c in 0..3 {
                        acc[c] += weight * u32::from(p.0[c]);
                    }
                }
            }
            out.put_pixel(
                x,
                y,
                Rgb(acc.map(|sum| clip_u8(sum as f32 / SCALE + 0.5))),
            );
        }
    }
    out
}

/// Per-channel histogram stretch after trimming `cutoff` percent from each end
#[must_use]
pub fn autocontrast(image: &RgbImage, cutoff: f32) -> RgbImage {
    let mut histograms = [[0_u64; 256]; 3];
    for pixel in image.pixels() {
        for (hist, &value) in histograms.iter_mut().zip(pixel.0.iter()) {
            hist[usize::from(value)] += 1;
        }
    }

    let luts = histograms.map(|hist| stretch_lut(hist, cutoff));
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for (value, lut) in pixel.0.iter_mut().zip(luts.iter()) {
            *value = lut[usize::from(*value)];
        }
    }
    out
}

fn stretch_lut(mut hist: [u64; 256], cutoff: f32) -> [u8; 256] {
    let total: u64 = hist.iter().sum();
    let cut = (total as f64 * f64::from(cutoff) / 100.0) as u64;

    let mut remaining = cut;
    for count in hist.iter_mut() {
        if remaining == 0 {
            break;
        }
        let removed = remaining.min(*count);
        *count -= removed;
        remaining -= removed;
    }
    let mut remaining = cut;
    for count in hist.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        let removed = remaining.min(*count);
        *count -= removed;
        remaining -= removed;
    }

    let mut lut = [0_u8; 256];
    let lo = hist.iter().position(|&c| c > 0);
    let hi = hist.iter().rposition(|&c| c > 0);
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => {
            let scale = 255.0 / (hi - lo) as f32;
            let offset = -(lo as f32) * scale;
            for (i, entry) in lut.iter_mut().enumerate() {
                *entry = clip_u8(i as f32 * scale + offset);
            }
        },
        _ => {
            for (i, entry) in lut.iter_mut().enumerate() {
                *entry = i as u8;
            }
        },
    }
    lut
}

/// Sharpen channels whose difference from a Gaussian blur reaches the threshold
#[must_use]
pub fn unsharp_mask(image: &RgbImage, mask: UnsharpMask) -> RgbImage {
    if image.width() == 0 || image.height() == 0 || mask.radius <= 0.0 {
        return image.clone();
    }
    let blurred = imageproc::filter::gaussian_blur_f32(image, mask.radius);
    let threshold = i32::from(mask.threshold);
    let mut out = image.clone();
    for (dst, &soft) in out.iter_mut().zip(blurred.iter()) {
        let diff = i32::from(*dst) - i32::from(soft);
        if diff.abs() >= threshold {
            let boosted = i32::from(*dst) + (diff as f32 * mask.percent / 100.0) as i32;
            *dst = boosted.clamp(0, 255) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RgbImage {
        RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 90]))
    }

    #[test]
    fn test_factor_one_is_identity() {
        let image = sample();
        assert_eq!(brightness(&image, 1.0), image);
        assert_eq!(contrast(&image, 1.0), image);
        assert_eq!(saturation(&image, 1.0), image);
        assert_eq!(sharpness(&image, 1.0), image);
    }

    #[test]
    fn test_brightness() {
        let image = RgbImage::from_pixel(2, 2, Rgb([100, 200, 10]));
        assert_eq!(brightness(&image, 1.5).get_pixel(0, 0), &Rgb([150, 255, 15]));
        assert_eq!(brightness(&image, 0.0).get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_contrast_zero_is_mean_gray() {
        let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let out = contrast(&image, 0.0);
        assert_eq!(out.get_pixel(0, 0), &Rgb([128, 128, 128]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_saturation_zero_is_gray() {
        let image = RgbImage::from_pixel(3, 3, Rgb([255, 0, 0]));
        assert_eq!(saturation(&image, 0.0).get_pixel(1, 1), &Rgb([76, 76, 76]));
    }

    #[test]
    fn test_sharpness_keeps_border() {
        let image = sample();
        let out = sharpness(&image, 2.0);
        assert_eq!(out.get_pixel(0, 0), image.get_pixel(0, 0));
        assert_eq!(out.get_pixel(7, 5), image.get_pixel(7, 5));
    }

    #[test]
    fn test_autocontrast_stretches_range() {
        let image = RgbImage::from_fn(100, 1, |x, _| {
            let v = 50 + x as u8;
            Rgb([v, v, v])
        });
        let out = autocontrast(&image, 1.0);
        assert_eq!(out.get_pixel(1, 0).0[0], 0);
        assert!(out.get_pixel(98, 0).0[0] >= 254);
        assert_eq!(out.get_pixel(99, 0).0[0], 255);
    }

    #[test]
    fn test_autocontrast_flat_channel_is_unchanged() {
        let image = RgbImage::from_pixel(4, 4, Rgb([10, 128, 250]));
        assert_eq!(autocontrast(&image, 1.0), image);
    }

    #[test]
    fn test_unsharp_mask_leaves_flat_regions() {
        let flat = RgbImage::from_pixel(10, 10, Rgb([60, 60, 60]));
        let mask = UnsharpMask {
            radius: 2.0,
            percent: 150.0,
            threshold: 2,
        };
        assert_eq!(unsharp_mask(&flat, mask), flat);
    }

    #[test]
    fn test_unsharp_mask_boosts_edges() {
        let edge = RgbImage::from_fn(12, 4, |x, _| if x < 6 { Rgb([80, 80, 80]) } else { Rgb([160, 160, 160]) });
        let mask = UnsharpMask {
            radius: 2.0,
            percent: 150.0,
            threshold: 2,
        };
        let out = unsharp_mask(&edge, mask);
        assert!(out.get_pixel(5, 2).0[0] < 80);
        assert!(out.get_pixel(6, 2).0[0] > 160);
    }
}
