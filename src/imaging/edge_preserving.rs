//! Domain-transform edge-preserving filtering and the effects built on it
//!
//! The recursive variant of Gastal and Oliveira's domain transform: each
//! iteration runs a causal and anti-causal first-order filter along rows, then
//! along columns, with a feedback coefficient that decays across strong edges.

use super::color::{lab_to_rgb, luma, rgb_to_lab};
use super::saturate_u8;
use crate::presets::EdgePreserving;
use image::{Rgb, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

const ITERATIONS: u32 = 3;

/// Interleaved floating-point image
#[derive(Debug, Clone, PartialEq)]
struct FloatImage {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl FloatImage {
    fn from_rgb(image: &RgbImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            channels: 3,
            data: image.iter().map(|&v| f32::from(v) / 255.0).collect(),
        }
    }

    fn to_rgb(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width as u32, self.height as u32);
        for (dst, &src) in out.iter_mut().zip(&self.data) {
            *dst = saturate_u8(src * 255.0);
        }
        out
    }

    fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Sum over channels of the absolute difference between two pixels
    fn distance(&self, a: (usize, usize), b: (usize, usize)) -> f32 {
        self.pixel(a.0, a.1)
            .iter()
            .zip(self.pixel(b.0, b.1))
            .map(|(p, q)| (p - q).abs())
            .sum()
    }
}

/// Smooth `image` in place while keeping edges whose contrast is large relative to `sigma_r`
fn recursive_filter(image: &mut FloatImage, params: EdgePreserving) {
    let (w, h, ch) = (image.width, image.height, image.channels);
    if w == 0 || h == 0 {
        return;
    }
    let ratio = params.sigma_s / params.sigma_r;

    // Domain derivatives; entry x holds the step from x-1 to x
    let mut horizontal = vec![1.0_f32; w * h];
    let mut vertical = vec![1.0_f32; w * h];
    for y in 0..h {
        for x in 0..w {
            if x > 0 {
                horizontal[y * w + x] += ratio * image.distance((x, y), (x - 1, y));
            }
            if y > 0 {
                vertical[y * w + x] += ratio * image.distance((x, y), (x, y - 1));
            }
        }
    }

    let n = ITERATIONS as i32;
    for i in 0..n {
        let sigma_h = params.sigma_s * 3.0_f32.sqrt() * 2.0_f32.powi(n - i - 1)
            / (4.0_f32.powi(n) - 1.0).sqrt();
        let a = (-(2.0_f32.sqrt()) / sigma_h).exp();

        let feedback_h: Vec<f32> = horizontal.iter().map(|&d| a.powf(d)).collect();
        let feedback_v: Vec<f32> = vertical.iter().map(|&d| a.powf(d)).collect();
        let data = &mut image.data;

        for y in 0..h {
            for x in 1..w {
                let v = feedback_h[y * w + x];
                for c in 0..ch {
                    let here = (y * w + x) * ch + c;
                    let prev = here - ch;
                    data[here] += (data[prev] - data[here]) * v;
                }
            }
            for x in (0..w.saturating_sub(1)).rev() {
                let v = feedback_h[y * w + x + 1];
                for c in 0..ch {
                    let here = (y * w + x) * ch + c;
                    let next = here + ch;
                    data[here] += (data[next] - data[here]) * v;
                }
            }
        }

        let stride = w * ch;
        for x in 0..w {
            for y in 1..h {
                let v = feedback_v[y * w + x];
                for c in 0..ch {
                    let here = (y * w + x) * ch + c;
                    let prev = here - stride;
                    data[here] += (data[prev] - data[here]) * v;
                }
            }
            for y in (0..h.saturating_sub(1)).rev() {
                let v = feedback_v[(y + 1) * w + x];
                for c in 0..ch {
                    let here = (y * w + x) * ch + c;
                    let next = here + stride;
                    data[here] += (data[next] - data[here]) * v;
                }
            }
        }
    }
}

/// Edge-preserving smoothing of an RGB image
#[must_use]
pub fn edge_preserving_smooth(image: &RgbImage, params: EdgePreserving) -> RgbImage {
    let mut float = FloatImage::from_rgb(image);
    recursive_filter(&mut float, params);
    float.to_rgb()
}

/// Local-contrast boost on Lab lightness: `L = base + 3 * (L - base)`
#[must_use]
pub fn detail_enhance(image: &RgbImage, params: EdgePreserving) -> RgbImage {
    const DETAIL_GAIN: f32 = 3.0;

    let lab: Vec<[f32; 3]> = image
        .pixels()
        .map(|p| rgb_to_lab(p.0.map(|c| f32::from(c) / 255.0)))
        .collect();

    let mut lightness = FloatImage {
        width: image.width() as usize,
        height: image.height() as usize,
        channels: 1,
        data: lab.iter().map(|[l, _, _]| l / 255.0).collect(),
    };
    let original = lightness.data.clone();
    recursive_filter(&mut lightness, params);

    let mut out = RgbImage::new(image.width(), image.height());
    for ((pixel, [_, a, b]), (&base, &l)) in out
        .pixels_mut()
        .zip(&lab)
        .zip(lightness.data.iter().zip(&original))
    {
        let enhanced = (base + DETAIL_GAIN * (l - base)) * 255.0;
        let rgb = lab_to_rgb([enhanced, *a, *b]);
        *pixel = Rgb(rgb.map(|c| saturate_u8(c * 255.0)));
    }
    out
}

/// Painterly look: edge-preserving smoothing darkened along gradient edges
#[must_use]
pub fn stylization(image: &RgbImage, params: EdgePreserving) -> RgbImage {
    let mut float = FloatImage::from_rgb(image);
    recursive_filter(&mut float, params);

    let gray = luma(&float.to_rgb());
    let gx = horizontal_sobel(&gray);
    let gy = vertical_sobel(&gray);

    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = f32::from(gx.get_pixel(x, y).0[0]) / 255.0;
        let dy = f32::from(gy.get_pixel(x, y).0[0]) / 255.0;
        let keep = 1.0 - (dx * dx + dy * dy).sqrt();
        let src = float.pixel(x as usize, y as usize);
        *pixel = Rgb([
            saturate_u8(src[0] * keep * 255.0),
            saturate_u8(src[1] * keep * 255.0),
            saturate_u8(src[2] * keep * 255.0),
        ]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOFT: EdgePreserving = EdgePreserving {
        sigma_s: 60.0,
        sigma_r: 2.0,
    };

    fn step_edge() -> RgbImage {
        RgbImage::from_fn(24, 12, |x, _| {
            if x < 12 {
                Rgb([30, 30, 30])
            } else {
                Rgb([220, 220, 220])
            }
        })
    }

    fn variance(image: &RgbImage) -> f32 {
        let values: Vec<f32> = image.iter().map(|&v| f32::from(v)).collect();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
    }

    #[test]
    fn test_smoothing_reduces_noise() {
        let noisy = RgbImage::from_fn(20, 20, |x, y| {
            let v = if (x * 7 + y * 3) % 5 < 2 { 110 } else { 130 };
            Rgb([v, v, v])
        });
        let out = edge_preserving_smooth(&noisy, SOFT);
        assert!(variance(&out) < variance(&noisy) / 2.0);
    }

    #[test]
    fn test_smoothing_keeps_strong_edges() {
        let out = edge_preserving_smooth(&step_edge(), EdgePreserving { sigma_s: 60.0, sigma_r: 0.1 });
        assert!(out.get_pixel(2, 6).0[0] < 40);
        assert!(out.get_pixel(21, 6).0[0] > 210);
    }

    #[test]
    fn test_detail_enhance_keeps_flat_image() {
        let flat = RgbImage::from_pixel(10, 10, Rgb([120, 90, 60]));
        let out = detail_enhance(&flat, EdgePreserving { sigma_s: 12.0, sigma_r: 0.15 });
        for (a, b) in out.pixels().zip(flat.pixels()) {
            for c in 0..3 {
                assert!(a.0[c].abs_diff(b.0[c]) <= 2);
            }
        }
    }

    #[test]
    fn test_detail_enhance_amplifies_texture() {
        let textured = RgbImage::from_fn(16, 16, |x, y| {
            let v = if (x + y) % 2 == 0 { 120 } else { 136 };
            Rgb([v, v, v])
        });
        let out = detail_enhance(&textured, EdgePreserving { sigma_s: 12.0, sigma_r: 0.15 });
        assert!(variance(&out) > variance(&textured));
    }

    #[test]
    fn test_stylization_darkens_edges() {
        let out = stylization(&step_edge(), EdgePreserving { sigma_s: 150.0, sigma_r: 0.25 });
        assert_eq!(out.dimensions(), (24, 12));
        let edge = out.get_pixel(12, 6).0[0];
        let interior = out.get_pixel(22, 6).0[0];
        assert!(edge < interior, "edge {edge} should be darker than interior {interior}");
    }

    #[test]
    fn test_empty_image() {
        let empty = RgbImage::new(0, 0);
        assert_eq!(edge_preserving_smooth(&empty, SOFT).dimensions(), (0, 0));
    }
}
