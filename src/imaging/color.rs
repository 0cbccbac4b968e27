//! Color-space conversions used by the pipelines
//!
//! 8-bit encodings follow OpenCV: Lab stores `L * 255 / 100`, `a + 128`, `b + 128`
//! (D65 white, sRGB gamma); HSV stores hue halved into `0..180`; YUV uses the
//! analog `U = 0.492 (B - Y)`, `V = 0.877 (R - Y)` weights offset by 128.

use super::{ensure_same_dimensions, saturate_u8};
use crate::error::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;
const LAB_EPSILON: f32 = 0.008_856;
const LAB_KAPPA: f32 = 903.3;

/// Three-channel color spaces a pipeline can split an image into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Lab,
    Hsv,
    Yuv,
}

/// An image split into three single-channel planes of one color space
#[derive(Debug, Clone)]
pub struct ChannelPlanes {
    pub space: ColorSpace,
    pub planes: [GrayImage; 3],
}

impl ChannelPlanes {
    /// Split an RGB image into planes of `space`
    #[must_use]
    pub fn split(image: &RgbImage, space: ColorSpace) -> Self {
        let (width, height) = image.dimensions();
        let mut planes = [
            GrayImage::new(width, height),
            GrayImage::new(width, height),
            GrayImage::new(width, height),
        ];
        for (x, y, pixel) in image.enumerate_pixels() {
            let encoded = match space {
                ColorSpace::Lab => rgb_to_lab8(pixel.0),
                ColorSpace::Hsv => rgb_to_hsv8(pixel.0),
                ColorSpace::Yuv => rgb_to_yuv8(pixel.0),
            };
            for (plane, value) in planes.iter_mut().zip(encoded) {
                plane.put_pixel(x, y, Luma([value]));
            }
        }
        Self { space, planes }
    }

    /// Apply `f` to the first plane (Lab lightness, HSV hue, YUV luma)
    ///
    /// # Errors
    /// - `f` returns a plane of a different size
    pub fn map_first<F>(mut self, f: F) -> Result<Self>
    where
        F: FnOnce(&GrayImage) -> GrayImage,
    {
        let replaced = f(&self.planes[0]);
        ensure_same_dimensions("channel replace", self.planes[0].dimensions(), replaced.dimensions())?;
        self.planes[0] = replaced;
        Ok(self)
    }

    /// Apply `f` to the last plane (Lab b, HSV value, YUV V)
    ///
    /// # Errors
    /// - `f` returns a plane of a different size
    pub fn map_last<F>(mut self, f: F) -> Result<Self>
    where
        F: FnOnce(&GrayImage) -> GrayImage,
    {
        let replaced = f(&self.planes[2]);
        ensure_same_dimensions("channel replace", self.planes[2].dimensions(), replaced.dimensions())?;
        self.planes[2] = replaced;
        Ok(self)
    }

    /// Merge the planes back into RGB
    ///
    /// # Errors
    /// - Planes differ in size
    pub fn merge(&self) -> Result<RgbImage> {
        let [c0, c1, c2] = &self.planes;
        ensure_same_dimensions("channel merge", c0.dimensions(), c1.dimensions())?;
        ensure_same_dimensions("channel merge", c0.dimensions(), c2.dimensions())?;
        Ok(RgbImage::from_fn(c0.width(), c0.height(), |x, y| {
            let encoded = [
                c0.get_pixel(x, y).0[0],
                c1.get_pixel(x, y).0[0],
                c2.get_pixel(x, y).0[0],
            ];
            Rgb(match self.space {
                ColorSpace::Lab => lab8_to_rgb(encoded),
                ColorSpace::Hsv => hsv8_to_rgb(encoded),
                ColorSpace::Yuv => yuv8_to_rgb(encoded),
            })
        }))
    }
}

/// Rec.601 luma with Pillow's fixed-point rounding
#[must_use]
pub fn luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma_of(image.get_pixel(x, y).0)])
    })
}

#[inline]
pub(crate) fn luma_of([r, g, b]: [u8; 3]) -> u8 {
    let weighted = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (weighted >> 16) as u8
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Float CIE Lab from RGB in `0..=1`; L is `0..=100`
#[must_use]
pub fn rgb_to_lab([r, g, b]: [f32; 3]) -> [f32; 3] {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * y
    };
    [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// RGB in `0..=1` from float CIE Lab, clamped to gamut
#[must_use]
pub fn lab_to_rgb([l, a, b]: [f32; 3]) -> [f32; 3] {
    let (y, fy) = if l <= LAB_KAPPA * LAB_EPSILON {
        let y = l / LAB_KAPPA;
        (y, 7.787 * y + 16.0 / 116.0)
    } else {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    };
    let inverse_f = |f: f32| {
        if f > 0.206_893 {
            f * f * f
        } else {
            (f - 16.0 / 116.0) / 7.787
        }
    };
    let x = inverse_f(a / 500.0 + fy) * WHITE_X;
    let z = inverse_f(fy - b / 200.0) * WHITE_Z;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)]
}

fn rgb_to_lab8(rgb: [u8; 3]) -> [u8; 3] {
    let [l, a, b] = rgb_to_lab(rgb.map(|c| f32::from(c) / 255.0));
    [
        saturate_u8(l * 255.0 / 100.0),
        saturate_u8(a + 128.0),
        saturate_u8(b + 128.0),
    ]
}

fn lab8_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let lab = [
        f32::from(l) * 100.0 / 255.0,
        f32::from(a) - 128.0,
        f32::from(b) - 128.0,
    ];
    lab_to_rgb(lab).map(|c| saturate_u8(c * 255.0))
}

fn rgb_to_hsv8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let mut hue = if delta == 0.0 {
        0.0
    } else if (max - rf).abs() < f32::EPSILON {
        60.0 * (gf - bf) / delta
    } else if (max - gf).abs() < f32::EPSILON {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    let hue = (hue / 2.0).round();
    [
        if hue >= 180.0 { 0 } else { hue as u8 },
        saturate_u8(saturation),
        max as u8,
    ]
}

fn hsv8_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    let value = f32::from(v);
    if s == 0 {
        return [v, v, v];
    }
    let saturation = f32::from(s) / 255.0;
    let sector_f = (f32::from(h) * 2.0 % 360.0) / 60.0;
    let sector = sector_f.floor();
    let fraction = sector_f - sector;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * fraction);
    let t = value * (1.0 - saturation * (1.0 - fraction));
    let (r, g, b) = match sector as u8 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    [saturate_u8(r), saturate_u8(g), saturate_u8(b)]
}

fn rgb_to_yuv8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    [
        saturate_u8(y),
        saturate_u8(0.492 * (bf - y) + 128.0),
        saturate_u8(0.877 * (rf - y) + 128.0),
    ]
}

fn yuv8_to_rgb([y, u, v]: [u8; 3]) -> [u8; 3] {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;
    [
        saturate_u8(y + 1.140 * v),
        saturate_u8(y - 0.395 * u - 0.581 * v),
        saturate_u8(y + 2.032 * u),
    ]
}
