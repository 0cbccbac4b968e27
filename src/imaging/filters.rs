//! Classical 8-bit filters with OpenCV-compatible arithmetic

use super::{ensure_same_dimensions, from_samples, reflect_101, saturate_u8, Image8};
use crate::error::Result;
use crate::presets::{BilateralParams, GaussianKernel, LinearGain, UnsharpBlend, WeightedBlend};
use image::{GrayImage, Pixel, RgbImage};

/// `saturate(|px * scale + offset|)` on every sample
#[must_use]
pub fn linear_gain<P>(image: &Image8<P>, gain: LinearGain) -> Image8<P>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = image.clone();
    for sample in out.iter_mut() {
        *sample = saturate_u8((f32::from(*sample) * gain.scale + gain.offset).abs());
    }
    out
}

/// `saturate(a * first + b * second + gamma)` on every sample
///
/// # Errors
/// - Images differ in size
pub fn add_weighted<P>(a: &Image8<P>, b: &Image8<P>, blend: WeightedBlend) -> Result<Image8<P>>
where
    P: Pixel<Subpixel = u8>,
{
    ensure_same_dimensions("weighted blend", a.dimensions(), b.dimensions())?;
    let samples = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            saturate_u8(f32::from(x) * blend.first + f32::from(y) * blend.second + blend.gamma)
        })
        .collect();
    from_samples(a.width(), a.height(), samples)
}

/// Sharpen by blending with a Gaussian-blurred copy of the image
///
/// # Errors
/// - Never in practice; the blurred copy always matches the source size
pub fn unsharp_blend(image: &RgbImage, blend: UnsharpBlend) -> Result<RgbImage> {
    let blurred = gaussian_blur_sized(image, GaussianKernel::new(0, blend.sigma));
    add_weighted(
        image,
        &blurred,
        WeightedBlend::new(blend.source_weight(), blend.blur_weight, 0.0),
    )
}

/// 1-D Gaussian kernel, normalized to sum 1
///
/// A `size` of 0 derives an odd size from sigma. A non-positive sigma derives
/// sigma from the size; small sizes then use the fixed binomial tables.
#[must_use]
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let size = if size == 0 {
        if sigma <= 0.0 {
            1
        } else {
            ((sigma * 6.0 + 1.0).round() as u32) | 1
        }
    } else {
        size
    };

    if sigma <= 0.0 {
        match size {
            1 => return vec![1.0],
            3 => return vec![0.25, 0.5, 0.25],
            5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => {
                return vec![
                    0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
                ]
            },
            _ => {},
        }
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = (size as f32 - 1.0) / 2.0;
    let scale = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - center;
            (x * x * scale).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Gaussian blur with an explicit kernel size and reflect-101 borders
#[must_use]
pub fn gaussian_blur_sized<P>(image: &Image8<P>, kernel: GaussianKernel) -> Image8<P>
where
    P: Pixel<Subpixel = u8>,
{
    let taps = gaussian_kernel(kernel.size, kernel.sigma);
    let (width, height) = image.dimensions();
    let mut out = Image8::<P>::new(width, height);
    convolve_separable(
        image,
        width as usize,
        height as usize,
        usize::from(P::CHANNEL_COUNT),
        &taps,
        &mut out,
    );
    out
}

fn convolve_separable(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    taps: &[f32],
    dst: &mut [u8],
) {
    if width == 0 || height == 0 {
        return;
    }
    let radius = (taps.len() / 2) as isize;
    let row_len = width * channels;

    let mut horizontal = vec![0.0_f32; src.len()];
    for y in 0..height {
        let row = &src[y * row_len..(y + 1) * row_len];
        let out_row = &mut horizontal[y * row_len..(y + 1) * row_len];
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0;
                for (k, &w) in taps.iter().enumerate() {
                    let sx = reflect_101(x as isize + k as isize - radius, width);
                    acc += w * f32::from(row[sx * channels + c]);
                }
                out_row[x * channels + c] = acc;
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0;
                for (k, &w) in taps.iter().enumerate() {
                    let sy = reflect_101(y as isize + k as isize - radius, height);
                    acc += w * horizontal[sy * row_len + x * channels + c];
                }
                dst[y * row_len + x * channels + c] = saturate_u8(acc);
            }
        }
    }
}

/// Edge-preserving bilateral smoothing of an RGB image
///
/// Neighbors lie within a circle of radius `diameter / 2`. Color distance is
/// the L1 sum over channels. Borders are reflect-101.
#[must_use]
pub fn bilateral_filter(image: &RgbImage, params: BilateralParams) -> RgbImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut out = RgbImage::new(width, height);
    if w == 0 || h == 0 {
        return out;
    }

    let sigma_color = if params.sigma_color <= 0.0 {
        1.0
    } else {
        params.sigma_color
    };
    let sigma_space = if params.sigma_space <= 0.0 {
        1.0
    } else {
        params.sigma_space
    };
    let radius = if params.diameter == 0 {
        (sigma_space * 1.5).round() as isize
    } else {
        (params.diameter / 2) as isize
    }
    .max(1);

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_weights: Vec<f32> = (0..3 * 256)
        .map(|d| {
            let d = d as f32;
            (d * d * color_coeff).exp()
        })
        .collect();

    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist2 = (dx * dx + dy * dy) as f32;
            if dist2.sqrt() > radius as f32 {
                continue;
            }
            window.push((dx, dy, (dist2 * space_coeff).exp()));
        }
    }

    let src = image.as_raw();
    for y in 0..h {
        for x in 0..w {
            let center = &src[(y * w + x) * 3..(y * w + x) * 3 + 3];
            let mut acc = [0.0_f32; 3];
            let mut weight_sum = 0.0_f32;
            for &(dx, dy, space_weight) in &window {
                let sx = reflect_101(x as isize + dx, w);
                let sy = reflect_101(y as isize + dy, h);
                let idx = (sy * w + sx) * 3;
                let neighbor = &src[idx..idx + 3];
                let distance: usize = neighbor
                    .iter()
                    .zip(center)
                    .map(|(&a, &b)| usize::from(a.abs_diff(b)))
                    .sum();
                let weight = space_weight * color_weights[distance];
                for c in 0..3 {
                    acc[c] += weight * f32::from(neighbor[c]);
                }
                weight_sum += weight;
            }
            let pixel = out.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                pixel.0[c] = saturate_u8(acc[c] / weight_sum);
            }
        }
    }
    out
}

/// Median filter with a square odd-sized window
#[must_use]
pub fn median_blur(gray: &GrayImage, size: u32) -> GrayImage {
    let radius = size / 2;
    imageproc::filter::median_filter(gray, radius, radius)
}

/// Binary threshold against the local mean: `255 if src > mean(block) - offset else 0`
///
/// The block mean uses replicated borders and is rounded to an integer first.
#[must_use]
pub fn adaptive_threshold_mean(gray: &GrayImage, block: u32, offset: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut out = GrayImage::new(width, height);
    if w == 0 || h == 0 {
        return out;
    }
    let radius = (block / 2) as isize;
    let area = (block * block) as f32;
    let threshold = offset.ceil() as i32;
    let src = gray.as_raw();
    let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

    let mut row_sums = vec![0_u32; w * h];
    for y in 0..h {
        for x in 0..w {
            row_sums[y * w + x] = (-radius..=radius)
                .map(|d| u32::from(src[y * w + clamp(x as isize + d, w)]))
                .sum();
        }
    }

    for y in 0..h {
        for x in 0..w {
            let sum: u32 = (-radius..=radius)
                .map(|d| row_sums[clamp(y as isize + d, h) * w + x])
                .sum();
            let mean = (sum as f32 / area).round() as i32;
            let value = i32::from(src[y * w + x]);
            out.put_pixel(
                x as u32,
                y as u32,
                image::Luma([if value - mean > -threshold { 255 } else { 0 }]),
            );
        }
    }
    out
}

/// Keep pixels where the mask is non-zero, black elsewhere
///
/// # Errors
/// - Mask and image differ in size
pub fn mask_with(image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    ensure_same_dimensions("mask", image.dimensions(), mask.dimensions())?;
    let mut out = image.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            *pixel = image::Rgb([0, 0, 0]);
        }
    }
    Ok(out)
}
