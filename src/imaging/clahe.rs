//! Global and contrast-limited adaptive histogram equalization

use super::{reflect_101, saturate_u8};
use crate::presets::ClaheParams;
use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Global histogram equalization with OpenCV's `equalizeHist` mapping
///
/// The darkest occupied level maps to 0 and the brightest to 255. A plane
/// holding a single level is returned unchanged.
#[must_use]
pub fn equalize_hist(gray: &GrayImage) -> GrayImage {
    let mut hist = [0_usize; BINS];
    for pixel in gray.pixels() {
        hist[usize::from(pixel.0[0])] += 1;
    }
    let total = gray.as_raw().len();
    let Some(first) = hist.iter().position(|&count| count > 0) else {
        return gray.clone();
    };
    if hist[first] == total {
        return gray.clone();
    }

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut lut = [0_u8; BINS];
    let mut cumulative = 0;
    for (entry, count) in lut.iter_mut().zip(hist).skip(first + 1) {
        cumulative += count;
        *entry = saturate_u8(cumulative as f32 * scale);
    }

    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    out
}

/// Equalize `gray` per tile with clipped histograms, interpolating between tiles
///
/// When the size does not divide into whole tiles the histograms are taken
/// over a reflect-101 extension of the image, as OpenCV does.
#[must_use]
pub fn clahe(gray: &GrayImage, params: ClaheParams) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let tiles_x = params.tiles_x.max(1) as usize;
    let tiles_y = params.tiles_y.max(1) as usize;
    let (w, h) = (width as usize, height as usize);

    let ext_w = w + (tiles_x - w % tiles_x) % tiles_x;
    let ext_h = h + (tiles_y - h % tiles_y) % tiles_y;
    let tile_w = ext_w / tiles_x;
    let tile_h = ext_h / tiles_y;
    let tile_area = tile_w * tile_h;

    let clip = if params.clip_limit > 0.0 {
        ((params.clip_limit * tile_area as f32 / BINS as f32) as usize).max(1)
    } else {
        usize::MAX
    };

    let src = gray.as_raw();
    let sample = |x: usize, y: usize| -> u8 {
        let sx = reflect_101(x as isize, w);
        let sy = reflect_101(y as isize, h);
        src[sy * w + sx]
    };

    let lut_scale = 255.0 / tile_area as f32;
    let mut luts = vec![[0_u8; BINS]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0_usize; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[usize::from(sample(x, y))] += 1;
                }
            }
            clip_histogram(&mut hist, clip);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut cumulative = 0;
            for (entry, count) in lut.iter_mut().zip(hist) {
                cumulative += count;
                *entry = saturate_u8(cumulative as f32 * lut_scale);
            }
        }
    }

    let inv_tile_w = 1.0 / tile_w as f32;
    let inv_tile_h = 1.0 / tile_h as f32;
    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        let tyf = y as f32 * inv_tile_h - 0.5;
        let ty1 = tyf.floor();
        let ya = tyf - ty1;
        let ty2 = ((ty1 as isize + 1).min(tiles_y as isize - 1)).max(0) as usize;
        let ty1 = (ty1 as isize).max(0) as usize;

        for x in 0..w {
            let txf = x as f32 * inv_tile_w - 0.5;
            let tx1 = txf.floor();
            let xa = txf - tx1;
            let tx2 = ((tx1 as isize + 1).min(tiles_x as isize - 1)).max(0) as usize;
            let tx1 = (tx1 as isize).max(0) as usize;

            let v = usize::from(src[y * w + x]);
            let at = |tx: usize, ty: usize| f32::from(luts[ty * tiles_x + tx][v]);
            let top = at(tx1, ty1) * (1.0 - xa) + at(tx2, ty1) * xa;
            let bottom = at(tx1, ty2) * (1.0 - xa) + at(tx2, ty2) * xa;
            out.put_pixel(
                x as u32,
                y as u32,
                Luma([saturate_u8(top * (1.0 - ya) + bottom * ya)]),
            );
        }
    }
    out
}

/// Clip every bin at `limit` and spread the excess evenly, remainder from the low end
fn clip_histogram(hist: &mut [usize; BINS], limit: usize) {
    let mut excess = 0;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    if excess == 0 {
        return;
    }

    let batch = excess / BINS;
    let mut residual = excess - batch * BINS;
    for count in hist.iter_mut() {
        *count += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}
