//! Synthetic skies, compositing, and mood tints

use super::ensure_same_dimensions;
use super::filters::add_weighted;
use crate::error::Result;
use crate::params::{SkyMode, SkyMood};
use crate::presets::{SkyMoodTint, SkyReplace};
use image::{Rgb, RgbImage, RgbaImage};
use rand::Rng;

/// Build a `width x height` sky; points land only in the top half
pub fn synthesize_sky<R: Rng>(
    width: u32,
    height: u32,
    mode: SkyMode,
    preset: &SkyReplace,
    rng: &mut R,
) -> RgbImage {
    match mode {
        SkyMode::Day => RgbImage::from_pixel(width, height, Rgb(preset.day)),
        SkyMode::Stars => {
            let mut sky = RgbImage::from_pixel(width, height, Rgb(preset.stars_background));
            scatter_points(&mut sky, preset.stars_count, rng, |_| Rgb([255, 255, 255]));
            sky
        },
        SkyMode::Galaxy => {
            let mut sky = RgbImage::from_pixel(width, height, Rgb(preset.galaxy_background));
            scatter_points(&mut sky, preset.galaxy_count, rng, |rng| {
                Rgb([
                    channel_in(rng, preset.galaxy_red),
                    channel_in(rng, preset.galaxy_green),
                    channel_in(rng, preset.galaxy_blue),
                ])
            });
            sky
        },
    }
}

fn channel_in<R: Rng>(rng: &mut R, (low, high): (u8, u16)) -> u8 {
    if u16::from(low) >= high {
        return low;
    }
    rng.gen_range(u16::from(low)..high) as u8
}

fn scatter_points<R, F>(sky: &mut RgbImage, count: u32, rng: &mut R, mut color: F)
where
    R: Rng,
    F: FnMut(&mut R) -> Rgb<u8>,
{
    let (width, top_half) = (sky.width(), sky.height() / 2);
    if width == 0 || top_half == 0 {
        return;
    }
    for _ in 0..count {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..top_half);
        let pixel = color(rng);
        sky.put_pixel(x, y, pixel);
    }
}

/// Composite `foreground` over an opaque `background`
///
/// # Errors
/// - Images differ in size
pub fn composite_over(background: &RgbImage, foreground: &RgbaImage) -> Result<RgbImage> {
    ensure_same_dimensions("sky composite", background.dimensions(), foreground.dimensions())?;
    let mut out = background.clone();
    for (dst, src) in out.pixels_mut().zip(foreground.pixels()) {
        let alpha = u32::from(src.0[3]);
        for c in 0..3 {
            let blended = u32::from(src.0[c]) * alpha + u32::from(dst.0[c]) * (255 - alpha);
            dst.0[c] = ((blended + 127) / 255) as u8;
        }
    }
    Ok(out)
}

/// Blend the whole image with a solid mood color
///
/// # Errors
/// - Never in practice; the overlay is built at the image's size
pub fn mood_tint(image: &RgbImage, mood: SkyMood, tint: &SkyMoodTint) -> Result<RgbImage> {
    let color = match mood {
        SkyMood::Sunset => tint.sunset,
        SkyMood::Dusk => tint.dusk,
        SkyMood::Night => tint.night,
    };
    let overlay = RgbImage::from_pixel(image.width(), image.height(), Rgb(color));
    add_weighted(image, &overlay, tint.blend)
}
