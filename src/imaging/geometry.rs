//! Rotation and mirroring

use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Rotate clockwise by `degrees`, growing the canvas so no pixel is cropped
///
/// Multiples of 90° are exact transposes. Other angles sample nearest
/// neighbours and fill the uncovered corners with black.
#[must_use]
pub fn rotate_expand(image: &RgbImage, degrees: f32) -> RgbImage {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative angles up to exactly 360
    if normalized == 0.0 || normalized >= 360.0 {
        return image.clone();
    }
    if normalized % 90.0 == 0.0 {
        return match normalized as u32 {
            90 => imageops::rotate90(image),
            180 => imageops::rotate180(image),
            _ => imageops::rotate270(image),
        };
    }

    let (width, height) = (image.width() as f32, image.height() as f32);
    let theta = normalized.to_radians();
    let (new_width, new_height) = expanded_size(width, height, theta);
    let mut out = RgbImage::new(new_width, new_height);
    if image.width() == 0 || image.height() == 0 {
        return out;
    }

    let projection = Projection::translate(new_width as f32 / 2.0, new_height as f32 / 2.0)
        * Projection::rotate(theta)
        * Projection::translate(-width / 2.0, -height / 2.0);
    warp_into(
        image,
        &projection,
        Interpolation::Nearest,
        Rgb([0, 0, 0]),
        &mut out,
    );
    out
}

/// Bounding box of a `width x height` rectangle rotated by `theta` about its center
fn expanded_size(width: f32, height: f32, theta: f32) -> (u32, u32) {
    let (sin, cos) = theta.sin_cos();
    let corners = [
        (-width / 2.0, -height / 2.0),
        (width / 2.0, -height / 2.0),
        (-width / 2.0, height / 2.0),
        (width / 2.0, height / 2.0),
    ];
    let rotated = corners.map(|(x, y)| (x * cos - y * sin, x * sin + y * cos));

    // Trim float noise so exact extents do not round up a pixel
    let extent = |values: [f32; 4]| {
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let span = (max - 1e-3).ceil() - (min + 1e-3).floor();
        span.max(1.0) as u32
    };
    (
        extent(rotated.map(|(x, _)| x)),
        extent(rotated.map(|(_, y)| y)),
    )
}

/// Mirror left to right
#[must_use]
pub fn mirror(image: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(image)
}
