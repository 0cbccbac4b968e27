//! Pixel-level building blocks for the operation pipelines
//!
//! Everything here works on decoded `image` buffers and is free of I/O. The
//! enhancers follow Pillow's 8-bit arithmetic, the filters follow OpenCV's, so
//! the pipelines in [`crate::operations`] produce the same look as the
//! reference tools they were tuned against.

pub mod clahe;
pub mod color;
pub mod edge_preserving;
pub mod enhance;
pub mod filters;
pub mod geometry;
pub mod sky;

use crate::error::{EditError, Result};
use image::{ImageBuffer, Pixel};

/// Owned 8-bit image with any pixel layout
pub type Image8<P> = ImageBuffer<P, Vec<u8>>;

/// Round to nearest and clamp into `0..=255`
#[inline]
pub(crate) fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Clamp into `0..=255` and truncate toward zero
#[inline]
pub(crate) fn clip_u8(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Mirror an out-of-range index without repeating the edge sample (`gfedcb|abcdefgh|gfedcba`)
#[inline]
pub(crate) fn reflect_101(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Fail with a processing error unless both images share their dimensions
pub(crate) fn ensure_same_dimensions(stage: &str, a: (u32, u32), b: (u32, u32)) -> Result<()> {
    if a == b {
        Ok(())
    } else {
        Err(EditError::processing_stage_error(
            stage,
            &format!(
                "dimension mismatch: {}x{} vs {}x{}",
                a.0, a.1, b.0, b.1
            ),
        ))
    }
}

/// Rebuild an image from a raw sample buffer
pub(crate) fn from_samples<P>(width: u32, height: u32, samples: Vec<u8>) -> Result<Image8<P>>
where
    P: Pixel<Subpixel = u8>,
{
    ImageBuffer::from_raw(width, height, samples).ok_or_else(|| {
        EditError::processing(format!(
            "sample buffer does not fit a {width}x{height} image"
        ))
    })
}
