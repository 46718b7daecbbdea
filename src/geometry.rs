//! Padding and crop arithmetic
//!
//! Pure functions that decide where the sprite sits on the padded canvas
//! and which rectangle of the scaled output is kept.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for geometry calculations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Source image has a zero dimension
    #[error("source image is empty ({0}x{1})")]
    EmptySource(u32, u32),
    /// Padded canvas would not fit in u32
    #[error("padded canvas for a {0}x{1} image is too large")]
    CanvasTooLarge(u32, u32),
    /// Scaled output has a zero dimension
    #[error("scaled image is empty ({0}x{1})")]
    EmptyScaled(u32, u32),
    /// Extend shrank the crop to nothing
    #[error("crop size {width}x{height} is not positive (extend {extend} is too small)")]
    EmptyCrop { width: i64, height: i64, extend: i32 },
    /// Extend grew the crop past what can be allocated
    #[error("crop size {width}x{height} is too large (extend {extend} is too big)")]
    CropTooLarge { width: i64, height: i64, extend: i32 },
}

/// Largest crop buffer, in RGBA bytes.
///
/// Same ceiling as the default allocation limit of the `image` decoders, so
/// a crop is never bigger than an image scalerim could have loaded.
pub const MAX_CROP_BYTES: u64 = 512 * 1024 * 1024;

/// Which scaled dimension the crop's top edge is centered against.
///
/// `Width` reproduces the long-standing behavior of centering the top edge
/// against the scaled *width*, which only matches `Height` for square
/// sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CropTopAxis {
    #[default]
    Width,
    Height,
}

/// A rectangle in scaled-image coordinates; may extend past the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

/// Computed crop for a scaled image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlan {
    /// Effective upscale factor observed from the scaled width.
    pub ratio: f64,
    pub rect: CropRect,
}

/// Size of the transparent canvas the source is centered on.
pub fn padded_size(width: u32, height: u32) -> Result<(u32, u32), GeometryError> {
    if width == 0 || height == 0 {
        return Err(GeometryError::EmptySource(width, height));
    }
    match (width.checked_mul(2), height.checked_mul(2)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(GeometryError::CanvasTooLarge(width, height)),
    }
}

/// Offset of the source's top-left corner on a canvas of `canvas` size.
pub fn center_offset(canvas: (u32, u32), source: (u32, u32)) -> (u32, u32) {
    (canvas.0.saturating_sub(source.0) / 2, canvas.1.saturating_sub(source.1) / 2)
}

/// Plan the crop that removes the padding from a scaled image.
///
/// * `source` - size of the original sprite
/// * `scaled` - size of the external tool's output for the padded canvas
/// * `extend` - extra border to keep on each side, in scaled pixels
pub fn plan_crop(
    source: (u32, u32),
    scaled: (u32, u32),
    extend: i32,
    top_axis: CropTopAxis,
) -> Result<CropPlan, GeometryError> {
    let (src_w, src_h) = source;
    let (tw, th) = scaled;
    if src_w == 0 || src_h == 0 {
        return Err(GeometryError::EmptySource(src_w, src_h));
    }
    if tw == 0 || th == 0 {
        return Err(GeometryError::EmptyScaled(tw, th));
    }

    let ratio = tw as f64 / (2.0 * src_w as f64);
    let margin = 2 * extend as i64;
    let new_w = (src_w as f64 * ratio).round() as i64 + margin;
    let new_h = (src_h as f64 * ratio).round() as i64 + margin;
    if new_w <= 0 || new_h <= 0 {
        return Err(GeometryError::EmptyCrop { width: new_w, height: new_h, extend });
    }

    let top_basis = match top_axis {
        CropTopAxis::Width => tw,
        CropTopAxis::Height => th,
    } as i64;

    // floor division so negative offsets round the same way as the padding
    let left = (tw as i64 - new_w).div_euclid(2);
    let top = (top_basis - new_h).div_euclid(2);

    let bytes = (new_w as u64).checked_mul(new_h as u64).and_then(|px| px.checked_mul(4));
    let (width, height) = match (u32::try_from(new_w), u32::try_from(new_h), bytes) {
        (Ok(w), Ok(h), Some(b)) if b <= MAX_CROP_BYTES => (w, h),
        _ => return Err(GeometryError::CropTooLarge { width: new_w, height: new_h, extend }),
    };

    Ok(CropPlan { ratio, rect: CropRect { left, top, width, height } })
}
