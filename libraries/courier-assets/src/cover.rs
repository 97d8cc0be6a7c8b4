//! Cover artwork checks

use crate::Result;
use std::path::Path;

/// Smallest accepted cover edge, in pixels
pub const MIN_COVER_PX: u32 = 800;

/// Read an image's `(width, height)` without decoding pixel data
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(image::image_dimensions(path)?)
}

/// Whether both image edges are at least `min_px`
pub fn validate_image_size(path: &Path, min_px: u32) -> Result<bool> {
    let (width, height) = image_dimensions(path)?;
    Ok(width >= min_px && height >= min_px)
}
