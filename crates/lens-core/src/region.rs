//! Region-of-interest extraction.

use crate::types::PixelBox;
use image::RgbImage;

/// A copy of the frame pixels under a clamped, non-empty box.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Box after clamping to the frame; always non-empty.
    pub rect: PixelBox,
    pub pixels: RgbImage,
}

/// Clamp `bbox` to the frame and copy the pixels beneath it.
///
/// Returns `None` when the clamped box has zero width or height; callers must skip
/// filtering for that detection.
pub fn extract(frame: &RgbImage, bbox: &PixelBox) -> Option<Region> {
    let rect = bbox.clamp_to(frame.width(), frame.height());
    if rect.is_empty() {
        return None;
    }
    let pixels = image::imageops::crop_imm(
        frame,
        rect.x1 as u32,
        rect.y1 as u32,
        rect.width(),
        rect.height(),
    )
    .to_image();
    Some(Region { rect, pixels })
}
