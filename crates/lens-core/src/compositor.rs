//! Frame compositor: paste filtered regions back and annotate them.
//!
//! All writes go straight into the caller's frame buffer. Calls are made in
//! detection order, so a later overlapping detection overwrites an earlier one.

use crate::font;
use crate::types::{PixelBox, Rgb};
use image::RgbImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

// --- Named constants (no magic numbers) ---
const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: u32 = 1;
const LABEL_PADDING: u32 = 2;
const STATUS_SCALE: u32 = 2;
const STATUS_MARGIN: i32 = 10;
const STATUS_LINE_GAP: u32 = 6;

/// Colours used to annotate one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    pub color: Rgb,
    pub text_color: Rgb,
}

/// Frame areas written by one compositing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    /// Pasted region, box outline included.
    pub rect: PixelBox,
    /// Label banner, clamped to the frame. `None` when the banner fell entirely off-frame.
    pub banner: Option<PixelBox>,
}

impl Damage {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let inside = |b: &PixelBox| x >= b.x1 && x < b.x2 && y >= b.y1 && y < b.y2;
        inside(&self.rect) || self.banner.as_ref().is_some_and(inside)
    }
}

fn to_rect(b: &PixelBox) -> Option<Rect> {
    (!b.is_empty()).then(|| Rect::at(b.x1, b.y1).of_size(b.width(), b.height()))
}

/// Paste `filtered` at `rect`, outline it, and write `label` on a filled banner.
///
/// `rect` must already be clamped to the frame (as returned by
/// [`crate::region::extract`]) and `filtered` must have the same size.
pub fn composite(
    frame: &mut RgbImage,
    rect: &PixelBox,
    filtered: &RgbImage,
    label: &str,
    style: &BoxStyle,
) -> Damage {
    image::imageops::replace(frame, filtered, rect.x1 as i64, rect.y1 as i64);
    draw_box(frame, rect, style.color);
    let banner = draw_label(frame, rect, label, style);
    Damage {
        rect: *rect,
        banner,
    }
}

/// Draw a rectangle outline `BOX_THICKNESS` pixels wide, inset from `rect`.
pub fn draw_box(frame: &mut RgbImage, rect: &PixelBox, color: Rgb) {
    for inset in 0..BOX_THICKNESS as i32 {
        let ring = PixelBox::new(
            rect.x1 + inset,
            rect.y1 + inset,
            rect.x2 - inset,
            rect.y2 - inset,
        );
        match to_rect(&ring) {
            Some(r) => draw_hollow_rect_mut(frame, r, image::Rgb(color)),
            None => break,
        }
    }
}

/// Banner above the box, or just inside its top edge when there is no room above.
fn label_banner(rect: &PixelBox, label: &str) -> PixelBox {
    let (text_w, text_h) = font::text_size(label, LABEL_SCALE);
    let w = (text_w + 2 * LABEL_PADDING) as i32;
    let h = (text_h + 2 * LABEL_PADDING) as i32;
    let y1 = if rect.y1 >= h { rect.y1 - h } else { rect.y1 };
    PixelBox::new(rect.x1, y1, rect.x1 + w, y1 + h)
}

fn draw_label(
    frame: &mut RgbImage,
    rect: &PixelBox,
    label: &str,
    style: &BoxStyle,
) -> Option<PixelBox> {
    if label.is_empty() {
        return None;
    }
    let banner = label_banner(rect, label).clamp_to(frame.width(), frame.height());
    let area = to_rect(&banner)?;
    draw_filled_rect_mut(frame, area, image::Rgb(style.color));
    let pad = LABEL_PADDING as i32;
    font::draw_text(
        frame,
        banner.x1 + pad,
        banner.y1 + pad,
        label,
        LABEL_SCALE,
        style.text_color,
    );
    Some(banner)
}

/// Write status lines (e.g. active gesture and filter) at the top-left corner.
///
/// Returns the area covered by the text, clamped to the frame.
pub fn draw_status(frame: &mut RgbImage, lines: &[String], color: Rgb) -> Option<PixelBox> {
    let mut covered: Option<PixelBox> = None;
    let mut y = STATUS_MARGIN;
    for line in lines {
        let (w, h) = font::text_size(line, STATUS_SCALE);
        font::draw_text(frame, STATUS_MARGIN, y, line, STATUS_SCALE, color);
        let area = PixelBox::new(STATUS_MARGIN, y, STATUS_MARGIN + w as i32, y + h as i32);
        covered = Some(match covered {
            None => area,
            Some(c) => PixelBox::new(c.x1.min(area.x1), c.y1, c.x2.max(area.x2), area.y2),
        });
        y += (h + STATUS_LINE_GAP) as i32;
    }
    covered
        .map(|c| c.clamp_to(frame.width(), frame.height()))
        .filter(|c| !c.is_empty())
}
