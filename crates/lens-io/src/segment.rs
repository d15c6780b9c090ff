//! Colour-range segmentation adapter.
//!
//! Each named range masks the frame in 8-bit HSV (hue 0..180, saturation and
//! value 0..=255). 8-connected blobs larger than the minimum area become
//! detections labelled with the range name.

use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use lens_core::filters::rgb_to_hsv;
use lens_core::pipeline::{AdapterError, DetectionAdapter};
use lens_core::{ClassLabel, Detection, PixelBox};
use serde::{Deserialize, Serialize};

/// Blobs with this many pixels or fewer are ignored.
pub const DEFAULT_MIN_AREA: u32 = 500;

const MASK_ON: u8 = 255;

/// Inclusive HSV bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(name: &str, lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
        }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

/// Red, green and blue ranges tuned for product packaging.
pub fn default_ranges() -> Vec<ColorRange> {
    vec![
        ColorRange::new("red", [0, 120, 70], [10, 255, 255]),
        ColorRange::new("green", [36, 100, 100], [86, 255, 255]),
        ColorRange::new("blue", [94, 80, 2], [126, 255, 255]),
    ]
}

fn to_hsv8(px: [u8; 3]) -> [u8; 3] {
    let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
    [h as u8, (s * 255.0).round() as u8, v as u8]
}

pub struct ColorSegmenter {
    ranges: Vec<ColorRange>,
    min_area: u32,
}

impl Default for ColorSegmenter {
    fn default() -> Self {
        Self::new(default_ranges(), DEFAULT_MIN_AREA)
    }
}

impl ColorSegmenter {
    pub fn new(ranges: Vec<ColorRange>, min_area: u32) -> Self {
        Self { ranges, min_area }
    }

    fn mask(&self, hsv: &[[u8; 3]], width: u32, height: u32, range: &ColorRange) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let on = range.contains(hsv[(y * width + x) as usize]);
            Luma([if on { MASK_ON } else { 0 }])
        })
    }

    /// Bounding boxes of the blobs in `mask` whose area exceeds the minimum.
    fn blobs(&self, mask: &GrayImage) -> Vec<PixelBox> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
        let mut stats: Vec<(u32, PixelBox)> = Vec::new();
        for (x, y, px) in labels.enumerate_pixels() {
            let id = px.0[0] as usize;
            if id == 0 {
                continue;
            }
            if stats.len() < id {
                stats.resize(id, (0, PixelBox::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN)));
            }
            let (area, b) = &mut stats[id - 1];
            *area += 1;
            b.x1 = b.x1.min(x as i32);
            b.y1 = b.y1.min(y as i32);
            b.x2 = b.x2.max(x as i32 + 1);
            b.y2 = b.y2.max(y as i32 + 1);
        }
        stats
            .into_iter()
            .filter(|(area, _)| *area > self.min_area)
            .map(|(_, b)| b)
            .collect()
    }
}

impl DetectionAdapter for ColorSegmenter {
    fn name(&self) -> &str {
        "color-segmenter"
    }

    fn detect(
        &mut self,
        frame: &RgbImage,
        _confidence_threshold: f32,
    ) -> Result<Vec<Detection>, AdapterError> {
        let (w, h) = frame.dimensions();
        let hsv: Vec<[u8; 3]> = frame.pixels().map(|p| to_hsv8(p.0)).collect();

        let mut out = Vec::new();
        for range in &self.ranges {
            let mask = self.mask(&hsv, w, h, range);
            for bbox in self.blobs(&mask) {
                out.push(Detection::new(
                    bbox,
                    ClassLabel::Unknown(range.name.clone()),
                    1.0,
                ));
            }
        }
        tracing::debug!(count = out.len(), "colour segments");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(120, 100, image::Rgb([128, 128, 128]))
    }

    fn paint(img: &mut RgbImage, b: PixelBox, color: [u8; 3]) {
        for y in b.y1..b.y2 {
            for x in b.x1..b.x2 {
                img.put_pixel(x as u32, y as u32, image::Rgb(color));
            }
        }
    }

    #[test]
    fn test_hsv_conversion_scale() {
        assert_eq!(to_hsv8([255, 0, 0]), [0, 255, 255]);
        assert_eq!(to_hsv8([0, 255, 0]), [60, 255, 255]);
        assert_eq!(to_hsv8([0, 0, 255]), [120, 255, 255]);
        assert_eq!(to_hsv8([128, 128, 128])[1], 0);
    }

    #[test]
    fn test_finds_colored_blobs() {
        let mut img = canvas();
        paint(&mut img, PixelBox::new(5, 5, 35, 35), [220, 20, 20]);
        paint(&mut img, PixelBox::new(60, 50, 100, 90), [20, 200, 20]);
        let dets = ColorSegmenter::default().detect(&img, 0.5).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].label, ClassLabel::Unknown("red".into()));
        assert_eq!(dets[0].bbox, PixelBox::new(5, 5, 35, 35));
        assert_eq!(dets[1].label, ClassLabel::Unknown("green".into()));
        assert_eq!(dets[1].bbox, PixelBox::new(60, 50, 100, 90));
    }

    #[test]
    fn test_small_blobs_ignored() {
        let mut img = canvas();
        // 20x25 = 500 pixels, not above the minimum.
        paint(&mut img, PixelBox::new(10, 10, 30, 35), [20, 20, 220]);
        let dets = ColorSegmenter::default().detect(&img, 0.5).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_diagonal_pixels_join_one_blob() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([MASK_ON]));
        mask.put_pixel(1, 1, Luma([MASK_ON]));
        let seg = ColorSegmenter::new(default_ranges(), 1);
        assert_eq!(seg.blobs(&mask), vec![PixelBox::new(0, 0, 2, 2)]);
    }
}
