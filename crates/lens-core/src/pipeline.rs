//! Per-frame processing: detections → filters → composited frame.

use crate::compositor::{self, BoxStyle, Damage};
use crate::filters::{self, Adjustments};
use crate::mapper::Mapper;
use crate::region;
use crate::tables::LensTables;
use crate::types::{ClassLabel, Detection, FilterName, Gesture, PixelBox};
use image::RgbImage;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Frames between timing summaries in the log.
const TIMING_LOG_INTERVAL: u64 = 300;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("detection failed: {0}")]
    Failed(String),
    #[error("bad detection data: {0}")]
    InvalidData(String),
}

/// Source of detections for a frame (object detector, face/hand model, ...).
pub trait DetectionAdapter {
    fn name(&self) -> &str;

    /// Called before `detect` with the name of the frame about to be processed.
    fn begin_frame(&mut self, _frame_name: &str) {}

    /// Detections for `frame` with confidence at or above `confidence_threshold`.
    fn detect(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, AdapterError>;
}

/// A detection that received a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFilter {
    pub label: String,
    pub filter: FilterName,
    /// Clamped box the filter was applied to.
    pub rect: PixelBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f32>,
}

/// A detection that was left alone, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDetection {
    pub label: String,
    pub bbox: PixelBox,
    pub reason: &'static str,
}

/// Whole-frame filter driven by the last gesture in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureFilter {
    pub gesture: Gesture,
    pub filter: FilterName,
}

/// What happened to one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub index: u64,
    pub gesture: Option<GestureFilter>,
    pub applied: Vec<AppliedFilter>,
    pub skipped: Vec<SkippedDetection>,
    #[serde(skip)]
    pub damage: Vec<Damage>,
}

/// Stateless apart from frame counters; tables are fixed at construction.
pub struct FramePipeline {
    mapper: Mapper,
    frames: u64,
    busy: Duration,
}

impl FramePipeline {
    pub fn new(tables: LensTables) -> Self {
        Self {
            mapper: Mapper::new(tables),
            frames: 0,
            busy: Duration::ZERO,
        }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Ask `adapter` for detections and process the frame. An adapter failure
    /// counts as zero detections; the frame is still processed and returned.
    pub fn run_frame(
        &mut self,
        adapter: &mut dyn DetectionAdapter,
        frame: &mut RgbImage,
        confidence_threshold: f32,
        adjustments: &Adjustments,
    ) -> FrameReport {
        let detections = match adapter.detect(frame, confidence_threshold) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    adapter = adapter.name(),
                    error = %e,
                    "detection failed; continuing with no detections"
                );
                Vec::new()
            }
        };
        self.process(frame, &detections, adjustments)
    }

    /// Filter and annotate `frame` in place.
    ///
    /// The last gesture detection (if any) selects a whole-frame filter, applied
    /// first. Every other detection is then extracted, filtered, and composited in
    /// detection order. `adjustments` are applied to product regions before their
    /// mapped filter.
    pub fn process(
        &mut self,
        frame: &mut RgbImage,
        detections: &[Detection],
        adjustments: &Adjustments,
    ) -> FrameReport {
        let started = Instant::now();
        let params = self.mapper.tables().params;
        let text_color = self.mapper.text_color();
        let mut report = FrameReport {
            index: self.frames,
            ..FrameReport::default()
        };

        let gesture = detections.iter().rev().find_map(|d| match d.label {
            ClassLabel::Gesture(g) => Some(g),
            _ => None,
        });
        if let Some(g) = gesture {
            let filter = self.mapper.map_label(&ClassLabel::Gesture(g));
            if !filter.is_identity() {
                *frame = filters::apply(frame, filter, &params);
            }
            report.gesture = Some(GestureFilter { gesture: g, filter });
        }

        for det in detections {
            if matches!(det.label, ClassLabel::Gesture(_)) {
                continue;
            }
            let Some(roi) = region::extract(frame, &det.bbox) else {
                tracing::debug!(
                    label = %det.label,
                    bbox = %det.bbox,
                    "detection outside frame; skipped"
                );
                report.skipped.push(SkippedDetection {
                    label: det.label.to_string(),
                    bbox: det.bbox,
                    reason: "empty region",
                });
                continue;
            };

            let filter = self.mapper.map_label(&det.label);
            let is_product = matches!(det.label, ClassLabel::Product(_));
            let source = if is_product && !adjustments.is_neutral() {
                adjustments.apply(&roi.pixels)
            } else {
                roi.pixels
            };
            let filtered = filters::apply(&source, filter, &params);

            let style = BoxStyle {
                color: self.mapper.color_for(&det.label, filter),
                text_color,
            };
            let text = format!("{} {:.2}", det.label, det.confidence);
            let damage = compositor::composite(frame, &roi.rect, &filtered, &text, &style);

            let health_score = match det.label {
                ClassLabel::Product(p) => self.mapper.health_score(p),
                _ => None,
            };
            report.applied.push(AppliedFilter {
                label: det.label.to_string(),
                filter,
                rect: roi.rect,
                health_score,
            });
            report.damage.push(damage);
        }

        if let Some(g) = report.gesture {
            let lines = vec![
                format!("Gesture: {}", g.gesture.display_name()),
                format!("Filter: {}", g.filter),
            ];
            if let Some(area) = compositor::draw_status(frame, &lines, text_color) {
                report.damage.push(Damage {
                    rect: area,
                    banner: None,
                });
            }
        }

        self.record_timing(started.elapsed());
        report
    }

    fn record_timing(&mut self, elapsed: Duration) {
        self.frames += 1;
        self.busy += elapsed;
        if self.frames % TIMING_LOG_INTERVAL == 0 {
            let avg_ms = self.busy.as_secs_f64() * 1000.0 / TIMING_LOG_INTERVAL as f64;
            tracing::info!(frames = self.frames, avg_ms, "frame pipeline timing");
            self.busy = Duration::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::builtin_tables;
    use crate::types::Product;

    fn textured(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x * 17 % 256) as u8, (y * 23 % 256) as u8, ((x ^ y) * 5 % 256) as u8])
        })
    }

    fn det(bbox: PixelBox, label: &str, confidence: f32) -> Detection {
        Detection::new(bbox, ClassLabel::parse(label), confidence)
    }

    fn pipeline() -> FramePipeline {
        FramePipeline::new(builtin_tables().clone())
    }

    struct FailingAdapter;

    impl DetectionAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&mut self, _: &RgbImage, _: f32) -> Result<Vec<Detection>, AdapterError> {
            Err(AdapterError::Failed("model crashed".into()))
        }
    }

    #[test]
    fn test_end_to_end_apple_and_sandwich() {
        let original = textured(120, 120);
        let mut frame = original.clone();
        let apple = PixelBox::new(10, 10, 50, 50);
        let sandwich = PixelBox::new(60, 60, 100, 100);
        let detections = vec![det(apple, "apple", 0.9), det(sandwich, "sandwich", 0.5)];

        let mut p = pipeline();
        let report = p.process(&mut frame, &detections, &Adjustments::default());

        assert!(report.skipped.is_empty());
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.applied[0].filter, FilterName::GaussianBlur);
        assert_eq!(report.applied[0].rect, apple);
        assert_eq!(report.applied[0].health_score, Some(90.0));
        assert_eq!(report.applied[1].filter, FilterName::Smooth);
        assert_eq!(report.applied[1].rect, sandwich);

        // Box outlines at the original coordinates, in the product colours.
        let tables = builtin_tables();
        assert_eq!(frame.get_pixel(10, 10).0, tables.product_colors[&Product::Apple]);
        assert_eq!(frame.get_pixel(49, 49).0, tables.product_colors[&Product::Apple]);
        assert_eq!(frame.get_pixel(60, 60).0, tables.product_colors[&Product::Sandwich]);
        assert_eq!(frame.get_pixel(99, 99).0, tables.product_colors[&Product::Sandwich]);

        // Interiors carry the filtered pixels.
        let params = tables.params;
        let blurred = filters::apply(
            &region::extract(&original, &apple).unwrap().pixels,
            FilterName::GaussianBlur,
            &params,
        );
        let smoothed = filters::apply(
            &region::extract(&original, &sandwich).unwrap().pixels,
            FilterName::Smooth,
            &params,
        );
        assert_eq!(frame.get_pixel(30, 40).0, blurred.get_pixel(20, 30).0);
        assert_eq!(frame.get_pixel(80, 90).0, smoothed.get_pixel(20, 30).0);

        // Nothing outside the boxes and their banners changed.
        for (x, y, p) in frame.enumerate_pixels() {
            if !report.damage.iter().any(|d| d.contains(x as i32, y as i32)) {
                assert_eq!(p, original.get_pixel(x, y), "pixel ({x}, {y}) changed");
            }
        }
    }

    #[test]
    fn test_box_outside_frame_leaves_frame_untouched() {
        let original = textured(64, 64);
        let mut frame = original.clone();
        let report = pipeline().process(
            &mut frame,
            &[det(PixelBox::new(100, 100, 150, 150), "apple", 0.8)],
            &Adjustments::default(),
        );
        assert_eq!(frame, original);
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_unknown_label_gets_identity_filter() {
        let original = textured(64, 64);
        let mut frame = original.clone();
        let report = pipeline().process(
            &mut frame,
            &[det(PixelBox::new(20, 20, 40, 40), "red", 0.7)],
            &Adjustments::default(),
        );
        assert_eq!(report.applied[0].filter, FilterName::None);
        // Interior (inside the outline) is unchanged.
        assert_eq!(frame.get_pixel(30, 30), original.get_pixel(30, 30));
    }

    #[test]
    fn test_gesture_filters_whole_frame() {
        let mut frame = textured(200, 120);
        let gesture = det(PixelBox::new(0, 0, 10, 10), "fist", 0.9);
        let report = pipeline().process(&mut frame, &[gesture], &Adjustments::default());
        assert_eq!(
            report.gesture,
            Some(GestureFilter {
                gesture: Gesture::Fist,
                filter: FilterName::Sobel
            })
        );
        assert!(report.applied.is_empty());
        // The far corner is clear of the status text.
        let expected = filters::sobel(&textured(200, 120));
        assert_eq!(frame.get_pixel(199, 119), expected.get_pixel(199, 119));
    }

    #[test]
    fn test_last_gesture_wins() {
        let mut frame = textured(50, 50);
        let dets = [
            det(PixelBox::new(0, 0, 5, 5), "fist", 0.9),
            det(PixelBox::new(0, 0, 5, 5), "victory", 0.9),
        ];
        let report = pipeline().process(&mut frame, &dets, &Adjustments::default());
        assert_eq!(report.gesture.unwrap().gesture, Gesture::Victory);
        assert_eq!(report.gesture.unwrap().filter, FilterName::Smooth);
    }

    #[test]
    fn test_adapter_failure_means_no_detections() {
        let original = textured(32, 32);
        let mut frame = original.clone();
        let mut p = pipeline();
        let report = p.run_frame(&mut FailingAdapter, &mut frame, 0.5, &Adjustments::default());
        assert_eq!(frame, original);
        assert!(report.applied.is_empty());
        assert_eq!(p.frames_processed(), 1);
    }

    #[test]
    fn test_adjustments_only_touch_products() {
        let original = textured(64, 64);
        let bbox = PixelBox::new(10, 10, 40, 40);
        let dark = Adjustments::new(0, 0, 0);

        let mut emotion = original.clone();
        let mut p = FramePipeline::new(LensTables::passthrough());
        p.process(&mut emotion, &[det(bbox, "neutral", 0.9)], &dark);
        assert_eq!(emotion.get_pixel(25, 25), original.get_pixel(25, 25));

        let mut product = original.clone();
        p.process(&mut product, &[det(bbox, "apple", 0.9)], &dark);
        assert_eq!(product.get_pixel(25, 25).0, [0, 0, 0]);
    }
}
