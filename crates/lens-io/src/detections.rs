//! Detection adapter that replays detections recorded in a JSON file.
//!
//! ```json
//! {
//!   "frame_0001.png": [
//!     { "box": [10, 10, 50, 50], "label": "apple", "confidence": 0.9 },
//!     { "hand": [[0.5, 0.9], ...21 points], "confidence": 0.8 }
//!   ],
//!   "*": [ ... detections added to every frame ... ]
//! }
//! ```
//!
//! `hand` records carry normalised landmarks and are classified into gestures.

use lens_core::gesture::{self, HandLandmarks, Landmark, LANDMARK_COUNT};
use lens_core::pipeline::{AdapterError, DetectionAdapter};
use lens_core::{ClassLabel, Detection, PixelBox};
use image::RgbImage;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Key whose records apply to every frame.
pub const ALL_FRAMES: &str = "*";

fn default_confidence() -> f32 {
    1.0
}

/// One recorded detection.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
    #[serde(rename = "box", default)]
    pub bbox: Option<[f32; 4]>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub hand: Option<Vec<[f32; 2]>>,
}

impl DetectionRecord {
    /// Convert to a detection in a `width × height` frame. Hand records with an
    /// unrecognised pose yield `Ok(None)`.
    pub fn to_detection(&self, width: u32, height: u32) -> Result<Option<Detection>, AdapterError> {
        if let Some(points) = &self.hand {
            let points: [[f32; 2]; LANDMARK_COUNT] =
                points.as_slice().try_into().map_err(|_| {
                    AdapterError::InvalidData(format!(
                        "hand record has {} landmarks, expected {LANDMARK_COUNT}",
                        points.len()
                    ))
                })?;
            let hand = HandLandmarks {
                points: points.map(|[x, y]| Landmark::new(x, y)),
                confidence: self.confidence,
            };
            return Ok(gesture::hand_detection(&hand, width, height));
        }

        let (Some([x1, y1, x2, y2]), Some(label)) = (self.bbox, self.label.as_deref()) else {
            return Err(AdapterError::InvalidData(
                "record needs either `hand` or both `box` and `label`".into(),
            ));
        };
        Ok(Some(Detection::new(
            PixelBox::from_corners(x1, y1, x2, y2),
            ClassLabel::parse(label),
            self.confidence,
        )))
    }
}

/// Replays per-frame detections from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct JsonDetections {
    frames: HashMap<String, Vec<DetectionRecord>>,
    current: Option<String>,
}

impl JsonDetections {
    pub fn from_json_str(src: &str) -> Result<Self, AdapterError> {
        let frames: HashMap<String, Vec<DetectionRecord>> =
            serde_json::from_str(src).map_err(|e| AdapterError::InvalidData(e.to_string()))?;
        Ok(Self {
            frames,
            current: None,
        })
    }

    pub fn load(path: &Path) -> Result<Self, AdapterError> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::Unavailable(format!("{}: {e}", path.display())))?;
        let adapter = Self::from_json_str(&src)?;
        tracing::info!(
            path = %path.display(),
            frames = adapter.frames.len(),
            "loaded recorded detections"
        );
        Ok(adapter)
    }

    fn records(&self) -> impl Iterator<Item = &DetectionRecord> {
        let named = self
            .current
            .as_deref()
            .and_then(|name| self.frames.get(name))
            .into_iter()
            .flatten();
        let shared = self.frames.get(ALL_FRAMES).into_iter().flatten();
        named.chain(shared)
    }
}

impl DetectionAdapter for JsonDetections {
    fn name(&self) -> &str {
        "json"
    }

    fn begin_frame(&mut self, frame_name: &str) {
        self.current = Some(frame_name.to_string());
    }

    fn detect(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, AdapterError> {
        let (w, h) = frame.dimensions();
        let mut out = Vec::new();
        for record in self.records() {
            if let Some(det) = record.to_detection(w, h)? {
                if det.confidence >= confidence_threshold {
                    out.push(det);
                }
            }
        }
        tracing::debug!(frame = ?self.current, count = out.len(), "replayed detections");
        Ok(out)
    }
}
