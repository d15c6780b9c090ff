use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB colour used for boxes and label banners.
pub type Rgb = [u8; 3];

/// Axis-aligned pixel rectangle. `(x1, y1)` is inclusive, `(x2, y2)` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from float corners as produced by detector heads (truncating, like `int()`).
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Clamp the box to a `width × height` frame. The result may be empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelBox {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        let x1 = self.x1.clamp(0, w);
        let y1 = self.y1.clamp(0, h);
        PixelBox {
            x1,
            y1,
            x2: self.x2.clamp(x1, w),
            y2: self.y2.clamp(y1, h),
        }
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One detection produced by an adapter for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: PixelBox,
    pub label: ClassLabel,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: PixelBox, label: ClassLabel, confidence: f32) -> Self {
        Self {
            bbox,
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Normalise a free-form label ("Open Hand", "instant-noodle") to its snake_case key.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

fn find_by_key<T: Copy>(all: &[T], raw: &str, key: fn(&T) -> &'static str) -> Option<T> {
    let wanted = normalize_key(raw);
    all.iter().copied().find(|v| key(v) == wanted)
}

/// Products recognised by the food detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Apple,
    InstantNoodle,
    Juice,
    Orange,
    Sandwich,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Apple,
        Product::InstantNoodle,
        Product::Juice,
        Product::Orange,
        Product::Sandwich,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Product::Apple => "apple",
            Product::InstantNoodle => "instant_noodle",
            Product::Juice => "juice",
            Product::Orange => "orange",
            Product::Sandwich => "sandwich",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        find_by_key(&Self::ALL, raw, Self::key)
    }
}

/// Dominant emotions reported by the face classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        find_by_key(&Self::ALL, raw, Self::key)
    }
}

/// Hand gestures produced by the landmark decision table in [`crate::gesture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    OpenHand,
    Fist,
    Pointing,
    Victory,
    ThumbsUp,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::OpenHand,
        Gesture::Fist,
        Gesture::Pointing,
        Gesture::Victory,
        Gesture::ThumbsUp,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Gesture::OpenHand => "open_hand",
            Gesture::Fist => "fist",
            Gesture::Pointing => "pointing",
            Gesture::Victory => "victory",
            Gesture::ThumbsUp => "thumbs_up",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Gesture::OpenHand => "Open Hand",
            Gesture::Fist => "Fist",
            Gesture::Pointing => "Pointing",
            Gesture::Victory => "Victory",
            Gesture::ThumbsUp => "Thumbs Up",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        find_by_key(&Self::ALL, raw, Self::key)
    }
}

/// Detector output vocabulary. Labels outside every declared vocabulary are kept
/// as `Unknown` and resolve to the default filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Product(Product),
    Emotion(Emotion),
    Gesture(Gesture),
    Unknown(String),
}

impl ClassLabel {
    /// Parse a raw detector label. Never fails.
    pub fn parse(raw: &str) -> Self {
        if let Some(p) = Product::from_key(raw) {
            ClassLabel::Product(p)
        } else if let Some(e) = Emotion::from_key(raw) {
            ClassLabel::Emotion(e)
        } else if let Some(g) = Gesture::from_key(raw) {
            ClassLabel::Gesture(g)
        } else {
            ClassLabel::Unknown(raw.trim().to_string())
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Product(p) => f.write_str(p.key()),
            ClassLabel::Emotion(e) => f.write_str(e.key()),
            ClassLabel::Gesture(g) => f.write_str(g.key()),
            ClassLabel::Unknown(s) => f.write_str(s),
        }
    }
}

/// Closed set of filters. `None` is the explicit "no filter" sentinel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    #[default]
    None,
    GaussianBlur,
    Smooth,
    Sobel,
    Laplacian,
    TonalShift,
    Brightness,
    Invert,
    Pixelate,
    Threshold,
}

impl FilterName {
    pub const ALL: [FilterName; 10] = [
        FilterName::None,
        FilterName::GaussianBlur,
        FilterName::Smooth,
        FilterName::Sobel,
        FilterName::Laplacian,
        FilterName::TonalShift,
        FilterName::Brightness,
        FilterName::Invert,
        FilterName::Pixelate,
        FilterName::Threshold,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FilterName::None => "none",
            FilterName::GaussianBlur => "gaussian_blur",
            FilterName::Smooth => "smooth",
            FilterName::Sobel => "sobel",
            FilterName::Laplacian => "laplacian",
            FilterName::TonalShift => "tonal_shift",
            FilterName::Brightness => "brightness",
            FilterName::Invert => "invert",
            FilterName::Pixelate => "pixelate",
            FilterName::Threshold => "threshold",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FilterName::None => "No Filter",
            FilterName::GaussianBlur => "Gaussian Blur",
            FilterName::Smooth => "Smooth",
            FilterName::Sobel => "Sobel",
            FilterName::Laplacian => "Laplacian",
            FilterName::TonalShift => "Tonal Shift",
            FilterName::Brightness => "Brightness",
            FilterName::Invert => "Invert",
            FilterName::Pixelate => "Pixelate",
            FilterName::Threshold => "Threshold",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        find_by_key(&Self::ALL, raw, Self::key)
    }

    /// Resolve a filter by key or display name. Unrecognised names give `None`
    /// (the identity filter), never an error.
    pub fn from_name(raw: &str) -> Self {
        Self::from_key(raw).unwrap_or(FilterName::None)
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, FilterName::None)
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_frame_is_unchanged() {
        let b = PixelBox::new(10, 10, 50, 50);
        assert_eq!(b.clamp_to(100, 100), b);
    }

    #[test]
    fn test_clamp_partially_outside() {
        let b = PixelBox::new(-20, 90, 40, 140);
        assert_eq!(b.clamp_to(100, 100), PixelBox::new(0, 90, 40, 100));
    }

    #[test]
    fn test_clamp_fully_outside_is_empty() {
        let b = PixelBox::new(150, 150, 200, 200);
        assert!(b.clamp_to(100, 100).is_empty());
        let b = PixelBox::new(-50, -50, -10, -10);
        assert!(b.clamp_to(100, 100).is_empty());
    }

    #[test]
    fn test_inverted_box_is_empty() {
        let b = PixelBox::new(50, 50, 10, 10);
        assert!(b.is_empty());
        assert!(b.clamp_to(100, 100).is_empty());
    }

    #[test]
    fn test_label_parse_known_vocabularies() {
        assert_eq!(ClassLabel::parse("apple"), ClassLabel::Product(Product::Apple));
        assert_eq!(
            ClassLabel::parse("Instant Noodle"),
            ClassLabel::Product(Product::InstantNoodle)
        );
        assert_eq!(ClassLabel::parse("HAPPY"), ClassLabel::Emotion(Emotion::Happy));
        assert_eq!(ClassLabel::parse("Open Hand"), ClassLabel::Gesture(Gesture::OpenHand));
        assert_eq!(ClassLabel::parse("thumbs-up"), ClassLabel::Gesture(Gesture::ThumbsUp));
    }

    #[test]
    fn test_label_parse_unknown_is_kept() {
        assert_eq!(
            ClassLabel::parse(" red "),
            ClassLabel::Unknown("red".to_string())
        );
    }

    #[test]
    fn test_filter_from_name_fallback() {
        assert_eq!(FilterName::from_name("Gaussian Blur"), FilterName::GaussianBlur);
        assert_eq!(FilterName::from_name("sobel"), FilterName::Sobel);
        assert_eq!(FilterName::from_name("sepia"), FilterName::None);
    }

    #[test]
    fn test_detection_confidence_clamped() {
        let d = Detection::new(PixelBox::new(0, 0, 1, 1), ClassLabel::parse("apple"), 1.7);
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn test_label_display_uses_keys() {
        assert_eq!(ClassLabel::Gesture(Gesture::OpenHand).to_string(), "open_hand");
        assert_eq!(ClassLabel::Product(Product::InstantNoodle).to_string(), "instant_noodle");
        assert_eq!(ClassLabel::parse("Open Hand").to_string(), "open_hand");
        assert_eq!(ClassLabel::parse(" mystery ").to_string(), "mystery");
    }
}
