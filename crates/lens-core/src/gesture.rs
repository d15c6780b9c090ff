//! Hand-landmark gesture classification.
//!
//! A hand is reduced to five finger-extension flags, which are matched against
//! an ordered decision table. Rules are pairwise exclusive over all 32 finger
//! states, so evaluation order never changes the outcome.

use crate::types::{ClassLabel, Detection, Gesture, PixelBox};

// --- Landmark indices (21-point hand model) ---
pub const LANDMARK_COUNT: usize = 21;
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Normalised landmark position; `(0, 0)` is the top-left of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One tracked hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; LANDMARK_COUNT],
    pub confidence: f32,
}

/// Which fingers are extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub fn from_landmarks(hand: &HandLandmarks) -> Self {
        let p = &hand.points;
        // A finger is extended when its tip sits above its PIP joint.
        let extended = |tip: usize, pip: usize| p[tip].y < p[pip].y;
        Self {
            thumb: p[THUMB_TIP].y < p[INDEX_MCP].y && p[THUMB_TIP].y < p[WRIST].y,
            index: extended(INDEX_TIP, INDEX_PIP),
            middle: extended(MIDDLE_TIP, MIDDLE_PIP),
            ring: extended(RING_TIP, RING_PIP),
            pinky: extended(PINKY_TIP, PINKY_PIP),
        }
    }

    /// Every possible combination, thumb as the lowest bit.
    pub fn all() -> impl Iterator<Item = FingerState> {
        (0u8..32).map(|bits| FingerState {
            thumb: bits & 0b00001 != 0,
            index: bits & 0b00010 != 0,
            middle: bits & 0b00100 != 0,
            ring: bits & 0b01000 != 0,
            pinky: bits & 0b10000 != 0,
        })
    }
}

/// One row of the decision table. `None` means "either".
#[derive(Debug, Clone, Copy)]
pub struct GestureRule {
    pub gesture: Gesture,
    pub thumb: Option<bool>,
    pub index: Option<bool>,
    pub middle: Option<bool>,
    pub ring: Option<bool>,
    pub pinky: Option<bool>,
}

impl GestureRule {
    pub fn matches(&self, state: &FingerState) -> bool {
        let ok = |want: Option<bool>, have: bool| want.map_or(true, |w| w == have);
        ok(self.thumb, state.thumb)
            && ok(self.index, state.index)
            && ok(self.middle, state.middle)
            && ok(self.ring, state.ring)
            && ok(self.pinky, state.pinky)
    }
}

const fn rule(
    gesture: Gesture,
    thumb: Option<bool>,
    index: bool,
    middle: bool,
    ring: bool,
    pinky: bool,
) -> GestureRule {
    GestureRule {
        gesture,
        thumb,
        index: Some(index),
        middle: Some(middle),
        ring: Some(ring),
        pinky: Some(pinky),
    }
}

/// Ordered decision table. States not covered by any row have no gesture.
pub const GESTURE_RULES: [GestureRule; 5] = [
    rule(Gesture::OpenHand, None, true, true, true, true),
    rule(Gesture::Victory, None, true, true, false, false),
    rule(Gesture::Pointing, None, true, false, false, false),
    rule(Gesture::ThumbsUp, Some(true), false, false, false, false),
    rule(Gesture::Fist, Some(false), false, false, false, false),
];

/// First matching rule wins; rules never overlap.
pub fn classify(state: &FingerState) -> Option<Gesture> {
    GESTURE_RULES
        .iter()
        .find(|r| r.matches(state))
        .map(|r| r.gesture)
}

pub fn classify_hand(hand: &HandLandmarks) -> Option<Gesture> {
    let state = FingerState::from_landmarks(hand);
    let gesture = classify(&state);
    tracing::trace!(?state, ?gesture, "classified hand");
    gesture
}

/// Pixel bounding box of all landmarks in a `width × height` frame.
pub fn hand_bbox(hand: &HandLandmarks, width: u32, height: u32) -> PixelBox {
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in &hand.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let (w, h) = (width as f32, height as f32);
    PixelBox::from_corners(min_x * w, min_y * h, max_x * w, max_y * h)
}

/// Classify a hand and wrap it as a detection, or `None` for an unrecognised pose.
pub fn hand_detection(hand: &HandLandmarks, width: u32, height: u32) -> Option<Detection> {
    let gesture = classify_hand(hand)?;
    Some(Detection::new(
        hand_bbox(hand, width, height),
        ClassLabel::Gesture(gesture),
        hand.confidence,
    ))
}
