//! lens-io — frame sources and file-backed collaborators for Healthy Lens.
//!
//! Image-sequence input, recorded and colour-segmentation detection adapters,
//! the recommendation store, and the frame loop that ties them to a
//! [`lens_core::FramePipeline`].

pub mod detections;
pub mod recommend;
pub mod segment;
pub mod session;
pub mod source;

pub use detections::JsonDetections;
pub use recommend::{RecommendationError, RecommendationStore};
pub use segment::ColorSegmenter;
pub use session::{Session, SessionOptions, SessionSummary};
pub use source::{Frame, ImageSequence, SourceError};
