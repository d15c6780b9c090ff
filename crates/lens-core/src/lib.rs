//! lens-core — label-driven image filters for the Healthy Lens pipeline.
//!
//! Detections from an external model are mapped to filters through immutable,
//! versioned tables; each detection's region is filtered and composited back
//! into the frame with a box and label.

pub mod compositor;
pub mod filters;
pub mod font;
pub mod gesture;
pub mod mapper;
pub mod pipeline;
pub mod region;
pub mod tables;
pub mod types;

pub use filters::{Adjustments, FilterParams};
pub use mapper::Mapper;
pub use pipeline::{AdapterError, DetectionAdapter, FramePipeline, FrameReport};
pub use tables::{builtin_tables, LensTables, TableError};
pub use types::{ClassLabel, Detection, Emotion, FilterName, Gesture, PixelBox, Product, Rgb};
