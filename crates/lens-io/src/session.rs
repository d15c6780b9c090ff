//! Frame-at-a-time processing loop over an image sequence.

use crate::source::{self, Frame, SourceError};
use lens_core::pipeline::{DetectionAdapter, FramePipeline, FrameReport};
use lens_core::Adjustments;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loop settings, fixed for the whole session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub confidence_threshold: f32,
    /// Stop after this many frames (0 = no limit).
    pub max_frames: usize,
    /// Processed frames are written here under their original file names.
    pub output_dir: Option<PathBuf>,
    pub adjustments: Adjustments,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_frames: 0,
            output_dir: None,
            adjustments: Adjustments::default(),
        }
    }
}

/// Totals for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: usize,
    pub unreadable: usize,
    pub filters_applied: usize,
    pub stopped_early: bool,
}

/// Drives a pipeline over frames. The stop flag is checked once per frame
/// boundary, never in the middle of a frame.
pub struct Session {
    pipeline: FramePipeline,
    options: SessionOptions,
    stop: Arc<AtomicBool>,
}

impl Session {
    pub fn new(pipeline: FramePipeline, options: SessionOptions) -> Self {
        Self {
            pipeline,
            options,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting a stop (e.g. from a Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Process frames until the source runs out, the frame limit is hit, or a
    /// stop is requested. Unreadable frames are logged and skipped; a failed
    /// write is fatal.
    pub fn run<I>(
        &mut self,
        frames: I,
        adapter: &mut dyn DetectionAdapter,
        mut on_frame: impl FnMut(&Frame, &FrameReport),
    ) -> Result<SessionSummary, SourceError>
    where
        I: IntoIterator<Item = Result<Frame, SourceError>>,
    {
        let mut summary = SessionSummary::default();
        for item in frames {
            if self.stop.load(Ordering::Relaxed) {
                tracing::info!(frames = summary.frames, "stop requested");
                summary.stopped_early = true;
                break;
            }
            let mut frame = match item {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable frame");
                    summary.unreadable += 1;
                    continue;
                }
            };

            adapter.begin_frame(&frame.name);
            let report = self.pipeline.run_frame(
                adapter,
                &mut frame.image,
                self.options.confidence_threshold,
                &self.options.adjustments,
            );
            summary.frames += 1;
            summary.filters_applied += report.applied.len();

            if let Some(dir) = &self.options.output_dir {
                source::save_frame(&dir.join(&frame.name), &frame.image)?;
            }
            on_frame(&frame, &report);

            // Checked before pulling the next item so a lazy source never
            // decodes a frame past the limit.
            if self.options.max_frames > 0 && summary.frames >= self.options.max_frames {
                tracing::info!(limit = self.options.max_frames, "frame limit reached");
                summary.stopped_early = true;
                break;
            }
        }

        tracing::info!(
            frames = summary.frames,
            unreadable = summary.unreadable,
            filters = summary.filters_applied,
            "session finished"
        );
        Ok(summary)
    }
}
