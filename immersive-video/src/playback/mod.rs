//! Paced playback
//!
//! [`PlaybackController`] owns a decode pipeline for the current source and
//! hands converted frames to a [`FrameSink`] at the stream's nominal rate.

mod backend;
mod controller;
mod sink;
mod state;

pub use backend::{FfmpegBackend, FramePipeline, PlaybackBackend, VideoPipeline};
pub use controller::{frame_interval, PlaybackController};
pub use sink::{FrameSink, LatestFrame};
pub use state::{PlaybackOptions, PlaybackState, StateChange, TickOutcome};
