//! Immersive Video Library
//!
//! Frame-accurate video playback for projection surfaces: an FFmpeg decode
//! session with optional hardware acceleration, a converter into a fixed
//! RGBA/BGRA upload layout, and a transport controller that paces frames
//! against the host's update loop.

pub mod playback;
pub mod settings;
pub mod source;
pub mod telemetry;
pub mod video;

pub use playback::{
    FfmpegBackend, FramePipeline, FrameSink, LatestFrame, PlaybackBackend, PlaybackController, PlaybackOptions,
    PlaybackState, StateChange, TickOutcome, VideoPipeline,
};
pub use settings::{PlayerSettings, SettingsError};
pub use source::{DirectoryResolver, SourceError, SourceResolver};
pub use video::{
    DecodeOutcome, DecodeSession, DecodedFrame, FrameConverter, FrameGeometry, FrameView, HwAccelKind, PlaybackError,
    PresentationLayout,
};
