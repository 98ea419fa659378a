//! Decode backends for the playback controller
//!
//! The controller only needs "open a path, then pull converted frames", so it
//! is written against [`PlaybackBackend`] / [`FramePipeline`]. The FFmpeg
//! implementation pairs a [`DecodeSession`] with a [`FrameConverter`].

use std::collections::HashMap;
use std::path::Path;

use crate::video::{
    DecodeOutcome, DecodeSession, FrameConverter, FrameView, HwAccelKind, PlaybackError, PresentationLayout,
};

/// Opens frame pipelines for a source path
pub trait PlaybackBackend {
    type Pipeline: FramePipeline;

    /// Open a pipeline for `path`
    fn open(&mut self, path: &Path) -> Result<Self::Pipeline, PlaybackError>;
}

/// An open decode+convert pipeline
pub trait FramePipeline {
    /// Output (width, height)
    fn frame_size(&self) -> (u32, u32);

    /// Nominal frame rate (fps)
    fn frame_rate(&self) -> f64;

    /// Decode and convert the next frame; `None` at end of stream
    fn next_frame(&mut self, looping: bool) -> Result<Option<FrameView<'_>>, PlaybackError>;

    /// Rewind to the start of the stream
    fn reset(&mut self) -> Result<(), PlaybackError>;

    /// Container metadata tags
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// FFmpeg-backed pipelines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FfmpegBackend {
    pub hw_accel: HwAccelKind,
    pub layout: PresentationLayout,
}

impl FfmpegBackend {
    pub fn new(hw_accel: HwAccelKind, layout: PresentationLayout) -> Self {
        Self { hw_accel, layout }
    }
}

impl PlaybackBackend for FfmpegBackend {
    type Pipeline = VideoPipeline;

    fn open(&mut self, path: &Path) -> Result<VideoPipeline, PlaybackError> {
        VideoPipeline::open(path, self.hw_accel, self.layout)
    }
}

/// A decode session and the converter built for its geometry
///
/// Field order is drop order: the converter is released before the session.
pub struct VideoPipeline {
    converter: FrameConverter,
    session: DecodeSession,
}

impl VideoPipeline {
    pub fn open(path: &Path, hw_accel: HwAccelKind, layout: PresentationLayout) -> Result<Self, PlaybackError> {
        let session = DecodeSession::open(path, hw_accel)?;
        let converter = FrameConverter::for_session(&session, layout)?;
        Ok(Self { converter, session })
    }

    pub fn session(&self) -> &DecodeSession {
        &self.session
    }

    pub fn converter(&self) -> &FrameConverter {
        &self.converter
    }
}

impl FramePipeline for VideoPipeline {
    fn frame_size(&self) -> (u32, u32) {
        self.converter.output_size()
    }

    fn frame_rate(&self) -> f64 {
        self.session.frame_rate()
    }

    fn next_frame(&mut self, looping: bool) -> Result<Option<FrameView<'_>>, PlaybackError> {
        match self.session.decode_next_frame(looping)? {
            DecodeOutcome::Frame(frame) => self.converter.convert(frame).map(Some),
            DecodeOutcome::EndOfStream => Ok(None),
        }
    }

    fn reset(&mut self) -> Result<(), PlaybackError> {
        self.session.reset()
    }

    fn metadata(&self) -> HashMap<String, String> {
        self.session.metadata()
    }
}
