//! Error taxonomy shared by the decode session, frame converter and playback controller

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening, decoding, converting or seeking a video
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The container could not be opened, has no video stream, or the decoder
    /// (or its hardware device) could not be created
    #[error("Failed to open video {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    /// Packet read, decoder send/receive, or hardware frame transfer failed
    #[error("Decoding failed: {0}")]
    Decode(String),
    /// Seeking back to the start of the stream failed
    #[error("Seek failed: {0}")]
    Seek(String),
    /// No conversion path between the source and destination formats
    #[error("Failed to create frame converter: {0}")]
    ConversionInit(String),
    /// The scaler rejected a frame at conversion time
    #[error("Frame conversion failed: {0}")]
    Conversion(String),
    /// The decoding backend could not be initialized
    #[error("Decoding backend unavailable: {0}")]
    Backend(String),
}

impl PlaybackError {
    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PlaybackError::Open {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
