//! Video decoding and frame conversion
//!
//! Provides video file decoding using FFmpeg via the `ffmpeg-next` crate, with
//! optional hardware-accelerated decoders. Decoded frames are converted into a
//! fixed 4-byte-per-pixel buffer ready for GPU upload.

pub mod bootstrap;
mod converter;
mod error;
mod frame;
mod hwaccel;
mod session;

pub use bootstrap::init_backend;
pub use converter::FrameConverter;
pub use error::PlaybackError;
pub use frame::{DecodedFrame, FrameGeometry, FrameView, PresentationLayout, BYTES_PER_PIXEL};
pub use hwaccel::HwAccelKind;
pub use session::{nominal_frame_rate, DecodeOutcome, DecodeSession, FALLBACK_FRAME_RATE};

/// Re-exported so callers can name frame formats without depending on `ffmpeg-next`
pub use ffmpeg_next::format::Pixel;
