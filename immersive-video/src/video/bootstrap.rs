//! One-time FFmpeg initialization
//!
//! Locating the native libraries is the host's job (the dynamic loader or the
//! application bundle); this only registers formats/codecs and quiets FFmpeg's
//! own stderr logging so it does not interleave with `tracing` output.

use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use super::PlaybackError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize the decoding backend. Safe to call any number of times.
pub fn init_backend() -> Result<(), PlaybackError> {
    INIT.get_or_init(|| {
        ffmpeg_next::init().map_err(|e| e.to_string())?;
        ffmpeg_next::util::log::set_level(Level::Error);

        let version = ffmpeg_next::util::version();
        tracing::info!(
            "FFmpeg backend initialized (libavutil {}.{}.{})",
            version >> 16,
            (version >> 8) & 0xff,
            version & 0xff
        );
        Ok(())
    })
    .clone()
    .map_err(PlaybackError::Backend)
}
