//! Decode session: one demuxer + decoder pair over a local video file
//!
//! Produces raw decoded frames on demand. Hardware-decoded frames are copied
//! back to host memory before they are handed out, so callers always receive
//! a frame the software scaler can read.

use std::collections::HashMap;
use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;

use super::bootstrap::init_backend;
use super::hwaccel::{HwAccelKind, HwDevice};
use super::{FrameGeometry, PlaybackError};

/// Frame rate used when the container does not report a usable one
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Result of a single [`DecodeSession::decode_next_frame`] call
pub enum DecodeOutcome<'a> {
    /// A decoded frame in host memory, valid until the next decode call
    Frame(&'a ffmpeg::frame::Video),
    /// The stream is exhausted (and, when looping, has been rewound)
    EndOfStream,
}

impl DecodeOutcome<'_> {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, DecodeOutcome::EndOfStream)
    }
}

/// Open demuxer/decoder state for one video file
///
/// Field order is drop order: frames go before the codec context, the codec
/// context before the device it references, and the container last.
pub struct DecodeSession {
    /// Frame the decoder writes into
    frame: ffmpeg::frame::Video,
    /// Host-memory copy of a hardware frame
    host_frame: ffmpeg::frame::Video,
    /// Video decoder
    decoder: ffmpeg::decoder::Video,
    /// Hardware device context (kept alive for the decoder lifetime)
    hw_device: Option<HwDevice>,
    /// The input format context
    input: ffmpeg::format::context::Input,
    /// Index of the selected video stream
    stream_index: usize,
    /// Negotiated frame geometry (host-side pixel format)
    geometry: FrameGeometry,
    /// Frame rate (fps)
    frame_rate: f64,
    /// Video duration in seconds
    duration: f64,
    /// Codec name
    codec_name: String,
    /// Container has no more packets; EOF has been sent to the decoder
    input_exhausted: bool,
    /// Decoder has been fully drained
    end_of_stream: bool,
}

impl DecodeSession {
    /// Open a video file, optionally attaching a hardware device of `hw_accel` kind
    ///
    /// A failed hardware device is an error; retrying with [`HwAccelKind::None`]
    /// is up to the caller.
    pub fn open<P: AsRef<Path>>(path: P, hw_accel: HwAccelKind) -> Result<Self, PlaybackError> {
        init_backend()?;

        let path = path.as_ref();

        let input = ffmpeg::format::input(&path)
            .map_err(|e| PlaybackError::open(path, format!("could not open container: {}", e)))?;

        // FFmpeg's own stream scoring (codec support, resolution, disposition)
        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| PlaybackError::open(path, "No video stream found in file"))?;

        let stream_index = video_stream.index();
        let frame_rate = nominal_frame_rate(video_stream.avg_frame_rate());

        let time_base = video_stream.time_base();
        let duration = if video_stream.duration() > 0 && time_base.denominator() != 0 {
            video_stream.duration() as f64 * f64::from(time_base)
        } else if input.duration() > 0 {
            input.duration() as f64 / f64::from(ffi::AV_TIME_BASE)
        } else {
            0.0
        };

        let parameters = video_stream.parameters();
        let codec = ffmpeg::decoder::find(parameters.id())
            .ok_or_else(|| PlaybackError::open(path, format!("No decoder for codec {:?}", parameters.id())))?;
        let codec_name = codec.name().to_string();

        let mut context = ffmpeg::codec::context::Context::new_with_codec(codec);

        // Device goes on the context before parameters are bound and the codec opened
        let hw_device = if hw_accel.is_hardware() {
            let device = HwDevice::create(hw_accel).map_err(|e| PlaybackError::open(path, e))?;
            device.attach(&mut context).map_err(|e| PlaybackError::open(path, e))?;
            Some(device)
        } else {
            None
        };

        context
            .set_parameters(parameters)
            .map_err(|e| PlaybackError::open(path, format!("Failed to bind codec parameters: {}", e)))?;

        let decoder = context
            .decoder()
            .video()
            .map_err(|e| PlaybackError::open(path, format!("Failed to create decoder: {}", e)))?;

        let width = decoder.width();
        let height = decoder.height();
        let format = match &hw_device {
            Some(device) => device.kind().host_pixel_format(),
            None => decoder.format(),
        };
        let geometry = FrameGeometry::new(width, height, format);
        if !geometry.is_usable() {
            return Err(PlaybackError::open(
                path,
                format!("Unusable stream geometry {}x{} ({:?})", width, height, format),
            ));
        }

        tracing::info!(
            "Opened video: {}x{} @ {:.2}fps, duration: {:.2}s, codec: {}, hwaccel: {}",
            width,
            height,
            frame_rate,
            duration,
            codec_name,
            hw_accel
        );

        Ok(Self {
            frame: ffmpeg::frame::Video::empty(),
            host_frame: ffmpeg::frame::Video::empty(),
            decoder,
            hw_device,
            input,
            stream_index,
            geometry,
            frame_rate,
            duration,
            codec_name,
            input_exhausted: false,
            end_of_stream: false,
        })
    }

    /// Decode the next frame of the selected stream
    ///
    /// On exhaustion returns [`DecodeOutcome::EndOfStream`]; with `looping` the
    /// session is also rewound so the following call starts again from the
    /// beginning.
    pub fn decode_next_frame(&mut self, looping: bool) -> Result<DecodeOutcome<'_>, PlaybackError> {
        if self.end_of_stream {
            return self.finish_stream(looping);
        }

        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => return self.take_frame(),
                Err(ffmpeg::Error::Other {
                    errno: ffmpeg::error::EAGAIN,
                }) => {
                    // Need more input
                    if self.input_exhausted {
                        return Err(PlaybackError::Decode(
                            "decoder requested input after end of file".to_string(),
                        ));
                    }
                }
                Err(ffmpeg::Error::Eof) => {
                    self.end_of_stream = true;
                    return self.finish_stream(looping);
                }
                Err(e) => return Err(PlaybackError::Decode(e.to_string())),
            }

            self.feed_packet()?;
        }
    }

    /// Read packets until one for the video stream has been sent, or signal EOF
    fn feed_packet(&mut self) -> Result<(), PlaybackError> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    return self
                        .decoder
                        .send_packet(&packet)
                        .map_err(|e| PlaybackError::Decode(format!("send packet: {}", e)));
                }
                Err(ffmpeg::Error::Eof) => {
                    self.input_exhausted = true;
                    return self
                        .decoder
                        .send_eof()
                        .map_err(|e| PlaybackError::Decode(format!("send eof: {}", e)));
                }
                Err(e) => return Err(PlaybackError::Decode(format!("read packet: {}", e))),
            }
        }
    }

    fn take_frame(&mut self) -> Result<DecodeOutcome<'_>, PlaybackError> {
        let needs_transfer = self
            .hw_device
            .as_ref()
            .is_some_and(|device| self.frame.format() == device.kind().device_pixel_format());

        if !needs_transfer {
            tracing::trace!("Decoded frame pts={:?}", self.frame.pts());
            return Ok(DecodeOutcome::Frame(&self.frame));
        }

        // SAFETY: both frames are owned by this session; the host frame is
        // unreferenced first so the transfer allocates fresh buffers.
        let ret = unsafe {
            ffi::av_frame_unref(self.host_frame.as_mut_ptr());
            let ret = ffi::av_hwframe_transfer_data(self.host_frame.as_mut_ptr(), self.frame.as_ptr(), 0);
            if ret >= 0 {
                ffi::av_frame_copy_props(self.host_frame.as_mut_ptr(), self.frame.as_ptr())
            } else {
                ret
            }
        };
        if ret < 0 {
            return Err(PlaybackError::Decode(format!(
                "hardware frame transfer failed: {}",
                ffmpeg::Error::from(ret)
            )));
        }

        tracing::trace!("Transferred hardware frame pts={:?}", self.host_frame.pts());
        Ok(DecodeOutcome::Frame(&self.host_frame))
    }

    fn finish_stream(&mut self, looping: bool) -> Result<DecodeOutcome<'_>, PlaybackError> {
        if looping {
            tracing::debug!("DecodeSession: end of stream, looping");
            self.reset()?;
        }
        Ok(DecodeOutcome::EndOfStream)
    }

    /// Seek back to the start of the file
    ///
    /// The seek is backward-biased, so some containers land slightly before the
    /// first frame.
    pub fn reset(&mut self) -> Result<(), PlaybackError> {
        self.input
            .seek(0, ..0)
            .map_err(|e| PlaybackError::Seek(e.to_string()))?;
        self.decoder.flush();
        self.input_exhausted = false;
        self.end_of_stream = false;
        tracing::debug!("DecodeSession: reset to start");
        Ok(())
    }

    /// Release all native decode resources
    pub fn close(self) {
        tracing::debug!("DecodeSession: closing {}", self.codec_name);
        drop(self);
    }

    /// Container-level metadata tags
    pub fn metadata(&self) -> HashMap<String, String> {
        self.input
            .metadata()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Negotiated (width, height)
    pub fn frame_size(&self) -> (u32, u32) {
        (self.geometry.width, self.geometry.height)
    }

    /// Host-side pixel format of decoded frames
    pub fn pixel_format(&self) -> Pixel {
        self.geometry.format
    }

    /// Negotiated geometry
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Nominal frame rate (fps)
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Duration in seconds, 0.0 if unknown
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Hardware acceleration in use
    pub fn hw_accel(&self) -> HwAccelKind {
        self.hw_device.as_ref().map_or(HwAccelKind::None, HwDevice::kind)
    }

    /// Whether the session has run out of frames (non-looping)
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }
}

/// Reduce a container frame rate to fps, falling back to [`FALLBACK_FRAME_RATE`]
pub fn nominal_frame_rate(rate: ffmpeg::Rational) -> f64 {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        return FALLBACK_FRAME_RATE;
    }
    let fps = f64::from(rate.numerator()) / f64::from(rate.denominator());
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FRAME_RATE
    }
}
