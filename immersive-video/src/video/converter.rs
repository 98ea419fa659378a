//! Frame converter: decoded frame → packed 4-byte-per-pixel buffer
//!
//! Uses a single software-scaling context with the BILINEAR filter for the
//! whole session; throughput matters more than filter quality for texture
//! streaming. The destination frame and packed buffer are allocated once.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::scaling;

use super::session::DecodeSession;
use super::{DecodedFrame, FrameGeometry, FrameView, PlaybackError, PresentationLayout, BYTES_PER_PIXEL};

const SCALER_FLAGS: scaling::Flags = scaling::Flags::BILINEAR;

/// Converts decoded frames into a reusable presentation buffer
///
/// Field order is drop order.
pub struct FrameConverter {
    /// Packed output rows, `width * height * 4` bytes
    buffer: Vec<u8>,
    /// Scaler output (may carry row padding)
    destination: ffmpeg::frame::Video,
    /// Scaling context
    scaler: scaling::Context,
    source: FrameGeometry,
    width: u32,
    height: u32,
    layout: PresentationLayout,
}

impl FrameConverter {
    /// Build a converter from `source` geometry to `width`x`height` in `layout`
    pub fn new(
        source: FrameGeometry,
        width: u32,
        height: u32,
        layout: PresentationLayout,
    ) -> Result<Self, PlaybackError> {
        if !source.is_usable() {
            return Err(PlaybackError::ConversionInit(format!(
                "unusable source {}x{} ({:?})",
                source.width, source.height, source.format
            )));
        }
        if width == 0 || height == 0 {
            return Err(PlaybackError::ConversionInit(format!(
                "unusable destination size {}x{}",
                width, height
            )));
        }

        let scaler = Self::build_scaler(source, width, height, layout)?;
        let destination = ffmpeg::frame::Video::new(layout.pixel(), width, height);
        let buffer = vec![0u8; DecodedFrame::expected_size(width, height)];

        tracing::debug!(
            "FrameConverter: {}x{} {:?} -> {}x{} {}",
            source.width,
            source.height,
            source.format,
            width,
            height,
            layout
        );

        Ok(Self {
            buffer,
            destination,
            scaler,
            source,
            width,
            height,
            layout,
        })
    }

    /// Build a same-size converter for a session's negotiated geometry
    pub fn for_session(session: &DecodeSession, layout: PresentationLayout) -> Result<Self, PlaybackError> {
        let geometry = session.geometry();
        Self::new(geometry, geometry.width, geometry.height, layout)
    }

    fn build_scaler(
        source: FrameGeometry,
        width: u32,
        height: u32,
        layout: PresentationLayout,
    ) -> Result<scaling::Context, PlaybackError> {
        scaling::Context::get(
            source.format,
            source.width,
            source.height,
            layout.pixel(),
            width,
            height,
            SCALER_FLAGS,
        )
        .map_err(|e| {
            PlaybackError::ConversionInit(format!(
                "no conversion path {:?} -> {}: {}",
                source.format, layout, e
            ))
        })
    }

    /// Convert `frame` into the internal buffer
    ///
    /// The returned view is overwritten by the next call; copy it out with
    /// [`FrameView::to_owned_frame`] to keep it.
    pub fn convert(&mut self, frame: &ffmpeg::frame::Video) -> Result<FrameView<'_>, PlaybackError> {
        if frame.width() != self.source.width || frame.height() != self.source.height {
            return Err(PlaybackError::Conversion(format!(
                "frame is {}x{}, converter expects {}x{}",
                frame.width(),
                frame.height(),
                self.source.width,
                self.source.height
            )));
        }

        // Hardware transfers may pick a different host format than advertised.
        // Only the scaling context is rebuilt; the buffers stay.
        if frame.format() != self.source.format {
            tracing::debug!(
                "FrameConverter: source format changed {:?} -> {:?}",
                self.source.format,
                frame.format()
            );
            let source = FrameGeometry::new(self.source.width, self.source.height, frame.format());
            self.scaler = Self::build_scaler(source, self.width, self.height, self.layout)?;
            self.source = source;
        }

        self.scaler
            .run(frame, &mut self.destination)
            .map_err(|e| PlaybackError::Conversion(e.to_string()))?;

        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let stride = self.destination.stride(0);
        let data = self.destination.data(0);

        if stride == row_bytes {
            self.buffer.copy_from_slice(&data[..self.buffer.len()]);
        } else {
            for (y, row) in self.buffer.chunks_exact_mut(row_bytes).enumerate() {
                let start = y * stride;
                row.copy_from_slice(&data[start..start + row_bytes]);
            }
        }

        Ok(FrameView {
            data: &self.buffer,
            width: self.width,
            height: self.height,
            layout: self.layout,
        })
    }

    /// Release the buffers and scaling context
    pub fn dispose(self) {
        drop(self);
    }

    /// Output (width, height)
    pub fn output_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> PresentationLayout {
        self.layout
    }

    /// Geometry the scaler currently expects
    pub fn source(&self) -> FrameGeometry {
        self.source
    }

    /// Size of the packed output buffer in bytes
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::format::Pixel;

    fn rgba_frame(width: u32, height: u32, seed: u8) -> ffmpeg::frame::Video {
        let mut frame = ffmpeg::frame::Video::new(Pixel::RGBA, width, height);
        let stride = frame.stride(0);
        let data = frame.data_mut(0);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let i = y * stride + x * 4;
                data[i] = seed;
                data[i + 1] = x as u8;
                data[i + 2] = y as u8;
                data[i + 3] = 255;
            }
        }
        frame
    }

    fn yuv_frame(width: u32, height: u32, luma: u8) -> ffmpeg::frame::Video {
        let mut frame = ffmpeg::frame::Video::new(Pixel::YUV420P, width, height);
        for plane in 0..3 {
            let value = if plane == 0 { luma } else { 128 };
            frame.data_mut(plane).fill(value);
        }
        frame
    }

    #[test]
    fn test_rejects_unusable_source() {
        let err = FrameConverter::new(FrameGeometry::new(16, 16, Pixel::None), 16, 16, PresentationLayout::Rgba)
            .err()
            .expect("Pixel::None has no conversion path");
        assert!(matches!(err, PlaybackError::ConversionInit(_)));

        let err = FrameConverter::new(FrameGeometry::new(16, 16, Pixel::YUV420P), 0, 16, PresentationLayout::Rgba)
            .err()
            .expect("zero-sized destination");
        assert!(matches!(err, PlaybackError::ConversionInit(_)));
    }

    #[test]
    fn test_buffer_identity_is_stable() {
        crate::video::init_backend().unwrap();
        let geometry = FrameGeometry::new(32, 16, Pixel::YUV420P);
        let mut converter = FrameConverter::new(geometry, 32, 16, PresentationLayout::Rgba).unwrap();

        let first = yuv_frame(32, 16, 16);
        let second = yuv_frame(32, 16, 235);

        let (ptr_a, len_a, dark) = {
            let view = converter.convert(&first).unwrap();
            (view.data.as_ptr(), view.data.len(), view.data[0])
        };
        let (ptr_b, len_b, bright) = {
            let view = converter.convert(&second).unwrap();
            (view.data.as_ptr(), view.data.len(), view.data[0])
        };

        assert_eq!(ptr_a, ptr_b);
        assert_eq!(len_a, 32 * 16 * 4);
        assert_eq!(len_a, len_b);
        assert!(bright > dark);
    }

    #[test]
    fn test_rgba_to_bgra_swaps_channels() {
        crate::video::init_backend().unwrap();
        let geometry = FrameGeometry::new(8, 4, Pixel::RGBA);
        let mut converter = FrameConverter::new(geometry, 8, 4, PresentationLayout::Bgra).unwrap();

        let frame = rgba_frame(8, 4, 200);
        let view = converter.convert(&frame).unwrap();

        assert_eq!(view.width, 8);
        assert_eq!(view.height, 4);
        assert_eq!(view.layout, PresentationLayout::Bgra);
        // Pixel (3, 2): R=200, G=3, B=2 -> B, G, R, A
        let i = 2 * view.stride() + 3 * 4;
        assert_eq!(&view.data[i..i + 4], &[2, 3, 200, 255]);
    }

    #[test]
    fn test_size_mismatch_is_conversion_error() {
        crate::video::init_backend().unwrap();
        let geometry = FrameGeometry::new(8, 8, Pixel::RGBA);
        let mut converter = FrameConverter::new(geometry, 8, 8, PresentationLayout::Rgba).unwrap();

        let err = converter.convert(&rgba_frame(4, 4, 0)).err().expect("size mismatch");
        assert!(matches!(err, PlaybackError::Conversion(_)));
        assert_eq!(converter.buffer_len(), 8 * 8 * 4);
    }

    #[test]
    fn test_format_change_rebuilds_scaler_only() {
        crate::video::init_backend().unwrap();
        let geometry = FrameGeometry::new(16, 8, Pixel::NV12);
        let mut converter = FrameConverter::new(geometry, 16, 8, PresentationLayout::Rgba).unwrap();

        let ptr_before = converter.convert(&yuv_frame(16, 8, 100)).unwrap().data.as_ptr();
        assert_eq!(converter.source().format, Pixel::YUV420P);
        let ptr_after = converter.convert(&yuv_frame(16, 8, 120)).unwrap().data.as_ptr();
        assert_eq!(ptr_before, ptr_after);
    }
}
