//! Frame geometry and converted frame representations
//!
//! A [`FrameView`] borrows the converter's packed output buffer and is only
//! valid until the next conversion. [`DecodedFrame`] is the owned copy for
//! callers that need to keep pixels around.

use ffmpeg_next::format::Pixel;
use serde::{Deserialize, Serialize};

/// Bytes per pixel of every presentation layout
pub const BYTES_PER_PIXEL: usize = 4;

/// Fixed 4-byte-per-pixel layout handed to the presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationLayout {
    /// R, G, B, A bytes (matches `Rgba8UnormSrgb` textures)
    #[default]
    Rgba,
    /// B, G, R, A bytes (matches `Bgra8UnormSrgb` swapchains)
    Bgra,
}

impl PresentationLayout {
    /// FFmpeg pixel format for this layout
    pub fn pixel(self) -> Pixel {
        match self {
            PresentationLayout::Rgba => Pixel::RGBA,
            PresentationLayout::Bgra => Pixel::BGRA,
        }
    }
}

impl std::fmt::Display for PresentationLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentationLayout::Rgba => write!(f, "rgba"),
            PresentationLayout::Bgra => write!(f, "bgra"),
        }
    }
}

impl std::str::FromStr for PresentationLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgba" => Ok(PresentationLayout::Rgba),
            "bgra" => Ok(PresentationLayout::Bgra),
            other => Err(format!("unknown output layout '{}', expected rgba or bgra", other)),
        }
    }
}

/// Size and pixel format of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub format: Pixel,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, format: Pixel) -> Self {
        Self { width, height, format }
    }

    /// Whether the geometry describes a non-empty, known-format frame
    pub fn is_usable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.format != Pixel::None
    }
}

/// Borrowed view over a converted frame, ready for upload
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Tightly packed pixel rows, `width * 4` bytes each
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub layout: PresentationLayout,
}

impl<'a> FrameView<'a> {
    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Copy the pixels out so they outlive the next conversion
    pub fn to_owned_frame(&self, frame_index: u64) -> DecodedFrame {
        DecodedFrame::new(self.data.to_vec(), self.width, self.height, self.layout, frame_index)
    }
}

/// A converted frame that owns its pixel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Packed pixel data, 4 bytes/pixel
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Byte order of each pixel
    pub layout: PresentationLayout,
    /// Frame index (0-based, counted by the controller)
    pub frame_index: u64,
}

impl DecodedFrame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PresentationLayout,
        frame_index: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            layout,
            frame_index,
        }
    }

    /// Get the expected data size for frame dimensions (width * height * 4)
    pub fn expected_size(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * BYTES_PER_PIXEL
    }

    /// Check if the frame data has the correct size
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_size(self.width, self.height)
    }

    /// Get the stride (bytes per row)
    pub fn stride(&self) -> usize {
        (self.width as usize) * BYTES_PER_PIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let width = 1920;
        let height = 1080;
        let data = vec![0u8; DecodedFrame::expected_size(width, height)];
        let frame = DecodedFrame::new(data, width, height, PresentationLayout::Rgba, 0);

        assert_eq!(frame.width, 1920);
        assert_eq!(frame.height, 1080);
        assert!(frame.is_valid());
        assert_eq!(frame.stride(), 1920 * 4);
    }

    #[test]
    fn test_expected_size() {
        assert_eq!(DecodedFrame::expected_size(1920, 1080), 1920 * 1080 * 4);
        assert_eq!(DecodedFrame::expected_size(1280, 720), 1280 * 720 * 4);
    }

    #[test]
    fn test_view_to_owned() {
        let pixels = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let view = FrameView {
            data: &pixels,
            width: 2,
            height: 1,
            layout: PresentationLayout::Bgra,
        };
        assert_eq!(view.stride(), 8);

        let owned = view.to_owned_frame(7);
        assert!(owned.is_valid());
        assert_eq!(owned.frame_index, 7);
        assert_eq!(owned.layout, PresentationLayout::Bgra);
        assert_eq!(owned.data, pixels.to_vec());
    }

    #[test]
    fn test_layout_parse_and_pixel() {
        assert_eq!("BGRA".parse::<PresentationLayout>(), Ok(PresentationLayout::Bgra));
        assert!("yuv".parse::<PresentationLayout>().is_err());
        assert_eq!(PresentationLayout::Rgba.pixel(), Pixel::RGBA);
    }

    #[test]
    fn test_geometry_usable() {
        assert!(FrameGeometry::new(4, 4, Pixel::YUV420P).is_usable());
        assert!(!FrameGeometry::new(0, 4, Pixel::YUV420P).is_usable());
        assert!(!FrameGeometry::new(4, 4, Pixel::None).is_usable());
    }
}
