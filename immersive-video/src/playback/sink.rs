//! Presentation sinks
//!
//! The controller never touches GPU resources; it hands each converted frame
//! to a [`FrameSink`], which uploads it (or copies it somewhere) before the
//! next conversion overwrites the buffer.

use crate::video::{DecodedFrame, FrameView};

/// Receives converted frames from the playback controller
pub trait FrameSink {
    /// Called once per emitted frame; `frame` is only valid during the call
    fn present(&mut self, frame: FrameView<'_>, frame_index: u64);
}

impl<F> FrameSink for F
where
    F: FnMut(FrameView<'_>, u64),
{
    fn present(&mut self, frame: FrameView<'_>, frame_index: u64) {
        self(frame, frame_index)
    }
}

/// Sink that keeps a copy of the most recent frame for later pickup
///
/// Reuses its allocation when consecutive frames have the same size.
#[derive(Debug, Default)]
pub struct LatestFrame {
    frame: Option<DecodedFrame>,
    fresh: bool,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the latest frame if one arrived since the last call
    pub fn take(&mut self) -> Option<&DecodedFrame> {
        if !std::mem::take(&mut self.fresh) {
            return None;
        }
        self.frame.as_ref()
    }

    /// Most recent frame, fresh or not
    pub fn latest(&self) -> Option<&DecodedFrame> {
        self.frame.as_ref()
    }

    /// Whether a frame arrived since the last `take`
    pub fn has_new_frame(&self) -> bool {
        self.fresh
    }
}

impl FrameSink for LatestFrame {
    fn present(&mut self, frame: FrameView<'_>, frame_index: u64) {
        match &mut self.frame {
            Some(existing) if existing.data.len() == frame.data.len() => {
                existing.data.copy_from_slice(frame.data);
                existing.width = frame.width;
                existing.height = frame.height;
                existing.layout = frame.layout;
                existing.frame_index = frame_index;
            }
            slot => *slot = Some(frame.to_owned_frame(frame_index)),
        }
        self.fresh = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PresentationLayout;

    fn view(data: &[u8]) -> FrameView<'_> {
        FrameView {
            data,
            width: 1,
            height: 1,
            layout: PresentationLayout::Rgba,
        }
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |frame: FrameView<'_>, index: u64| seen.push((frame.data[0], index));
        sink.present(view(&[9, 0, 0, 255]), 3);
        assert_eq!(seen, vec![(9, 3)]);
    }

    #[test]
    fn test_latest_frame_pickup() {
        let mut latest = LatestFrame::new();
        assert!(latest.take().is_none());

        latest.present(view(&[1, 2, 3, 4]), 0);
        latest.present(view(&[5, 6, 7, 8]), 1);
        assert!(latest.has_new_frame());

        let frame = latest.take().cloned().unwrap();
        assert_eq!(frame.data, vec![5, 6, 7, 8]);
        assert_eq!(frame.frame_index, 1);
        assert!(latest.take().is_none());
        assert!(latest.latest().is_some());
    }
}
