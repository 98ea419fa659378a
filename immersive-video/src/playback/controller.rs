//! Paced playback controller
//!
//! Drives a decode pipeline from a host tick. Each call to [`PlaybackController::tick`]
//! adds the elapsed host time to an internal clock; once the clock covers one
//! frame interval a single frame is decoded, converted and handed to the sink.
//! Whole intervals that piled up while the host was slow are dropped, so the
//! controller never tries to catch up by emitting bursts.
//!
//! The decode session and converter are opened lazily on the first `Playing`
//! tick after a source is set, and are discarded when the source changes or
//! a frame cannot be produced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::backend::{FfmpegBackend, FramePipeline, PlaybackBackend};
use super::sink::FrameSink;
use super::state::{PlaybackOptions, PlaybackState, StateChange, TickOutcome};
use crate::settings::PlayerSettings;
use crate::telemetry::{DecodeProfiler, FrameStats};
use crate::video::{PlaybackError, FALLBACK_FRAME_RATE};

/// Time between frames for a nominal rate; invalid rates use the fallback
pub fn frame_interval(fps: f64) -> Duration {
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { FALLBACK_FRAME_RATE };
    Duration::from_secs_f64(1.0 / fps).max(Duration::from_nanos(1))
}

/// Transport state machine and frame pacing for one video source
pub struct PlaybackController<B: PlaybackBackend = FfmpegBackend> {
    backend: B,
    /// Open decode+convert pair, if any
    pipeline: Option<B::Pipeline>,
    source: Option<PathBuf>,
    state: PlaybackState,
    looping: bool,
    autoplay_pending: bool,
    /// Host time accumulated since the last emitted frame
    clock: Duration,
    target_interval: Option<Duration>,
    /// Frames emitted since open, stop or the last loop
    frame_counter: u64,
    profiler: DecodeProfiler,
}

impl PlaybackController<FfmpegBackend> {
    /// Build a controller from persisted player settings
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        let backend = FfmpegBackend::new(settings.hw_accel, settings.output_layout);
        let mut controller = Self::new(backend, settings.playback_options());
        if let Some(source) = settings.source_path() {
            controller.set_source(source);
        }
        controller
    }
}

impl<B: PlaybackBackend> PlaybackController<B> {
    pub fn new(backend: B, options: PlaybackOptions) -> Self {
        Self {
            backend,
            pipeline: None,
            source: None,
            state: PlaybackState::Stopped,
            looping: options.looping,
            autoplay_pending: options.autoplay,
            clock: Duration::ZERO,
            target_interval: None,
            frame_counter: 0,
            profiler: DecodeProfiler::new(),
        }
    }

    // ========== Transport ==========

    /// Set the video to play, discarding any open session
    ///
    /// Always leaves the controller `Stopped`; the new source is opened on
    /// the next `Playing` tick.
    pub fn set_source(&mut self, path: impl Into<PathBuf>) -> Option<StateChange> {
        let path = path.into();
        tracing::debug!("PlaybackController: source set to {}", path.display());
        self.source = Some(path);
        self.reset_to_stopped()
    }

    /// Forget the current source
    pub fn clear_source(&mut self) -> Option<StateChange> {
        self.source = None;
        self.reset_to_stopped()
    }

    /// Start or resume playback
    pub fn play(&mut self) -> Option<StateChange> {
        self.autoplay_pending = false;
        self.transition(PlaybackState::Playing)
    }

    /// Pause playback, keeping position
    pub fn pause(&mut self) -> Option<StateChange> {
        self.autoplay_pending = false;
        if self.state != PlaybackState::Playing {
            return None;
        }
        self.transition(PlaybackState::Paused)
    }

    /// Toggle between playing and paused
    pub fn toggle_pause(&mut self) -> Option<StateChange> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Stop playback and rewind to the first frame
    ///
    /// The open session is kept so the next `play` resumes from frame 0
    /// without reopening. If the rewind fails the session is discarded, the
    /// state is still `Stopped` and the seek error is returned.
    pub fn stop(&mut self) -> Result<Option<StateChange>, PlaybackError> {
        self.autoplay_pending = false;
        if self.state == PlaybackState::Stopped {
            return Ok(None);
        }
        let change = self.transition(PlaybackState::Stopped);
        self.clock = Duration::ZERO;
        self.frame_counter = 0;

        if let Some(pipeline) = self.pipeline.as_mut() {
            if let Err(e) = pipeline.reset() {
                tracing::warn!("PlaybackController: rewind on stop failed: {}", e);
                self.discard_pipeline();
                return Err(e);
            }
        }
        Ok(change)
    }

    /// Stop and release the decode session (reopened on the next play)
    pub fn release(&mut self) -> Option<StateChange> {
        self.autoplay_pending = false;
        self.reset_to_stopped()
    }

    // ========== Tick ==========

    /// Advance the playback clock by `elapsed` and emit at most one frame
    ///
    /// Open failures and decode failures are returned to the caller. An open
    /// failure leaves no session, so the next `Playing` tick retries; a decode
    /// failure also stops playback.
    pub fn tick<S>(&mut self, elapsed: Duration, sink: &mut S) -> Result<TickOutcome, PlaybackError>
    where
        S: FrameSink + ?Sized,
    {
        // Any explicit transport call before the first tick cancels autoplay
        if std::mem::take(&mut self.autoplay_pending) {
            tracing::debug!("PlaybackController: autoplay");
            self.play();
        }

        if self.state != PlaybackState::Playing {
            return Ok(TickOutcome::Idle);
        }

        if self.pipeline.is_none() && !self.open_pipeline()? {
            return Ok(TickOutcome::Idle);
        }

        let Some(interval) = self.target_interval else {
            return Ok(TickOutcome::Idle);
        };

        self.clock = self.clock.saturating_add(elapsed);
        if self.clock < interval {
            return Ok(TickOutcome::Waiting);
        }
        // Whole intervals are dropped; only the remainder carries over
        let residual = self.clock.as_nanos() % interval.as_nanos();
        self.clock = Duration::new((residual / 1_000_000_000) as u64, (residual % 1_000_000_000) as u32);

        self.emit_frame(sink)
    }

    /// Open the pipeline for the current source; `false` if there is none
    fn open_pipeline(&mut self) -> Result<bool, PlaybackError> {
        let Some(path) = self.source.as_deref() else {
            return Ok(false);
        };

        let pipeline = self.backend.open(path).map_err(|e| {
            tracing::error!("PlaybackController: {}", e);
            e
        })?;

        let (width, height) = pipeline.frame_size();
        let fps = pipeline.frame_rate();
        tracing::info!(
            "PlaybackController: opened {} ({}x{} @ {:.3} fps)",
            path.display(),
            width,
            height,
            fps
        );

        self.target_interval = Some(frame_interval(fps));
        self.clock = Duration::ZERO;
        self.frame_counter = 0;
        self.profiler.clear();
        self.pipeline = Some(pipeline);
        Ok(true)
    }

    fn emit_frame<S>(&mut self, sink: &mut S) -> Result<TickOutcome, PlaybackError>
    where
        S: FrameSink + ?Sized,
    {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        let started = Instant::now();
        let result = match pipeline.next_frame(self.looping) {
            Ok(Some(frame)) => {
                let frame_index = self.frame_counter;
                sink.present(frame, frame_index);
                self.frame_counter += 1;
                self.profiler.record(started.elapsed());
                Ok(TickOutcome::Presented { frame_index })
            }
            Ok(None) => {
                if self.looping {
                    tracing::debug!("PlaybackController: looped after {} frames", self.frame_counter);
                    self.frame_counter = 0;
                }
                Ok(TickOutcome::EndOfStream)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::error!("PlaybackController: {}", e);
            self.discard_pipeline();
            self.state = PlaybackState::Stopped;
        }
        result
    }

    fn transition(&mut self, next: PlaybackState) -> Option<StateChange> {
        let change = StateChange::between(self.state, next);
        if let Some(change) = change {
            tracing::debug!("PlaybackController: {} -> {}", change.previous, change.current);
            self.state = next;
        }
        change
    }

    fn reset_to_stopped(&mut self) -> Option<StateChange> {
        self.discard_pipeline();
        self.clock = Duration::ZERO;
        self.frame_counter = 0;
        self.transition(PlaybackState::Stopped)
    }

    fn discard_pipeline(&mut self) {
        if self.pipeline.take().is_some() {
            tracing::debug!("PlaybackController: session released");
        }
        self.target_interval = None;
    }

    // ========== Accessors ==========

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Whether a decode session is currently open
    pub fn has_session(&self) -> bool {
        self.pipeline.is_some()
    }

    /// The open pipeline, if any
    pub fn pipeline(&self) -> Option<&B::Pipeline> {
        self.pipeline.as_ref()
    }

    /// Output frame size of the open session
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.pipeline.as_ref().map(|p| p.frame_size())
    }

    /// Output width, 0 if no session is open
    pub fn video_width(&self) -> u32 {
        self.frame_size().map(|(w, _)| w).unwrap_or(0)
    }

    /// Output height, 0 if no session is open
    pub fn video_height(&self) -> u32 {
        self.frame_size().map(|(_, h)| h).unwrap_or(0)
    }

    /// Nominal frame rate of the open session
    pub fn frame_rate(&self) -> Option<f64> {
        self.pipeline.as_ref().map(|p| p.frame_rate())
    }

    pub fn target_interval(&self) -> Option<Duration> {
        self.target_interval
    }

    /// Host time accumulated toward the next frame
    pub fn pending_time(&self) -> Duration {
        self.clock
    }

    /// Index the next emitted frame will carry
    pub fn frame_index(&self) -> u64 {
        self.frame_counter
    }

    /// Container metadata of the open session
    pub fn metadata(&self) -> Option<HashMap<String, String>> {
        self.pipeline.as_ref().map(|p| p.metadata())
    }

    pub fn decode_stats(&self) -> FrameStats {
        self.profiler.stats()
    }

    /// Effective emission rate
    pub fn emitted_fps(&self) -> f64 {
        self.profiler.fps()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{FrameView, PresentationLayout};
    use std::cell::Cell;
    use std::rc::Rc;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[derive(Default)]
    struct Counters {
        opens: Cell<usize>,
        resets: Cell<usize>,
    }

    /// Backend producing `frames` 2x1 frames whose bytes all equal the frame position
    struct ScriptedBackend {
        frames: usize,
        fps: f64,
        fail_decode_at: Option<usize>,
        fail_reset: bool,
        counters: Rc<Counters>,
    }

    impl ScriptedBackend {
        fn new(frames: usize) -> (Self, Rc<Counters>) {
            let counters = Rc::new(Counters::default());
            let backend = Self {
                frames,
                fps: 10.0,
                fail_decode_at: None,
                fail_reset: false,
                counters: counters.clone(),
            };
            (backend, counters)
        }
    }

    struct ScriptedPipeline {
        frames: usize,
        fps: f64,
        position: usize,
        fail_decode_at: Option<usize>,
        fail_reset: bool,
        buffer: Vec<u8>,
        counters: Rc<Counters>,
    }

    impl PlaybackBackend for ScriptedBackend {
        type Pipeline = ScriptedPipeline;

        fn open(&mut self, path: &Path) -> Result<ScriptedPipeline, PlaybackError> {
            self.counters.opens.set(self.counters.opens.get() + 1);
            if path.ends_with("missing.mp4") {
                return Err(PlaybackError::open(path, "No such file or directory"));
            }
            Ok(ScriptedPipeline {
                frames: self.frames,
                fps: self.fps,
                position: 0,
                fail_decode_at: self.fail_decode_at,
                fail_reset: self.fail_reset,
                buffer: vec![0; 8],
                counters: self.counters.clone(),
            })
        }
    }

    impl FramePipeline for ScriptedPipeline {
        fn frame_size(&self) -> (u32, u32) {
            (2, 1)
        }

        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn next_frame(&mut self, looping: bool) -> Result<Option<FrameView<'_>>, PlaybackError> {
            if self.fail_decode_at == Some(self.position) {
                return Err(PlaybackError::Decode("corrupt packet".into()));
            }
            if self.position >= self.frames {
                if looping {
                    self.position = 0;
                }
                return Ok(None);
            }
            self.buffer.fill(self.position as u8);
            self.position += 1;
            Ok(Some(FrameView {
                data: &self.buffer,
                width: 2,
                height: 1,
                layout: PresentationLayout::Rgba,
            }))
        }

        fn reset(&mut self) -> Result<(), PlaybackError> {
            self.counters.resets.set(self.counters.resets.get() + 1);
            if self.fail_reset {
                return Err(PlaybackError::Seek("not seekable".into()));
            }
            self.position = 0;
            Ok(())
        }
    }

    /// Records (first byte, frame index) for every presented frame
    #[derive(Default)]
    struct Recorder {
        frames: Vec<(u8, u64)>,
    }

    impl FrameSink for Recorder {
        fn present(&mut self, frame: FrameView<'_>, frame_index: u64) {
            assert_eq!(frame.data.len(), 8);
            self.frames.push((frame.data[0], frame_index));
        }
    }

    fn playing(frames: usize, looping: bool) -> (PlaybackController<ScriptedBackend>, Rc<Counters>) {
        let (backend, counters) = ScriptedBackend::new(frames);
        let mut controller = PlaybackController::new(
            backend,
            PlaybackOptions {
                looping,
                autoplay: false,
            },
        );
        controller.set_source("clip.mkv");
        controller.play();
        (controller, counters)
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(10.0), INTERVAL);
        assert_eq!(frame_interval(0.0), frame_interval(FALLBACK_FRAME_RATE));
        assert_eq!(frame_interval(f64::NAN), frame_interval(FALLBACK_FRAME_RATE));
        assert!(frame_interval(f64::INFINITY) > Duration::ZERO);
    }

    #[test]
    fn test_idle_without_play_or_source() {
        let (backend, counters) = ScriptedBackend::new(3);
        let mut controller = PlaybackController::new(backend, PlaybackOptions::default());
        let mut sink = Recorder::default();

        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
        controller.play();
        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);

        controller.set_source("clip.mkv");
        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
        assert_eq!(counters.opens.get(), 0);
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_first_tick_opens_lazily() {
        let (mut controller, counters) = playing(3, false);
        assert!(!controller.has_session());
        assert_eq!(controller.frame_size(), None);

        let mut sink = Recorder::default();
        let outcome = controller.tick(INTERVAL, &mut sink).unwrap();
        assert_eq!(outcome, TickOutcome::Presented { frame_index: 0 });
        assert_eq!(counters.opens.get(), 1);
        assert_eq!(controller.frame_size(), Some((2, 1)));
        assert_eq!(controller.video_width(), 2);
        assert_eq!(controller.target_interval(), Some(INTERVAL));
    }

    #[test]
    fn test_short_ticks_accumulate() {
        let (mut controller, _) = playing(3, false);
        let mut sink = Recorder::default();

        assert_eq!(controller.tick(Duration::from_millis(40), &mut sink).unwrap(), TickOutcome::Waiting);
        assert_eq!(controller.tick(Duration::from_millis(40), &mut sink).unwrap(), TickOutcome::Waiting);
        assert!(controller.tick(Duration::from_millis(40), &mut sink).unwrap().presented());
        assert_eq!(controller.pending_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_exact_multiple_emits_once_with_zero_residual() {
        let (mut controller, _) = playing(5, false);
        let mut sink = Recorder::default();

        let outcome = controller.tick(INTERVAL * 3, &mut sink).unwrap();
        assert_eq!(outcome, TickOutcome::Presented { frame_index: 0 });
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(controller.pending_time(), Duration::ZERO);

        let almost = INTERVAL - Duration::from_nanos(1);
        assert_eq!(controller.tick(almost, &mut sink).unwrap(), TickOutcome::Waiting);
        assert!(controller.tick(Duration::from_nanos(1), &mut sink).unwrap().presented());
        assert_eq!(sink.frames, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_plays_through_then_holds_at_end() {
        let (mut controller, _) = playing(10, false);
        let mut sink = Recorder::default();

        for _ in 0..10 {
            assert!(controller.tick(INTERVAL, &mut sink).unwrap().presented());
        }
        let expected: Vec<(u8, u64)> = (0..10).map(|i| (i as u8, i as u64)).collect();
        assert_eq!(sink.frames, expected);

        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::EndOfStream);
        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::EndOfStream);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(sink.frames.len(), 10);
    }

    #[test]
    fn test_looping_wraps_to_first_frame() {
        let (mut controller, _) = playing(3, true);
        let mut sink = Recorder::default();

        for _ in 0..3 {
            controller.tick(INTERVAL, &mut sink).unwrap();
        }
        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::EndOfStream);
        assert_eq!(controller.frame_index(), 0);
        assert_eq!(
            controller.tick(INTERVAL, &mut sink).unwrap(),
            TickOutcome::Presented { frame_index: 0 }
        );
        assert_eq!(sink.frames.last(), Some(&(0, 0)));
    }

    #[test]
    fn test_pause_holds_position() {
        let (mut controller, counters) = playing(5, false);
        let mut sink = Recorder::default();

        controller.tick(INTERVAL, &mut sink).unwrap();
        let change = controller.pause().unwrap();
        assert_eq!(change.previous, PlaybackState::Playing);
        assert_eq!(change.current, PlaybackState::Paused);

        assert_eq!(controller.tick(INTERVAL * 5, &mut sink).unwrap(), TickOutcome::Idle);
        assert_eq!(sink.frames.len(), 1);

        controller.play();
        controller.tick(INTERVAL, &mut sink).unwrap();
        assert_eq!(sink.frames, vec![(0, 0), (1, 1)]);
        assert_eq!(counters.opens.get(), 1);
    }

    #[test]
    fn test_stop_rewinds_and_keeps_session() {
        let (mut controller, counters) = playing(5, false);
        let mut sink = Recorder::default();

        for _ in 0..3 {
            controller.tick(INTERVAL, &mut sink).unwrap();
        }
        controller.tick(Duration::from_millis(50), &mut sink).unwrap();

        let change = controller.stop().unwrap().unwrap();
        assert_eq!(change.current, PlaybackState::Stopped);
        assert_eq!(controller.frame_index(), 0);
        assert_eq!(controller.pending_time(), Duration::ZERO);
        assert_eq!(counters.resets.get(), 1);
        assert!(controller.has_session());

        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
        controller.play();
        assert_eq!(
            controller.tick(INTERVAL, &mut sink).unwrap(),
            TickOutcome::Presented { frame_index: 0 }
        );
        assert_eq!(sink.frames.last(), Some(&(0, 0)));
        assert_eq!(counters.opens.get(), 1);
    }

    #[test]
    fn test_stop_with_failed_rewind_discards_session() {
        let (mut backend, counters) = ScriptedBackend::new(5);
        backend.fail_reset = true;
        let mut controller = PlaybackController::new(backend, PlaybackOptions::default());
        controller.set_source("clip.mkv");
        controller.play();
        controller.tick(INTERVAL, &mut Recorder::default()).unwrap();

        assert!(matches!(controller.stop(), Err(PlaybackError::Seek(_))));
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(!controller.has_session());
        assert_eq!(counters.resets.get(), 1);
    }

    #[test]
    fn test_transport_reports_only_transitions() {
        let (backend, _) = ScriptedBackend::new(1);
        let mut controller = PlaybackController::new(backend, PlaybackOptions::default());

        assert!(controller.pause().is_none());
        assert!(controller.stop().unwrap().is_none());
        assert!(controller.play().is_some());
        assert!(controller.play().is_none());
        assert_eq!(controller.toggle_pause().map(|c| c.current), Some(PlaybackState::Paused));
        assert_eq!(controller.toggle_pause().map(|c| c.current), Some(PlaybackState::Playing));
        assert!(controller.stop().unwrap().is_some());
    }

    #[test]
    fn test_set_source_discards_session() {
        let (mut controller, counters) = playing(5, false);
        let mut sink = Recorder::default();
        controller.tick(INTERVAL, &mut sink).unwrap();
        controller.tick(INTERVAL, &mut sink).unwrap();

        let change = controller.set_source("other.mkv").unwrap();
        assert_eq!(change.previous, PlaybackState::Playing);
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(!controller.has_session());
        assert_eq!(controller.target_interval(), None);
        assert_eq!(controller.source(), Some(Path::new("other.mkv")));

        controller.play();
        assert_eq!(
            controller.tick(INTERVAL, &mut sink).unwrap(),
            TickOutcome::Presented { frame_index: 0 }
        );
        assert_eq!(counters.opens.get(), 2);

        assert!(controller.clear_source().is_some());
        assert_eq!(controller.source(), None);
        assert!(!controller.has_session());
    }

    #[test]
    fn test_open_failure_retried_on_next_tick() {
        let (backend, counters) = ScriptedBackend::new(3);
        let mut controller = PlaybackController::new(backend, PlaybackOptions::default());
        let mut sink = Recorder::default();
        controller.set_source("/nowhere/missing.mp4");
        controller.play();

        assert!(matches!(controller.tick(INTERVAL, &mut sink), Err(PlaybackError::Open { .. })));
        assert!(!controller.has_session());
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert!(controller.tick(INTERVAL, &mut sink).is_err());
        assert_eq!(counters.opens.get(), 2);

        controller.set_source("clip.mkv");
        controller.play();
        assert!(controller.tick(INTERVAL, &mut sink).unwrap().presented());
    }

    #[test]
    fn test_decode_error_stops_playback() {
        let (mut backend, _) = ScriptedBackend::new(5);
        backend.fail_decode_at = Some(2);
        let mut controller = PlaybackController::new(backend, PlaybackOptions::default());
        let mut sink = Recorder::default();
        controller.set_source("clip.mkv");
        controller.play();

        controller.tick(INTERVAL, &mut sink).unwrap();
        controller.tick(INTERVAL, &mut sink).unwrap();
        assert!(matches!(controller.tick(INTERVAL, &mut sink), Err(PlaybackError::Decode(_))));
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(!controller.has_session());
        assert_eq!(sink.frames.len(), 2);
    }

    #[test]
    fn test_autoplay_applies_once() {
        let (backend, _) = ScriptedBackend::new(3);
        let mut controller = PlaybackController::new(
            backend,
            PlaybackOptions {
                looping: false,
                autoplay: true,
            },
        );
        controller.set_source("clip.mkv");
        let mut sink = Recorder::default();

        assert!(controller.tick(INTERVAL, &mut sink).unwrap().presented());
        controller.stop().unwrap();
        assert_eq!(controller.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn test_explicit_transport_cancels_autoplay() {
        let autoplay = PlaybackOptions {
            looping: false,
            autoplay: true,
        };

        let (backend, counters) = ScriptedBackend::new(3);
        let mut paused = PlaybackController::new(backend, autoplay);
        paused.set_source("clip.mkv");
        paused.play();
        paused.pause();
        let mut sink = Recorder::default();
        assert_eq!(paused.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
        assert_eq!(paused.state(), PlaybackState::Paused);

        let (backend, _) = ScriptedBackend::new(3);
        let mut stopped = PlaybackController::new(backend, autoplay);
        stopped.set_source("clip.mkv");
        assert!(stopped.stop().unwrap().is_none());
        assert_eq!(stopped.tick(INTERVAL, &mut sink).unwrap(), TickOutcome::Idle);
        assert_eq!(stopped.state(), PlaybackState::Stopped);

        assert!(sink.frames.is_empty());
        assert_eq!(counters.opens.get(), 0);
    }

    #[test]
    fn test_huge_elapsed_emits_one_frame() {
        let (mut controller, _) = playing(5, false);
        let mut sink = Recorder::default();

        assert!(controller.tick(INTERVAL * 1_000_000 + Duration::from_millis(30), &mut sink).unwrap().presented());
        assert_eq!(controller.pending_time(), Duration::from_millis(30));

        assert!(controller.tick(Duration::MAX, &mut sink).unwrap().presented());
        assert!(controller.pending_time() < INTERVAL);
        assert_eq!(sink.frames, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_closure_sink_and_stats() {
        let (mut controller, _) = playing(3, false);
        let mut indices = Vec::new();
        let mut sink = |_frame: FrameView<'_>, index: u64| indices.push(index);

        controller.tick(INTERVAL, &mut sink).unwrap();
        controller.tick(INTERVAL, &mut sink).unwrap();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(controller.decode_stats().sample_count, 2);
        assert_eq!(controller.metadata(), Some(HashMap::new()));
    }
}
