//! Playback state and transport records

use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Not playing
    #[default]
    Stopped,
    /// Currently playing
    Playing,
    /// Paused (retains position)
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// A transport call that changed the controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub previous: PlaybackState,
    pub current: PlaybackState,
}

impl StateChange {
    /// Record a transition, or `None` if the state did not change
    pub fn between(previous: PlaybackState, current: PlaybackState) -> Option<Self> {
        (previous != current).then_some(Self { previous, current })
    }
}

/// What a single `tick` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing, or no source set
    Idle,
    /// Playing, but the next frame is not due yet
    Waiting,
    /// A frame was handed to the sink
    Presented { frame_index: u64 },
    /// A frame was due but the stream is exhausted (or just looped)
    EndOfStream,
}

impl TickOutcome {
    pub fn presented(&self) -> bool {
        matches!(self, TickOutcome::Presented { .. })
    }
}

/// Controller-facing playback options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackOptions {
    /// Rewind and continue at end of stream
    pub looping: bool,
    /// Enter `Playing` on the first tick
    pub autoplay: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_change_only_on_transition() {
        assert_eq!(StateChange::between(PlaybackState::Playing, PlaybackState::Playing), None);
        assert_eq!(
            StateChange::between(PlaybackState::Stopped, PlaybackState::Playing),
            Some(StateChange {
                previous: PlaybackState::Stopped,
                current: PlaybackState::Playing,
            })
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
        let options = PlaybackOptions::default();
        assert!(!options.looping);
        assert!(!options.autoplay);
    }
}
