//! Resource-access interface for the background track.
//!
//! The continuity protocol never touches an output device directly; it talks
//! to an [`AudioElement`], which mirrors the handful of media-element
//! operations it needs.

#[cfg(feature = "audio")]
pub mod rodio_track;

#[cfg(feature = "audio")]
pub use rodio_track::RodioTrack;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlaybackError {
    /// The host refuses to start sound until the user interacts with it.
    #[error("playback blocked until the next user gesture")]
    Blocked,
    #[error("seek rejected: {0}")]
    Seek(String),
    #[error("failed to load track: {0}")]
    Load(String),
    #[error("audio backend failure: {0}")]
    Backend(String),
}

/// Metadata available once the resource has been opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Track length in seconds; `f64::INFINITY` for unbounded streams.
    pub duration: f64,
}

pub trait AudioElement: Send {
    fn load(&mut self) -> Result<MediaInfo, PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Current play head in seconds.
    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError>;
    fn set_volume(&mut self, volume: f32);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AudioElement, MediaInfo, PlaybackError};
    use std::collections::VecDeque;

    /// Scripted element: outcomes are queued up front, calls are recorded.
    #[derive(Debug)]
    pub struct FakeAudio {
        pub duration: f64,
        pub position: f64,
        pub paused: bool,
        pub volume: f32,
        pub play_outcomes: VecDeque<Result<(), PlaybackError>>,
        pub seek_outcomes: VecDeque<Result<(), PlaybackError>>,
        pub load_error: Option<PlaybackError>,
        pub loads: usize,
        pub play_calls: usize,
        pub seeks: Vec<f64>,
    }

    impl FakeAudio {
        pub fn with_duration(duration: f64) -> Self {
            Self {
                duration,
                position: 0.0,
                paused: true,
                volume: 1.0,
                play_outcomes: VecDeque::new(),
                seek_outcomes: VecDeque::new(),
                load_error: None,
                loads: 0,
                play_calls: 0,
                seeks: Vec::new(),
            }
        }

        pub fn blocking_autoplay(mut self) -> Self {
            self.play_outcomes.push_back(Err(PlaybackError::Blocked));
            self
        }
    }

    impl AudioElement for FakeAudio {
        fn load(&mut self) -> Result<MediaInfo, PlaybackError> {
            self.loads += 1;
            match self.load_error.clone() {
                Some(err) => Err(err),
                None => Ok(MediaInfo {
                    duration: self.duration,
                }),
            }
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            self.play_calls += 1;
            let outcome = self.play_outcomes.pop_front().unwrap_or(Ok(()));
            if outcome.is_ok() {
                self.paused = false;
            }
            outcome
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn current_time(&self) -> f64 {
            self.position
        }

        fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
            self.seeks.push(seconds);
            let outcome = self.seek_outcomes.pop_front().unwrap_or(Ok(()));
            if outcome.is_ok() {
                self.position = seconds;
            }
            outcome
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
    }
}
