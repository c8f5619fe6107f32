use std::{collections::VecDeque, sync::Arc, time::Instant};

use serde::Serialize;

use crate::{
    audio::{AudioElement, PlaybackError},
    log_debug, log_info, log_warn,
    store::{self, keys, DurableStore},
};

use super::{
    ContinuityState, ContinuityTiming, PersistedPlayback, PlaybackEffect, PlaybackEvent,
    PlaybackPhase,
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "[Music]";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    /// What the control surface should show.
    pub playing: bool,
    pub awaiting_gesture: bool,
    pub position: f64,
}

/// Runs the continuity protocol for one page lifetime against a real audio
/// element and the shared durable store.
pub struct PlaybackContinuity<A: AudioElement> {
    state: ContinuityState,
    audio: A,
    store: Arc<dyn DurableStore>,
    show_playing: bool,
}

impl<A: AudioElement> PlaybackContinuity<A> {
    pub fn new(
        mut audio: A,
        store: Arc<dyn DurableStore>,
        timing: ContinuityTiming,
        volume: f32,
    ) -> Self {
        audio.set_volume(volume);
        Self {
            state: ContinuityState::new(timing),
            audio,
            store,
            show_playing: false,
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.state.phase,
            playing: self.show_playing,
            awaiting_gesture: self.state.awaiting_gesture(),
            position: self.audio.current_time(),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Reads what the previous page left behind and starts the track if
    /// appropriate.
    pub fn page_load(&mut self) -> Vec<PlaybackEffect> {
        let persisted = PersistedPlayback::read(self.store.as_ref());
        log_info!(
            "page load: saved={:?} enabled={:?} continue={:?}",
            persisted.current_time,
            persisted.enabled,
            persisted.should_continue
        );
        self.dispatch(PlaybackEvent::PageLoad(persisted))
    }

    pub fn toggle(&mut self) -> Vec<PlaybackEffect> {
        self.dispatch(PlaybackEvent::Toggle)
    }

    /// Any click or touch on the page.
    pub fn user_gesture(&mut self) -> Vec<PlaybackEffect> {
        self.dispatch(PlaybackEvent::UserGesture)
    }

    /// Samples the play head; the store write is throttled by the protocol.
    pub fn time_update(&mut self, at: Instant) -> Vec<PlaybackEffect> {
        let position = self.audio.current_time();
        self.dispatch(PlaybackEvent::TimeUpdate { position, at })
    }

    pub fn visibility_changed(&mut self, hidden: bool) -> Vec<PlaybackEffect> {
        let position = self.audio.current_time();
        self.dispatch(PlaybackEvent::VisibilityChanged { hidden, position })
    }

    /// Navigation away, page hide or unload.
    pub fn teardown(&mut self) -> Vec<PlaybackEffect> {
        let position = self.audio.current_time();
        self.dispatch(PlaybackEvent::Teardown { position })
    }

    /// Silences the element once its page is gone. A browser does this by
    /// destroying the page; a long-lived host has to do it explicitly.
    pub fn release_audio(&mut self) {
        self.audio.pause();
    }

    pub fn seek_retry(&mut self, target: f64) -> Vec<PlaybackEffect> {
        self.dispatch(PlaybackEvent::SeekRetry { target })
    }

    /// Feeds one event through the protocol, carrying out each effect. Effects
    /// that report back (load, seek, play) queue follow-up events, so one call
    /// settles the whole chain. Returns every effect produced, in order.
    pub fn dispatch(&mut self, event: PlaybackEvent) -> Vec<PlaybackEffect> {
        let mut queue = VecDeque::from([event]);
        let mut produced = Vec::new();

        while let Some(event) = queue.pop_front() {
            for effect in self.state.handle(event) {
                if let Some(follow_up) = self.execute(&effect) {
                    queue.extend(follow_up);
                }
                produced.push(effect);
            }
        }

        produced
    }

    fn execute(&mut self, effect: &PlaybackEffect) -> Option<Vec<PlaybackEvent>> {
        let store = self.store.as_ref();

        match effect {
            PlaybackEffect::ClearContinueFlag => {
                if let Err(err) = store.remove(keys::MUSIC_SHOULD_CONTINUE) {
                    log_warn!("failed to clear continue flag: {err:#}");
                }
                None
            }
            PlaybackEffect::Load => match self.audio.load() {
                Ok(info) => Some(vec![
                    PlaybackEvent::MetadataLoaded {
                        duration: info.duration,
                    },
                    PlaybackEvent::Ready,
                ]),
                Err(err) => {
                    log_warn!("failed to load background track: {err}");
                    Some(vec![PlaybackEvent::LoadFailed])
                }
            },
            PlaybackEffect::Seek(target) => match self.audio.seek(*target) {
                Ok(()) => {
                    log_info!("play head restored to {target:.2}s");
                    None
                }
                Err(err) => {
                    log_debug!("seek to {target:.2}s failed: {err}");
                    Some(vec![PlaybackEvent::SeekFailed { target: *target }])
                }
            },
            PlaybackEffect::Play => match self.audio.play() {
                Ok(()) => Some(vec![PlaybackEvent::PlayStarted]),
                Err(PlaybackError::Blocked) => {
                    log_info!("playback blocked, waiting for user gesture");
                    Some(vec![PlaybackEvent::PlayRefused])
                }
                Err(err) => {
                    log_warn!("playback failed: {err}");
                    Some(vec![PlaybackEvent::PlayRefused])
                }
            },
            PlaybackEffect::Pause => {
                self.audio.pause();
                None
            }
            PlaybackEffect::SavePosition(position) => {
                if let Err(err) = store.set(keys::MUSIC_CURRENT_TIME, &position.to_string()) {
                    log_warn!("failed to save play head: {err:#}");
                }
                None
            }
            PlaybackEffect::SavePaused(paused) => {
                store::write_flag(store, keys::MUSIC_PAUSED, *paused);
                None
            }
            PlaybackEffect::SetEnabled(enabled) => {
                store::write_flag(store, keys::MUSIC_ENABLED, *enabled);
                None
            }
            PlaybackEffect::SetShouldContinue(value) => {
                store::write_flag(store, keys::MUSIC_SHOULD_CONTINUE, *value);
                None
            }
            PlaybackEffect::ShowPlaying(playing) => {
                self.show_playing = *playing;
                None
            }
            // Listener bookkeeping lives in the protocol state; timers belong
            // to the host driver.
            PlaybackEffect::AttachGestureRetry
            | PlaybackEffect::DetachGestureRetry
            | PlaybackEffect::ScheduleSeekRetry { .. } => None,
        }
    }
}
