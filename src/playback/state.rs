use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::store::{self, keys, DurableStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    /// The user turned music off on an earlier page; nothing was loaded.
    Disabled,
    Loading,
    /// A play request is in flight.
    Starting,
    /// Autoplay was refused; the next user gesture retries once.
    PendingUserGesture,
    Playing,
    Paused,
}

impl Default for PlaybackPhase {
    fn default() -> Self {
        PlaybackPhase::Disabled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlayOrigin {
    Autoplay,
    Gesture,
    Toggle,
}

/// Playback keys as the previous page left them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPlayback {
    pub current_time: Option<f64>,
    pub paused: Option<bool>,
    pub enabled: Option<bool>,
    pub should_continue: Option<bool>,
}

impl PersistedPlayback {
    pub fn read(store: &dyn DurableStore) -> Self {
        let current_time = store
            .get(keys::MUSIC_CURRENT_TIME)
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|t| t.is_finite());

        Self {
            current_time,
            paused: store::read_flag(store, keys::MUSIC_PAUSED),
            enabled: store::read_flag(store, keys::MUSIC_ENABLED),
            should_continue: store::read_flag(store, keys::MUSIC_SHOULD_CONTINUE),
        }
    }

    /// Play unless the user explicitly turned music off; a pending
    /// continuation from the previous page always wins.
    pub fn should_play(&self) -> bool {
        self.should_continue == Some(true) || self.enabled != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    PageLoad(PersistedPlayback),
    MetadataLoaded { duration: f64 },
    LoadFailed,
    Ready,
    SeekFailed { target: f64 },
    SeekRetry { target: f64 },
    PlayStarted,
    PlayRefused,
    TimeUpdate { position: f64, at: Instant },
    UserGesture,
    Toggle,
    VisibilityChanged { hidden: bool, position: f64 },
    Teardown { position: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    ClearContinueFlag,
    Load,
    Seek(f64),
    ScheduleSeekRetry { target: f64, delay: Duration },
    Play,
    Pause,
    SavePosition(f64),
    SavePaused(bool),
    SetEnabled(bool),
    SetShouldContinue(bool),
    AttachGestureRetry,
    DetachGestureRetry,
    ShowPlaying(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct ContinuityTiming {
    pub save_interval: Duration,
    pub seek_retry_delay: Duration,
}

impl Default for ContinuityTiming {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_millis(200),
            seek_retry_delay: Duration::from_millis(100),
        }
    }
}

/// Per-page protocol state. Pure: every input is an event, every output an
/// effect for the host to carry out.
#[derive(Debug, Clone)]
pub struct ContinuityState {
    pub phase: PlaybackPhase,
    pub origin: PlayOrigin,
    /// Music preference as known to this page.
    pub enabled: Option<bool>,
    loaded: bool,
    pending_seek: Option<f64>,
    seek_retry_used: bool,
    gesture_retry_attached: bool,
    gesture_retry_used: bool,
    last_position_save: Option<Instant>,
    torn_down: bool,
    timing: ContinuityTiming,
}

impl ContinuityState {
    pub fn new(timing: ContinuityTiming) -> Self {
        Self {
            phase: PlaybackPhase::default(),
            origin: PlayOrigin::Autoplay,
            enabled: None,
            loaded: false,
            pending_seek: None,
            seek_retry_used: false,
            gesture_retry_attached: false,
            gesture_retry_used: false,
            last_position_save: None,
            torn_down: false,
            timing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn awaiting_gesture(&self) -> bool {
        self.gesture_retry_attached
    }

    pub fn handle(&mut self, event: PlaybackEvent) -> Vec<PlaybackEffect> {
        use PlaybackEffect as E;

        match event {
            PlaybackEvent::PageLoad(persisted) => {
                *self = Self::new(self.timing);
                self.enabled = persisted.enabled;
                self.pending_seek = persisted.current_time;

                let mut effects = Vec::new();
                if persisted.should_continue == Some(true) {
                    effects.push(E::ClearContinueFlag);
                }
                if persisted.should_play() {
                    self.phase = PlaybackPhase::Loading;
                    self.origin = PlayOrigin::Autoplay;
                    effects.push(E::Load);
                } else {
                    self.phase = PlaybackPhase::Disabled;
                    effects.push(E::ShowPlaying(false));
                }
                effects
            }
            PlaybackEvent::MetadataLoaded { duration } => {
                self.loaded = true;
                match self.pending_seek.take() {
                    Some(target) if target > 0.0 && (duration.is_infinite() || target < duration) => {
                        vec![E::Seek(target)]
                    }
                    // Out of range or zero: start from the beginning.
                    _ => Vec::new(),
                }
            }
            PlaybackEvent::LoadFailed => {
                self.phase = PlaybackPhase::Paused;
                vec![E::ShowPlaying(false)]
            }
            PlaybackEvent::Ready => {
                if self.phase == PlaybackPhase::Loading {
                    self.phase = PlaybackPhase::Starting;
                    vec![E::Play]
                } else {
                    Vec::new()
                }
            }
            PlaybackEvent::SeekFailed { target } => {
                if self.seek_retry_used {
                    return Vec::new();
                }
                self.seek_retry_used = true;
                vec![E::ScheduleSeekRetry {
                    target,
                    delay: self.timing.seek_retry_delay,
                }]
            }
            PlaybackEvent::SeekRetry { target } => vec![E::Seek(target)],
            PlaybackEvent::PlayStarted => {
                self.phase = PlaybackPhase::Playing;
                self.enabled = Some(true);
                let mut effects = Vec::new();
                if self.gesture_retry_attached {
                    self.gesture_retry_attached = false;
                    effects.push(E::DetachGestureRetry);
                }
                effects.push(E::SetEnabled(true));
                effects.push(E::ShowPlaying(true));
                effects
            }
            PlaybackEvent::PlayRefused => {
                let can_retry = self.origin != PlayOrigin::Gesture
                    && !self.gesture_retry_used
                    && !self.gesture_retry_attached;
                if can_retry {
                    self.phase = PlaybackPhase::PendingUserGesture;
                    self.gesture_retry_attached = true;
                    vec![E::ShowPlaying(false), E::AttachGestureRetry]
                } else {
                    if self.phase != PlaybackPhase::PendingUserGesture {
                        self.phase = PlaybackPhase::Paused;
                    }
                    vec![E::ShowPlaying(false)]
                }
            }
            PlaybackEvent::UserGesture => {
                if !self.gesture_retry_attached {
                    return Vec::new();
                }
                self.gesture_retry_attached = false;
                self.gesture_retry_used = true;
                self.origin = PlayOrigin::Gesture;
                self.phase = PlaybackPhase::Starting;
                vec![E::DetachGestureRetry, E::Play]
            }
            PlaybackEvent::Toggle => self.toggle(),
            PlaybackEvent::TimeUpdate { position, at } => {
                if !self.is_playing() {
                    return Vec::new();
                }
                let due = match self.last_position_save {
                    Some(last) => at.saturating_duration_since(last) > self.timing.save_interval,
                    None => true,
                };
                if due {
                    self.last_position_save = Some(at);
                    vec![E::SavePosition(position)]
                } else {
                    Vec::new()
                }
            }
            PlaybackEvent::VisibilityChanged { hidden, position } => {
                if self.torn_down || self.enabled == Some(false) {
                    return Vec::new();
                }
                if hidden {
                    vec![E::SavePosition(position), E::SavePaused(!self.is_playing())]
                } else if self.loaded && self.phase == PlaybackPhase::Paused {
                    self.phase = PlaybackPhase::Starting;
                    self.origin = PlayOrigin::Autoplay;
                    vec![E::Play]
                } else {
                    Vec::new()
                }
            }
            PlaybackEvent::Teardown { position } => {
                if self.torn_down {
                    return Vec::new();
                }
                let was_playing = self.is_playing();
                let mut effects = vec![E::SavePosition(position), E::SavePaused(!was_playing)];
                if was_playing {
                    effects.push(E::SetShouldContinue(true));
                }
                if self.gesture_retry_attached {
                    self.gesture_retry_attached = false;
                    effects.push(E::DetachGestureRetry);
                }

                // Nothing stays loaded past the page. A later toggle reloads
                // from the handed-off position without touching the flags.
                self.torn_down = true;
                self.loaded = false;
                self.pending_seek = Some(position);
                self.last_position_save = None;
                if self.phase != PlaybackPhase::Disabled {
                    self.phase = PlaybackPhase::Paused;
                }
                effects.push(E::ShowPlaying(false));
                effects
            }
        }
    }

    fn toggle(&mut self) -> Vec<PlaybackEffect> {
        use PlaybackEffect as E;

        self.torn_down = false;
        let mut effects = Vec::new();
        if self.gesture_retry_attached {
            self.gesture_retry_attached = false;
            effects.push(E::DetachGestureRetry);
        }

        if self.is_playing() {
            self.phase = PlaybackPhase::Paused;
            self.enabled = Some(false);
            effects.extend([
                E::Pause,
                E::SetEnabled(false),
                E::SetShouldContinue(false),
                E::ShowPlaying(false),
            ]);
        } else if self.loaded {
            self.phase = PlaybackPhase::Starting;
            self.origin = PlayOrigin::Toggle;
            effects.push(E::Play);
        } else {
            self.phase = PlaybackPhase::Loading;
            self.origin = PlayOrigin::Toggle;
            effects.push(E::Load);
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use super::PlaybackEffect as E;

    fn loaded_state(saved: Option<f64>) -> ContinuityState {
        let mut state = ContinuityState::new(ContinuityTiming::default());
        state.handle(PlaybackEvent::PageLoad(PersistedPlayback {
            current_time: saved,
            ..Default::default()
        }));
        state
    }

    fn playing_state() -> ContinuityState {
        let mut state = loaded_state(None);
        state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 });
        state.handle(PlaybackEvent::Ready);
        state.handle(PlaybackEvent::PlayStarted);
        state
    }

    #[test]
    fn first_visit_defaults_to_playing() {
        let persisted = PersistedPlayback::default();
        assert!(persisted.should_play());

        let mut state = ContinuityState::new(ContinuityTiming::default());
        let effects = state.handle(PlaybackEvent::PageLoad(persisted));
        assert_eq!(effects, vec![E::Load]);
        assert_eq!(state.phase, PlaybackPhase::Loading);
    }

    #[test]
    fn explicit_disable_prevents_autoplay() {
        let persisted = PersistedPlayback {
            enabled: Some(false),
            should_continue: Some(false),
            ..Default::default()
        };
        assert!(!persisted.should_play());

        let mut state = ContinuityState::new(ContinuityTiming::default());
        let effects = state.handle(PlaybackEvent::PageLoad(persisted));
        assert_eq!(effects, vec![E::ShowPlaying(false)]);
        assert_eq!(state.phase, PlaybackPhase::Disabled);
    }

    #[test]
    fn continuation_flag_wins_and_is_consumed() {
        let persisted = PersistedPlayback {
            enabled: Some(false),
            should_continue: Some(true),
            ..Default::default()
        };
        let mut state = ContinuityState::new(ContinuityTiming::default());
        let effects = state.handle(PlaybackEvent::PageLoad(persisted));
        assert_eq!(effects, vec![E::ClearContinueFlag, E::Load]);
    }

    #[test]
    fn saved_time_restored_only_when_in_range() {
        let mut state = loaded_state(Some(125.4));
        assert_eq!(
            state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 }),
            vec![E::Seek(125.4)]
        );

        let mut state = loaded_state(Some(9999.0));
        assert!(state
            .handle(PlaybackEvent::MetadataLoaded { duration: 300.0 })
            .is_empty());

        let mut state = loaded_state(Some(0.0));
        assert!(state
            .handle(PlaybackEvent::MetadataLoaded { duration: 300.0 })
            .is_empty());

        let mut state = loaded_state(Some(42.0));
        assert_eq!(
            state.handle(PlaybackEvent::MetadataLoaded {
                duration: f64::INFINITY
            }),
            vec![E::Seek(42.0)]
        );
    }

    #[test]
    fn failed_seek_is_retried_once() {
        let mut state = loaded_state(Some(10.0));
        let effects = state.handle(PlaybackEvent::SeekFailed { target: 10.0 });
        assert_eq!(
            effects,
            vec![E::ScheduleSeekRetry {
                target: 10.0,
                delay: Duration::from_millis(100)
            }]
        );
        assert!(state
            .handle(PlaybackEvent::SeekFailed { target: 10.0 })
            .is_empty());
    }

    #[test]
    fn blocked_autoplay_waits_for_one_gesture() {
        let mut state = loaded_state(None);
        state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 });
        assert_eq!(state.handle(PlaybackEvent::Ready), vec![E::Play]);

        let effects = state.handle(PlaybackEvent::PlayRefused);
        assert_eq!(effects, vec![E::ShowPlaying(false), E::AttachGestureRetry]);
        assert_eq!(state.phase, PlaybackPhase::PendingUserGesture);

        assert_eq!(
            state.handle(PlaybackEvent::UserGesture),
            vec![E::DetachGestureRetry, E::Play]
        );
        // Retry refused again: no second listener.
        assert_eq!(
            state.handle(PlaybackEvent::PlayRefused),
            vec![E::ShowPlaying(false)]
        );
        assert!(state.handle(PlaybackEvent::UserGesture).is_empty());
        assert_eq!(state.phase, PlaybackPhase::Paused);
    }

    #[test]
    fn position_saves_are_throttled() {
        let mut state = playing_state();
        let t0 = Instant::now();

        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let saves: Vec<_> = [0, 100, 200, 201, 350, 402]
            .into_iter()
            .flat_map(|ms| {
                state.handle(PlaybackEvent::TimeUpdate {
                    position: ms as f64 / 1000.0,
                    at: at(ms),
                })
            })
            .collect();

        assert_eq!(saves, vec![E::SavePosition(0.0), E::SavePosition(0.201), E::SavePosition(0.402)]);
    }

    #[test]
    fn teardown_while_playing_sets_continue_flag() {
        let mut state = playing_state();
        assert_eq!(
            state.handle(PlaybackEvent::Teardown { position: 61.5 }),
            vec![
                E::SavePosition(61.5),
                E::SavePaused(false),
                E::SetShouldContinue(true),
                E::ShowPlaying(false)
            ]
        );
        assert_eq!(state.phase, PlaybackPhase::Paused);
        assert!(state
            .handle(PlaybackEvent::TimeUpdate {
                position: 62.0,
                at: Instant::now()
            })
            .is_empty());
        assert!(state.handle(PlaybackEvent::Teardown { position: 61.5 }).is_empty());
    }

    #[test]
    fn toggle_after_teardown_reloads_without_touching_flags() {
        let mut state = playing_state();
        state.handle(PlaybackEvent::Teardown { position: 42.0 });

        assert_eq!(state.handle(PlaybackEvent::Toggle), vec![E::Load]);
        assert_eq!(
            state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 }),
            vec![E::Seek(42.0)]
        );
        assert_eq!(state.handle(PlaybackEvent::Ready), vec![E::Play]);
        assert_eq!(
            state.handle(PlaybackEvent::PlayStarted),
            vec![E::SetEnabled(true), E::ShowPlaying(true)]
        );
    }

    #[test]
    fn toggle_pause_disables_future_autoplay() {
        let mut state = playing_state();
        let effects = state.handle(PlaybackEvent::Toggle);
        assert_eq!(
            effects,
            vec![
                E::Pause,
                E::SetEnabled(false),
                E::SetShouldContinue(false),
                E::ShowPlaying(false)
            ]
        );
        assert_eq!(
            state.handle(PlaybackEvent::Teardown { position: 3.0 }),
            vec![E::SavePosition(3.0), E::SavePaused(true), E::ShowPlaying(false)]
        );

        assert_eq!(state.handle(PlaybackEvent::Toggle), vec![E::Load]);
        state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 });
        assert_eq!(state.handle(PlaybackEvent::Ready), vec![E::Play]);
        assert_eq!(
            state.handle(PlaybackEvent::PlayStarted),
            vec![E::SetEnabled(true), E::ShowPlaying(true)]
        );
    }

    #[test]
    fn toggle_on_disabled_page_loads_first() {
        let mut state = ContinuityState::new(ContinuityTiming::default());
        state.handle(PlaybackEvent::PageLoad(PersistedPlayback {
            enabled: Some(false),
            current_time: Some(20.0),
            ..Default::default()
        }));

        assert_eq!(state.handle(PlaybackEvent::Toggle), vec![E::Load]);
        assert_eq!(
            state.handle(PlaybackEvent::MetadataLoaded { duration: 300.0 }),
            vec![E::Seek(20.0)]
        );
        assert_eq!(state.handle(PlaybackEvent::Ready), vec![E::Play]);
        assert_eq!(state.origin, PlayOrigin::Toggle);
    }

    #[test]
    fn hidden_page_saves_without_pausing() {
        let mut state = playing_state();
        assert_eq!(
            state.handle(PlaybackEvent::VisibilityChanged {
                hidden: true,
                position: 12.0
            }),
            vec![E::SavePosition(12.0), E::SavePaused(false)]
        );
        assert!(state.is_playing());
    }

    #[test]
    fn persisted_state_reads_store_values() {
        let store = MemoryStore::new();
        store.set(keys::MUSIC_CURRENT_TIME, "125.4").unwrap();
        store.set(keys::MUSIC_ENABLED, "true").unwrap();
        store.set(keys::MUSIC_PAUSED, "false").unwrap();

        let persisted = PersistedPlayback::read(&store);
        assert_eq!(
            persisted,
            PersistedPlayback {
                current_time: Some(125.4),
                paused: Some(false),
                enabled: Some(true),
                should_continue: None,
            }
        );

        store.set(keys::MUSIC_CURRENT_TIME, "NaN").unwrap();
        assert_eq!(PersistedPlayback::read(&store).current_time, None);
    }
}
