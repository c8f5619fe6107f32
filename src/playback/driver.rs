use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{audio::AudioElement, log_debug, log_info};

use super::{PlaybackContinuity, PlaybackEffect, PlaybackSnapshot};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "[Music]";

/// Tokio host for [`PlaybackContinuity`]: samples the play head on a ticker
/// (the native stand-in for media `timeupdate` events) and runs the delayed
/// seek retry. All events go through one mutex, so they are handled one at a
/// time in arrival order.
pub struct PlaybackDriver<A: AudioElement + 'static> {
    inner: Arc<Mutex<PlaybackContinuity<A>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    sample_interval: Duration,
}

impl<A: AudioElement + 'static> Clone for PlaybackDriver<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ticker: self.ticker.clone(),
            sample_interval: self.sample_interval,
        }
    }
}

impl<A: AudioElement + 'static> PlaybackDriver<A> {
    pub fn new(continuity: PlaybackContinuity<A>, sample_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(continuity)),
            ticker: Arc::new(Mutex::new(None)),
            sample_interval,
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Runs the page-load step and starts sampling.
    pub async fn start(&self) -> PlaybackSnapshot {
        let effects = self.inner.lock().await.page_load();
        self.schedule(&effects);
        self.spawn_ticker().await;
        self.snapshot().await
    }

    /// Also restarts sampling when the toggle comes after a teardown.
    pub async fn toggle(&self) -> PlaybackSnapshot {
        let effects = self.inner.lock().await.toggle();
        self.schedule(&effects);
        if self.ticker.lock().await.is_none() {
            self.spawn_ticker().await;
        }
        self.snapshot().await
    }

    pub async fn user_gesture(&self) -> PlaybackSnapshot {
        let effects = self.inner.lock().await.user_gesture();
        self.schedule(&effects);
        self.snapshot().await
    }

    pub async fn visibility_changed(&self, hidden: bool) -> PlaybackSnapshot {
        let effects = self.inner.lock().await.visibility_changed(hidden);
        self.schedule(&effects);
        self.snapshot().await
    }

    /// Persists the hand-off state and stops sampling. Call before the page
    /// (or window) goes away.
    pub async fn teardown(&self) {
        {
            let mut continuity = self.inner.lock().await;
            continuity.teardown();
            continuity.release_audio();
        }
        self.cancel_ticker().await;
    }

    /// Spawns timers requested by the protocol.
    fn schedule(&self, effects: &[PlaybackEffect]) {
        for effect in effects {
            if let PlaybackEffect::ScheduleSeekRetry { target, delay } = effect {
                let inner = self.inner.clone();
                let target = *target;
                let delay = *delay;
                log_debug!("retrying seek to {target:.2}s in {delay:?}");
                tokio::spawn(async move {
                    time::sleep(delay).await;
                    inner.lock().await.seek_retry(target);
                });
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let inner = self.inner.clone();
        let sample_interval = self.sample_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(sample_interval);
            loop {
                interval.tick().await;
                let now = time::Instant::now().into_std();
                inner.lock().await.time_update(now);
            }
        });

        log_info!("position sampling every {:?}", sample_interval);
        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{testing::FakeAudio, PlaybackError},
        playback::{ContinuityTiming, PlaybackPhase},
        store::{keys, DurableStore, MemoryStore},
    };

    fn driver(audio: FakeAudio, store: Arc<MemoryStore>) -> PlaybackDriver<FakeAudio> {
        let continuity = PlaybackContinuity::new(audio, store, ContinuityTiming::default(), 0.3);
        PlaybackDriver::new(continuity, Duration::from_millis(50))
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_persists_position_while_playing() {
        let store = Arc::new(MemoryStore::new());
        let mut audio = FakeAudio::with_duration(300.0);
        audio.position = 12.5;
        let driver = driver(audio, store.clone());

        let snapshot = driver.start().await;
        assert_eq!(snapshot.phase, PlaybackPhase::Playing);

        time::sleep(Duration::from_millis(120)).await;

        assert_eq!(
            store.get(keys::MUSIC_CURRENT_TIME).unwrap().as_deref(),
            Some("12.5")
        );
        driver.teardown().await;
        assert!(driver.inner.lock().await.audio().paused);
        assert_eq!(
            store.get(keys::MUSIC_SHOULD_CONTINUE).unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_saves_are_throttled_on_the_runtime_clock() {
        let store = Arc::new(MemoryStore::new());
        let mut audio = FakeAudio::with_duration(300.0);
        audio.position = 12.5;
        let driver = driver(audio, store.clone());
        driver.start().await;

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            store.get(keys::MUSIC_CURRENT_TIME).unwrap().as_deref(),
            Some("12.5")
        );

        // Ticks at 50, 100 and 150 ms fall inside the save window.
        store.set(keys::MUSIC_CURRENT_TIME, "unchanged").unwrap();
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            store.get(keys::MUSIC_CURRENT_TIME).unwrap().as_deref(),
            Some("unchanged")
        );

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            store.get(keys::MUSIC_CURRENT_TIME).unwrap().as_deref(),
            Some("12.5")
        );
        driver.teardown().await;
    }

    #[tokio::test]
    async fn teardown_stops_playing_and_keeps_the_hand_off() {
        let store = Arc::new(MemoryStore::new());
        let driver = driver(FakeAudio::with_duration(300.0), store.clone());
        driver.start().await;

        driver.teardown().await;
        let snapshot = driver.snapshot().await;
        assert!(!snapshot.playing);
        assert_eq!(snapshot.phase, PlaybackPhase::Paused);

        assert!(driver.toggle().await.playing);
        assert_eq!(store.get(keys::MUSIC_ENABLED).unwrap().as_deref(), Some("true"));
        assert_eq!(
            store.get(keys::MUSIC_SHOULD_CONTINUE).unwrap().as_deref(),
            Some("true")
        );
        driver.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn seek_retry_fires_after_delay() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::MUSIC_CURRENT_TIME, "40").unwrap();
        let mut audio = FakeAudio::with_duration(300.0);
        audio
            .seek_outcomes
            .push_back(Err(PlaybackError::Seek("busy".into())));
        let driver = driver(audio, store);

        driver.start().await;
        assert_eq!(driver.inner.lock().await.audio().seeks, vec![40.0]);

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(driver.inner.lock().await.audio().seeks, vec![40.0, 40.0]);
        driver.teardown().await;
    }

    #[tokio::test]
    async fn toggle_round_trip_updates_indicator() {
        let store = Arc::new(MemoryStore::new());
        let driver = driver(FakeAudio::with_duration(300.0), store.clone());

        assert!(driver.start().await.playing);
        assert!(!driver.toggle().await.playing);
        assert_eq!(store.get(keys::MUSIC_ENABLED).unwrap().as_deref(), Some("false"));
        assert!(driver.toggle().await.playing);
        assert_eq!(store.get(keys::MUSIC_ENABLED).unwrap().as_deref(), Some("true"));
        driver.teardown().await;
    }
}
