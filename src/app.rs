use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};

use crate::{
    audio::AudioElement,
    db::Database,
    log_error, log_info,
    playback::{PlaybackContinuity, PlaybackDriver},
    settings::SettingsStore,
    store::DurableStore,
    utils::SystemClock,
    wizard::ReleaseWizard,
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "[App]";

const DB_FILE: &str = "sedona.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Everything a window needs, opened once from the data directory.
pub struct Services {
    pub db: Database,
    pub settings: SettingsStore,
    pub wizard: ReleaseWizard,
    data_dir: PathBuf,
}

impl Services {
    /// Opens the store and settings. Any failure here is fatal to startup.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let db_path = data_dir.join(DB_FILE);
        let db = Database::new(db_path.clone())
            .with_context(|| format!("Failed to open store at {}", db_path.display()))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;

        let store: Arc<dyn DurableStore> = Arc::new(db.clone());
        let wizard = ReleaseWizard::new(store, Arc::new(SystemClock));

        log_info!("services ready, store at {}", db.path().display());

        Ok(Self {
            db,
            settings,
            wizard,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn store(&self) -> Arc<dyn DurableStore> {
        Arc::new(self.db.clone())
    }

    pub fn track_path(&self) -> Result<PathBuf> {
        self.settings.music().resolve_track(&self.data_dir)
    }

    /// Builds the playback driver for `audio` with the configured timing.
    pub fn playback<A: AudioElement + 'static>(&self, audio: A) -> PlaybackDriver<A> {
        let music = self.settings.music();
        let continuity =
            PlaybackContinuity::new(audio, self.store(), music.timing(), music.volume);
        PlaybackDriver::new(continuity, music.sample_interval())
    }
}

/// Opens the services and a playback driver for the configured track.
/// `make_audio` receives the resolved track path.
pub fn boot<A, F>(data_dir: &Path, make_audio: F) -> Result<(Services, PlaybackDriver<A>)>
where
    A: AudioElement + 'static,
    F: FnOnce(PathBuf) -> A,
{
    let services = Services::open(data_dir)?;
    let track = services.track_path()?;
    let driver = services.playback(make_audio(track));
    Ok((services, driver))
}

/// Why the app could not start, kept for the page to show with a reload
/// action. Empty once startup has succeeded.
#[derive(Debug, Default)]
pub struct StartupState {
    error: RwLock<Option<String>>,
}

impl StartupState {
    pub fn record_failure(&self, err: &anyhow::Error) {
        log_error!("startup failed: {err:#}");
        self.set(Some(format!("{err:#}")));
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn error(&self) -> Option<String> {
        match self.error.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, value: Option<String>) {
        match self.error.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}
