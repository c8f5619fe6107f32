use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::playback::ContinuityTiming;

const DEBUG_ENV: &str = "SEDONA_DEBUG";
const DEBUG_SAMPLE_INTERVAL_MS: u64 = 100;
const DEFAULT_TRACK_FILE: &str = "background.mp3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MusicSettings {
    pub volume: f32,
    pub save_interval_ms: u64,
    pub seek_retry_delay_ms: u64,
    pub sample_interval_ms: u64,
    /// Explicit track. When unset the track is looked up in the data dir.
    pub track_path: Option<PathBuf>,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            volume: 0.3,
            save_interval_ms: 200,
            seek_retry_delay_ms: 100,
            sample_interval_ms: 250,
            track_path: None,
        }
    }
}

impl MusicSettings {
    pub fn timing(&self) -> ContinuityTiming {
        ContinuityTiming {
            save_interval: Duration::from_millis(self.save_interval_ms),
            seek_retry_delay: Duration::from_millis(self.seek_retry_delay_ms),
        }
    }

    /// Ticker period, shortened when `SEDONA_DEBUG` is set.
    pub fn sample_interval(&self) -> Duration {
        let debug = std::env::var(DEBUG_ENV).ok();
        self.sample_interval_with(debug.as_deref())
    }

    fn sample_interval_with(&self, debug: Option<&str>) -> Duration {
        if debug.is_some_and(is_truthy) {
            Duration::from_millis(DEBUG_SAMPLE_INTERVAL_MS)
        } else {
            Duration::from_millis(self.sample_interval_ms.max(1))
        }
    }

    /// Resolves the background track. A configured path must exist; the
    /// fallback in `data_dir` may be absent, in which case the page just
    /// runs without music.
    pub fn resolve_track(&self, data_dir: &Path) -> Result<PathBuf> {
        match &self.track_path {
            Some(path) => {
                anyhow::ensure!(
                    path.is_file(),
                    "Configured background track {} does not exist",
                    path.display()
                );
                Ok(path.clone())
            }
            None => Ok(data_dir.join(DEFAULT_TRACK_FILE)),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    music: MusicSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn music(&self) -> MusicSettings {
        match self.data.read() {
            Ok(guard) => guard.music.clone(),
            Err(poisoned) => poisoned.into_inner().music.clone(),
        }
    }

    pub fn update_music(&self, mut settings: MusicSettings) -> Result<()> {
        settings.volume = settings.volume.clamp(0.0, 1.0);
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        guard.music = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let music = store.music();
        assert_eq!(music, MusicSettings::default());
        assert_eq!(music.timing().save_interval, Duration::from_millis(200));
        assert_eq!(music.timing().seek_retry_delay, Duration::from_millis(100));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.music().volume, 0.3);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"music":{"volume":0.5}}"#).unwrap();

        let music = SettingsStore::new(path).unwrap().music();
        assert_eq!(music.volume, 0.5);
        assert_eq!(music.sample_interval_ms, 250);
    }

    #[test]
    fn updates_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_music(MusicSettings {
                volume: 1.7,
                save_interval_ms: 500,
                ..MusicSettings::default()
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap().music();
        assert_eq!(reloaded.volume, 1.0);
        assert_eq!(reloaded.save_interval_ms, 500);
    }

    #[test]
    fn debug_flag_shortens_sampling() {
        let music = MusicSettings::default();
        assert_eq!(music.sample_interval_with(None), Duration::from_millis(250));
        assert_eq!(music.sample_interval_with(Some("0")), Duration::from_millis(250));
        assert_eq!(music.sample_interval_with(Some("1")), Duration::from_millis(100));
        assert_eq!(music.sample_interval_with(Some("TRUE")), Duration::from_millis(100));
    }

    #[test]
    fn configured_track_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = MusicSettings {
            track_path: Some(dir.path().join("nope.mp3")),
            ..MusicSettings::default()
        };
        assert!(missing.resolve_track(dir.path()).is_err());

        let fallback = MusicSettings::default().resolve_track(dir.path()).unwrap();
        assert_eq!(fallback, dir.path().join("background.mp3"));
    }
}
