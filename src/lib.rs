pub mod app;
pub mod audio;
pub mod db;
pub mod models;
pub mod navigation;
pub mod playback;
pub mod settings;
pub mod store;
pub mod utils;
pub mod wizard;

pub use app::{boot, Services, StartupState};

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
pub(crate) use desktop::AppState;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Mutex;

    use tauri::{AppHandle, Emitter, Manager, State, WindowEvent};

    use crate::{
        app::{self, Services, StartupState},
        audio::RodioTrack,
        navigation::{self, NavLink},
        playback::{
            commands::{
                get_playback_state, music_teardown, music_user_gesture,
                music_visibility_changed, start_music, toggle_music,
            },
            PlaybackDriver,
        },
        settings::{MusicSettings, SettingsStore},
        wizard::{
            commands::{
                begin_release, discard_release, get_wizard_state, list_journal_entries,
                list_releases, save_release, select_emotion, select_sensation, start_release,
                submit_custom_text, submit_response,
            },
            ReleaseWizard,
        },
    };

    pub(crate) struct AppState {
        pub(crate) wizard: Mutex<ReleaseWizard>,
        pub(crate) music: PlaybackDriver<RodioTrack>,
        pub(crate) settings: SettingsStore,
    }

    fn open_app_state(app_handle: &AppHandle) -> anyhow::Result<AppState> {
        let app_data_dir = app_handle
            .path()
            .app_data_dir()
            .map_err(|err| anyhow::anyhow!(err))?;

        let (services, music) = app::boot(&app_data_dir, RodioTrack::new)?;
        let Services {
            settings, wizard, ..
        } = services;

        Ok(AppState {
            wizard: Mutex::new(wizard),
            music,
            settings,
        })
    }

    #[tauri::command]
    fn get_startup_error(startup: State<StartupState>) -> Result<Option<String>, String> {
        Ok(startup.error())
    }

    /// Tries to start again after a failure. Returns the remaining error, if
    /// any; the page reloads when this comes back empty.
    #[tauri::command]
    fn retry_startup(
        startup: State<StartupState>,
        app_handle: AppHandle,
    ) -> Result<Option<String>, String> {
        if app_handle.try_state::<AppState>().is_none() {
            match open_app_state(&app_handle) {
                Ok(state) => {
                    app_handle.manage(state);
                }
                Err(err) => {
                    startup.record_failure(&err);
                    return Ok(startup.error());
                }
            }
        }
        startup.clear();
        Ok(None)
    }

    #[tauri::command]
    fn nav_links(path: String) -> Vec<NavLink> {
        navigation::nav_links(&path)
    }

    #[tauri::command]
    fn get_music_settings(state: State<AppState>) -> Result<MusicSettings, String> {
        Ok(state.settings.music())
    }

    /// Persists music settings. Timing changes apply from the next launch.
    #[tauri::command]
    fn set_music_settings(
        settings: MusicSettings,
        state: State<AppState>,
        app_handle: AppHandle,
    ) -> Result<(), String> {
        state
            .settings
            .update_music(settings)
            .map_err(|e| e.to_string())?;

        app_handle
            .emit("music-settings-updated", &state.settings.music())
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        // Initialize logging (reads RUST_LOG env var)
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        log::info!("Sedona Release starting up...");

        tauri::Builder::default()
            .setup(|app| {
                // A failed start is shown by the page with a reload action
                // instead of aborting the process.
                let startup = StartupState::default();
                match open_app_state(app.handle()) {
                    Ok(state) => {
                        app.manage(state);
                    }
                    Err(err) => startup.record_failure(&err),
                }
                app.manage(startup);
                Ok(())
            })
            .on_window_event(|window, event| {
                if let WindowEvent::Destroyed = event {
                    if let Some(state) = window.try_state::<AppState>() {
                        let music = state.music.clone();
                        tauri::async_runtime::block_on(music.teardown());
                    }
                }
            })
            .invoke_handler(tauri::generate_handler![
                get_startup_error,
                retry_startup,
                get_wizard_state,
                start_release,
                select_emotion,
                select_sensation,
                submit_custom_text,
                begin_release,
                submit_response,
                save_release,
                discard_release,
                list_releases,
                list_journal_entries,
                get_playback_state,
                start_music,
                toggle_music,
                music_user_gesture,
                music_visibility_changed,
                music_teardown,
                nav_links,
                get_music_settings,
                set_music_settings,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
