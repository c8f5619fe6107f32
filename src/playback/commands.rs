use tauri::{AppHandle, Emitter, State};

use crate::{playback::PlaybackSnapshot, AppState};

const STATE_EVENT: &str = "playback-state-changed";

fn broadcast(app_handle: &AppHandle, snapshot: PlaybackSnapshot) -> Result<PlaybackSnapshot, String> {
    app_handle
        .emit(STATE_EVENT, &snapshot)
        .map_err(|e| e.to_string())?;
    Ok(snapshot)
}

#[tauri::command]
pub async fn get_playback_state(state: State<'_, AppState>) -> Result<PlaybackSnapshot, String> {
    Ok(state.music.snapshot().await)
}

/// Page load: restore the hand-off state and try to start.
#[tauri::command]
pub async fn start_music(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<PlaybackSnapshot, String> {
    let snapshot = state.music.start().await;
    broadcast(&app_handle, snapshot)
}

#[tauri::command]
pub async fn toggle_music(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<PlaybackSnapshot, String> {
    let snapshot = state.music.toggle().await;
    broadcast(&app_handle, snapshot)
}

/// Any click or key press on the page. Only matters while autoplay is blocked.
#[tauri::command]
pub async fn music_user_gesture(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<PlaybackSnapshot, String> {
    let snapshot = state.music.user_gesture().await;
    broadcast(&app_handle, snapshot)
}

#[tauri::command]
pub async fn music_visibility_changed(
    hidden: bool,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<PlaybackSnapshot, String> {
    let snapshot = state.music.visibility_changed(hidden).await;
    broadcast(&app_handle, snapshot)
}

/// Called right before navigating to another page.
#[tauri::command]
pub async fn music_teardown(state: State<'_, AppState>) -> Result<(), String> {
    state.music.teardown().await;
    Ok(())
}
