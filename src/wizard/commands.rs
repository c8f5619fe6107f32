use std::str::FromStr;

use tauri::{AppHandle, Emitter, State};

use crate::{
    models::{EmotionChoice, JournalEntry, ReleaseRecord, SensationChoice},
    wizard::{CustomField, ReleaseWizard, WizardError, WizardSnapshot},
    AppState,
};

const STATE_EVENT: &str = "wizard-state-changed";

/// Runs `action` against the shared wizard and broadcasts the new snapshot.
fn with_wizard<T>(
    state: &State<'_, AppState>,
    app_handle: &AppHandle,
    action: impl FnOnce(&mut ReleaseWizard) -> Result<T, WizardError>,
) -> Result<(T, WizardSnapshot), String> {
    let mut wizard = state.wizard.lock().map_err(|e| e.to_string())?;
    let value = action(&mut wizard).map_err(|e| e.to_string())?;
    let snapshot = wizard.snapshot();
    drop(wizard);

    app_handle
        .emit(STATE_EVENT, &snapshot)
        .map_err(|e| e.to_string())?;
    Ok((value, snapshot))
}

#[tauri::command]
pub fn get_wizard_state(state: State<'_, AppState>) -> Result<WizardSnapshot, String> {
    let wizard = state.wizard.lock().map_err(|e| e.to_string())?;
    Ok(wizard.snapshot())
}

#[tauri::command]
pub fn start_release(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    with_wizard(&state, &app_handle, |w| w.start()).map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn select_emotion(
    tag: String,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    let choice = EmotionChoice::from_str(&tag).map_err(|e| e.to_string())?;
    with_wizard(&state, &app_handle, |w| w.select_emotion(choice)).map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn select_sensation(
    tag: String,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    let choice = SensationChoice::from_str(&tag).map_err(|e| e.to_string())?;
    with_wizard(&state, &app_handle, |w| w.select_sensation(choice))
        .map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn submit_custom_text(
    field: CustomField,
    text: String,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    with_wizard(&state, &app_handle, |w| w.submit_custom_text(field, text))
        .map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn begin_release(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    with_wizard(&state, &app_handle, |w| w.begin()).map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn submit_response(
    response: String,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    with_wizard(&state, &app_handle, |w| w.submit_response(response))
        .map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn save_release(
    notes: String,
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<ReleaseRecord, String> {
    with_wizard(&state, &app_handle, |w| w.save(notes)).map(|(record, _)| record)
}

#[tauri::command]
pub fn discard_release(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<WizardSnapshot, String> {
    with_wizard(&state, &app_handle, |w| Ok(w.discard())).map(|(_, snapshot)| snapshot)
}

#[tauri::command]
pub fn list_releases(state: State<'_, AppState>) -> Result<Vec<ReleaseRecord>, String> {
    let wizard = state.wizard.lock().map_err(|e| e.to_string())?;
    Ok(wizard.releases())
}

#[tauri::command]
pub fn list_journal_entries(state: State<'_, AppState>) -> Result<Vec<JournalEntry>, String> {
    let wizard = state.wizard.lock().map_err(|e| e.to_string())?;
    Ok(wizard.journal_entries())
}
