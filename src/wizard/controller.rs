use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::{
    log_info, log_warn,
    models::{
        EmotionChoice, JournalEntry, ReleaseDraft, ReleaseRecord, ReleaseStep, SensationChoice,
    },
    store::{self, keys, DurableStore},
    utils::Clock,
};

use super::{CustomField, WizardEffect, WizardError, WizardEvent, WizardPhase, WizardState};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "[Wizard]";

/// What the rendering layer needs to redraw after any action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub state: WizardState,
    pub step_number: Option<u8>,
    pub step_label: Option<&'static str>,
    pub step_prompt: Option<&'static str>,
}

/// Drives one wizard over the shared durable store.
pub struct ReleaseWizard {
    state: WizardState,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl ReleaseWizard {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        let saved = store::read_list::<ReleaseRecord>(store.as_ref(), keys::RELEASES).len();
        log_info!("loaded {saved} saved release records");

        Self {
            state: WizardState::new(),
            store,
            clock,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let step = self.state.current_step();
        WizardSnapshot {
            state: self.state.clone(),
            step_number: step.map(|s| s.number()),
            step_label: step.map(|s| s.label()),
            step_prompt: step.map(|s| s.prompt()),
        }
    }

    /// Applies one event and carries out its effects. Returns the effects so
    /// the rendering layer can react, plus the record if one was saved.
    pub fn handle(
        &mut self,
        event: WizardEvent,
    ) -> Result<(Vec<WizardEffect>, Option<ReleaseRecord>), WizardError> {
        let now = self.clock.now();
        let effects = self.state.apply(event, now)?;

        let mut saved = None;
        for effect in &effects {
            if let WizardEffect::Persist(draft) = effect {
                saved = Some(self.persist(draft.clone()));
            }
        }

        Ok((effects, saved))
    }

    pub fn start(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::Start).map(|(effects, _)| effects)
    }

    pub fn select_emotion(&mut self, choice: EmotionChoice) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::SelectEmotion(choice))
            .map(|(effects, _)| effects)
    }

    pub fn select_sensation(
        &mut self,
        choice: SensationChoice,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::SelectSensation(choice))
            .map(|(effects, _)| effects)
    }

    pub fn submit_custom_text(
        &mut self,
        field: CustomField,
        text: impl Into<String>,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::SubmitCustomText {
            field,
            text: text.into(),
        })
        .map(|(effects, _)| effects)
    }

    pub fn begin(&mut self) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::Begin).map(|(effects, _)| effects)
    }

    pub fn submit_response(
        &mut self,
        response: impl Into<String>,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        self.handle(WizardEvent::SubmitResponse(response.into()))
            .map(|(effects, _)| effects)
    }

    /// Saves the completed session and returns to idle.
    pub fn save(&mut self, notes: impl Into<String>) -> Result<ReleaseRecord, WizardError> {
        let phase = self.state.phase;
        let (_, saved) = self.handle(WizardEvent::Save {
            notes: notes.into(),
        })?;
        saved.ok_or(WizardError::InvalidTransition {
            phase,
            event: "save",
        })
    }

    /// Abandons the session without saving.
    pub fn discard(&mut self) -> Vec<WizardEffect> {
        self.handle(WizardEvent::Discard)
            .map(|(effects, _)| effects)
            .unwrap_or_default()
    }

    pub fn releases(&self) -> Vec<ReleaseRecord> {
        store::read_list(self.store.as_ref(), keys::RELEASES)
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        store::read_list(self.store.as_ref(), keys::JOURNAL_ENTRIES)
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase
    }

    pub fn current_step(&self) -> Option<ReleaseStep> {
        self.state.current_step()
    }

    /// Writes the record, then its journal entry. Storage failures are logged
    /// and swallowed so the user is never blocked on a save.
    fn persist(&self, draft: ReleaseDraft) -> ReleaseRecord {
        let saved_at = self.clock.now();
        let id = self.next_release_id(saved_at.timestamp_millis());
        let record = draft.into_record(id, saved_at);

        if let Err(err) = self.append(keys::RELEASES, &record) {
            log_warn!("failed to save release {id}: {err:#}");
        }

        let entry = JournalEntry::from(&record);
        if let Err(err) = self.append(keys::JOURNAL_ENTRIES, &entry) {
            log_warn!("failed to save journal entry {}: {err:#}", entry.id);
        }

        log_info!(
            "saved release {id} with {} responses",
            record.responses.len()
        );
        record
    }

    fn append<T: Serialize>(&self, key: &str, item: &T) -> Result<usize> {
        store::append_to_list(self.store.as_ref(), key, item)
    }

    /// Millisecond timestamp, bumped past the last saved id when the clock
    /// hasn't moved (or went backwards).
    fn next_release_id(&self, now_ms: i64) -> i64 {
        let last_id = store::last_raw_entry(self.store.as_ref(), keys::RELEASES)
            .and_then(|entry| entry.get("id").and_then(|id| id.as_i64()));

        match last_id {
            Some(last) if last >= now_ms => last + 1,
            _ => now_ms,
        }
    }
}
