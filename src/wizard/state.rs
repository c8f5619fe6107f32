use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Emotion, EmotionChoice, ReleaseDraft, ReleaseStep, Sensation, SensationChoice, StepResponse,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "phase", content = "step")]
pub enum WizardPhase {
    Idle,
    Selecting,
    Releasing(ReleaseStep),
    Completed,
}

impl Default for WizardPhase {
    fn default() -> Self {
        WizardPhase::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CustomField {
    Emotion,
    Sensation,
}

/// Transient choices made on the selection screen.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub emotions: Vec<Emotion>,
    pub custom_emotion_open: bool,
    pub custom_emotion_text: String,
    pub sensation: Option<Sensation>,
    pub custom_sensation_open: bool,
    pub custom_sensation_text: String,
}

impl Selection {
    /// Any custom emotion text counts, whitespace included. Only the
    /// sensation text is trimmed.
    pub fn has_emotion(&self) -> bool {
        !self.emotions.is_empty() || !self.custom_emotion_text.is_empty()
    }

    pub fn has_sensation(&self) -> bool {
        self.sensation.is_some() || !self.custom_sensation_text.trim().is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.has_emotion() && self.has_sensation()
    }

    fn toggle_emotion(&mut self, emotion: Emotion) {
        if let Some(index) = self.emotions.iter().position(|e| *e == emotion) {
            self.emotions.remove(index);
        } else {
            self.emotions.push(emotion);
        }
    }

    fn into_draft(self, date: DateTime<Utc>) -> ReleaseDraft {
        let sensation = match self.sensation {
            Some(tag) => tag.as_str().to_string(),
            None => self.custom_sensation_text.clone(),
        };

        ReleaseDraft {
            date,
            emotions: self.emotions,
            custom_emotion: self.custom_emotion_text,
            sensations: vec![sensation],
            custom_sensation: self.custom_sensation_text,
            responses: Vec::new(),
            notes: String::new(),
        }
    }
}

/// Inputs from the rendering layer, one per user action.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Start,
    SelectEmotion(EmotionChoice),
    SelectSensation(SensationChoice),
    SubmitCustomText { field: CustomField, text: String },
    Begin,
    SubmitResponse(String),
    Save { notes: String },
    Discard,
}

impl WizardEvent {
    fn name(&self) -> &'static str {
        match self {
            WizardEvent::Start => "start",
            WizardEvent::SelectEmotion(_) => "selectEmotion",
            WizardEvent::SelectSensation(_) => "selectSensation",
            WizardEvent::SubmitCustomText { .. } => "submitCustomText",
            WizardEvent::Begin => "begin",
            WizardEvent::SubmitResponse(_) => "submitResponse",
            WizardEvent::Save { .. } => "save",
            WizardEvent::Discard => "discard",
        }
    }
}

/// What the host must do after a transition.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum WizardEffect {
    ShowSelection,
    CustomEntryToggled { field: CustomField, visible: bool },
    BeginGateChanged(bool),
    ShowStep(ReleaseStep),
    ShowCompletion,
    /// Write the finished session; the host assigns the id.
    Persist(ReleaseDraft),
    Reset,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WizardError {
    #[error("'{event}' is not allowed in phase {phase:?}")]
    InvalidTransition {
        phase: WizardPhase,
        event: &'static str,
    },
    #[error("select at least one emotion and one body sensation first")]
    NotReady,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub phase: WizardPhase,
    pub selection: Selection,
    pub begin_enabled: bool,
    pub draft: Option<ReleaseDraft>,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. On error the state is left exactly as it was.
    pub fn apply(
        &mut self,
        event: WizardEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<WizardEffect>, WizardError> {
        let rejected = WizardError::InvalidTransition {
            phase: self.phase,
            event: event.name(),
        };

        match (self.phase, event) {
            (WizardPhase::Idle, WizardEvent::Start) => {
                self.phase = WizardPhase::Selecting;
                Ok(vec![WizardEffect::ShowSelection])
            }
            (WizardPhase::Selecting, WizardEvent::SelectEmotion(choice)) => {
                let mut effects = Vec::new();
                match choice {
                    EmotionChoice::Custom => {
                        self.selection.custom_emotion_open = !self.selection.custom_emotion_open;
                        effects.push(WizardEffect::CustomEntryToggled {
                            field: CustomField::Emotion,
                            visible: self.selection.custom_emotion_open,
                        });
                    }
                    EmotionChoice::Tag(emotion) => self.selection.toggle_emotion(emotion),
                }
                self.refresh_gate(&mut effects);
                Ok(effects)
            }
            (WizardPhase::Selecting, WizardEvent::SelectSensation(choice)) => {
                let mut effects = Vec::new();
                match choice {
                    SensationChoice::Other => {
                        self.selection.custom_sensation_open =
                            !self.selection.custom_sensation_open;
                        effects.push(WizardEffect::CustomEntryToggled {
                            field: CustomField::Sensation,
                            visible: self.selection.custom_sensation_open,
                        });
                    }
                    SensationChoice::Tag(sensation) => self.selection.sensation = Some(sensation),
                }
                self.refresh_gate(&mut effects);
                Ok(effects)
            }
            (WizardPhase::Selecting, WizardEvent::SubmitCustomText { field, text }) => {
                match field {
                    CustomField::Emotion => self.selection.custom_emotion_text = text,
                    CustomField::Sensation => self.selection.custom_sensation_text = text,
                }
                let mut effects = Vec::new();
                self.refresh_gate(&mut effects);
                Ok(effects)
            }
            (WizardPhase::Selecting, WizardEvent::Begin) => {
                if !self.selection.is_ready() {
                    return Err(WizardError::NotReady);
                }
                self.draft = Some(self.selection.clone().into_draft(now));
                self.phase = WizardPhase::Releasing(ReleaseStep::Acceptance);
                Ok(vec![WizardEffect::ShowStep(ReleaseStep::Acceptance)])
            }
            (WizardPhase::Releasing(step), WizardEvent::SubmitResponse(response)) => {
                let Some(draft) = self.draft.as_mut() else {
                    return Err(rejected);
                };
                draft.responses.push(StepResponse {
                    step: step.number(),
                    response,
                });

                match step.next() {
                    Some(next) => {
                        self.phase = WizardPhase::Releasing(next);
                        Ok(vec![WizardEffect::ShowStep(next)])
                    }
                    None => {
                        self.phase = WizardPhase::Completed;
                        Ok(vec![WizardEffect::ShowCompletion])
                    }
                }
            }
            (WizardPhase::Completed, WizardEvent::Save { notes }) => {
                let Some(mut draft) = self.draft.take() else {
                    return Err(rejected);
                };
                draft.notes = notes;
                self.reset();
                Ok(vec![WizardEffect::Persist(draft), WizardEffect::Reset])
            }
            (_, WizardEvent::Discard) => {
                self.reset();
                Ok(vec![WizardEffect::Reset])
            }
            _ => Err(rejected),
        }
    }

    pub fn current_step(&self) -> Option<ReleaseStep> {
        match self.phase {
            WizardPhase::Releasing(step) => Some(step),
            _ => None,
        }
    }

    fn refresh_gate(&mut self, effects: &mut Vec<WizardEffect>) {
        let ready = self.selection.is_ready();
        if ready != self.begin_enabled {
            self.begin_enabled = ready;
            effects.push(WizardEffect::BeginGateChanged(ready));
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
