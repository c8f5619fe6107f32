pub mod journal;
pub mod release;

pub use journal::JournalEntry;
pub use release::{
    Emotion, EmotionChoice, ReleaseDraft, ReleaseRecord, ReleaseStep, Sensation, SensationChoice,
    StepResponse,
};
