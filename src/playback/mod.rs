#[cfg(feature = "desktop")]
pub mod commands;
pub mod continuity;
pub mod driver;
pub mod state;

pub use continuity::{PlaybackContinuity, PlaybackSnapshot};
pub use driver::PlaybackDriver;
pub use state::{
    ContinuityState, ContinuityTiming, PersistedPlayback, PlayOrigin, PlaybackEffect,
    PlaybackEvent, PlaybackPhase,
};
