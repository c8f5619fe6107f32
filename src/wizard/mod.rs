#[cfg(feature = "desktop")]
pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{ReleaseWizard, WizardSnapshot};
pub use state::{
    CustomField, Selection, WizardEffect, WizardError, WizardEvent, WizardPhase, WizardState,
};
