//! Action types for the frontend
//!
//! Panels return `AppAction`s instead of mutating state directly; the app
//! handles them centrally in `handle_action`.

use std::path::PathBuf;

use crate::config::settings::RuntimeSettings;
use crate::error::{RecorderError, Result};
use crate::sweep::SweepParameters;

/// Actions that a panel can emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Ask for an output folder, then start a recording sweep
    StartSweep,
    /// Start the live view
    StartDisplay,
    /// Stop the running acquisition
    Stop,
    /// Stop everything and close the window
    Quit,
    /// Switch between dark and light visuals
    ToggleDarkMode,
}

/// Sweep parameters from the control inputs, checked before any folder
/// dialog is shown
pub fn prepare_sweep(settings: &RuntimeSettings, frequencies: &[f64]) -> Result<SweepParameters> {
    let params = settings.to_sweep_parameters(frequencies);
    params.validate()?;
    Ok(params)
}

/// Accept the folder picked for a sweep; a cancelled dialog aborts the start
pub fn require_output_folder(choice: Option<PathBuf>) -> Result<PathBuf> {
    choice.ok_or_else(|| {
        RecorderError::InvalidParameters("no output folder selected".to_string())
    })
}
