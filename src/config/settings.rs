//! Runtime settings edited in the control panel
//!
//! These are the live values of the pulse inputs and the output folder
//! chosen for the next sweep. They are turned into [`SweepParameters`] when a
//! sweep starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::AppState;
use crate::sweep::SweepParameters;

/// Values of the control panel inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Lowest pulse voltage (V)
    pub pulse_min: u32,
    /// Highest pulse voltage (V)
    pub pulse_max: u32,
    /// Voltage increment (V)
    pub pulse_step: u32,
    /// Folder chosen for the current sweep
    pub output_folder: Option<PathBuf>,
}

impl RuntimeSettings {
    /// Restore the inputs remembered from the previous launch
    pub fn from_app_state(state: &AppState) -> Self {
        Self {
            pulse_min: state.last_pulse_min,
            pulse_max: state.last_pulse_max,
            pulse_step: state.last_pulse_step,
            output_folder: state.last_output_folder.clone(),
        }
    }

    /// Sweep over `frequencies` with the current pulse inputs
    pub fn to_sweep_parameters(&self, frequencies: &[f64]) -> SweepParameters {
        SweepParameters::new(
            frequencies.to_vec(),
            self.pulse_min,
            self.pulse_max,
            self.pulse_step,
        )
    }

    /// Pulse voltage for the live view; `0` when nothing was entered
    pub fn display_pulse_voltage(&self) -> u32 {
        self.pulse_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_settings_default() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.pulse_min, 0);
        assert!(settings.output_folder.is_none());
        assert_eq!(settings.display_pulse_voltage(), 0);
    }

    #[test]
    fn test_to_sweep_parameters() {
        let settings = RuntimeSettings {
            pulse_min: 20,
            pulse_max: 40,
            pulse_step: 10,
            output_folder: None,
        };
        let params = settings.to_sweep_parameters(&[5.0, 7.5]);
        assert_eq!(params.frequencies, vec![5.0, 7.5]);
        assert_eq!(params.pulse_step, 10);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_app_state() {
        let state = AppState {
            last_pulse_min: 15,
            last_pulse_max: 45,
            last_pulse_step: 5,
            last_output_folder: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        };
        let settings = RuntimeSettings::from_app_state(&state);
        assert_eq!(settings.pulse_min, 15);
        assert_eq!(settings.output_folder, Some(PathBuf::from("/tmp/out")));
    }
}
