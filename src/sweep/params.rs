//! Sweep parameters and their validation

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

/// Frequencies swept by the array probe, in MHz
pub const DEFAULT_FREQUENCIES_MHZ: [f64; 3] = [5.0, 7.5, 10.0];

/// Bounds of a frequency x pulse-voltage sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepParameters {
    /// Ordered transmit frequencies in MHz
    pub frequencies: Vec<f64>,
    /// Lowest pulse voltage (V)
    pub pulse_min: u32,
    /// Highest pulse voltage (V)
    pub pulse_max: u32,
    /// Voltage increment (V); ignored when `pulse_min == pulse_max`
    pub pulse_step: u32,
}

impl SweepParameters {
    pub fn new(frequencies: Vec<f64>, pulse_min: u32, pulse_max: u32, pulse_step: u32) -> Self {
        Self {
            frequencies,
            pulse_min,
            pulse_max,
            pulse_step,
        }
    }

    /// Same pulse bounds over the default frequency table
    pub fn with_default_frequencies(pulse_min: u32, pulse_max: u32, pulse_step: u32) -> Self {
        Self::new(DEFAULT_FREQUENCIES_MHZ.to_vec(), pulse_min, pulse_max, pulse_step)
    }

    /// Check the sweep invariants
    ///
    /// Fails with [`RecorderError::InvalidParameters`] when a bound is zero,
    /// the bounds are reversed, the step is zero or larger than the range,
    /// or the frequency list is empty or holds a non-positive value.
    pub fn validate(&self) -> Result<()> {
        if self.frequencies.is_empty() {
            return Err(RecorderError::InvalidParameters(
                "at least one frequency is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .frequencies
            .iter()
            .find(|f| !f.is_finite() || **f <= 0.0)
        {
            return Err(RecorderError::InvalidParameters(format!(
                "frequency {} MHz is not a positive value",
                bad
            )));
        }
        if self.pulse_min == 0 || self.pulse_max == 0 {
            return Err(RecorderError::InvalidParameters(
                "pulse voltages must be strictly positive".to_string(),
            ));
        }
        if self.pulse_min > self.pulse_max {
            return Err(RecorderError::InvalidParameters(format!(
                "pulse minimum {} V is bigger than the maximum {} V",
                self.pulse_min, self.pulse_max
            )));
        }
        if self.pulse_min != self.pulse_max
            && (self.pulse_step == 0 || self.pulse_step > self.pulse_max - self.pulse_min)
        {
            return Err(RecorderError::InvalidParameters(format!(
                "pulse step {} V is zero or bigger than the range {}..{} V",
                self.pulse_step, self.pulse_min, self.pulse_max
            )));
        }
        Ok(())
    }

    /// Number of voltage levels visited at each frequency
    pub fn steps_per_frequency(&self) -> usize {
        if self.pulse_min >= self.pulse_max || self.pulse_step == 0 {
            return 1;
        }
        let range = self.pulse_max - self.pulse_min;
        range.div_ceil(self.pulse_step) as usize + 1
    }

    /// Number of frames a complete sweep captures
    pub fn total_steps(&self) -> usize {
        self.steps_per_frequency() * self.frequencies.len()
    }

    /// Frequency at `index`, if any
    pub fn frequency(&self, index: usize) -> Option<f64> {
        self.frequencies.get(index).copied()
    }

    /// Index of the last frequency
    pub fn last_frequency_index(&self) -> usize {
        self.frequencies.len().saturating_sub(1)
    }
}
