//! Test data builders for creating test objects

use spectroscopy_recorder::config::{AppConfig, SimulationConfig};
use spectroscopy_recorder::SweepParameters;

/// Builder for creating test SweepParameters
pub struct SweepBuilder {
    frequencies: Vec<f64>,
    pulse_min: u32,
    pulse_max: u32,
    pulse_step: u32,
}

impl SweepBuilder {
    /// The reference sweep: 5, 7.5, 10 MHz at 20..40 V in 10 V steps
    pub fn new() -> Self {
        Self {
            frequencies: vec![5.0, 7.5, 10.0],
            pulse_min: 20,
            pulse_max: 40,
            pulse_step: 10,
        }
    }

    pub fn frequencies(mut self, frequencies: &[f64]) -> Self {
        self.frequencies = frequencies.to_vec();
        self
    }

    pub fn pulse(mut self, min: u32, max: u32, step: u32) -> Self {
        self.pulse_min = min;
        self.pulse_max = max;
        self.pulse_step = step;
        self
    }

    pub fn build(self) -> SweepParameters {
        SweepParameters::new(
            self.frequencies,
            self.pulse_min,
            self.pulse_max,
            self.pulse_step,
        )
    }
}

/// Builder for an AppConfig that runs fast under test
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// 1 ms polls, no settle delay, tiny images, one frame per poll
    pub fn fast() -> Self {
        let mut config = AppConfig::default();
        config.acquisition.poll_interval_ms = 1;
        config.acquisition.settle_delay_ms = 0;
        config.probe.simulation = SimulationConfig {
            image_width: 8,
            image_height: 8,
            polls_per_frame: 1,
        };
        Self { config }
    }

    pub fn stall_threshold(mut self, threshold: u32) -> Self {
        self.config.acquisition.stall_threshold = threshold;
        self
    }

    pub fn base_name(mut self, name: &str) -> Self {
        self.config.output.base_name = name.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_builder() {
        let params = SweepBuilder::new().pulse(10, 30, 5).build();
        assert_eq!(params.pulse_min, 10);
        assert_eq!(params.pulse_step, 5);
        assert_eq!(params.frequencies.len(), 3);
    }
}
