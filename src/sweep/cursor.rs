//! Sweep position and the raster advance policy

use super::params::SweepParameters;
use crate::types::FrameTag;

/// Result of advancing a [`SweepCursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Voltage raised at the same frequency
    Pulse,
    /// Voltage reset to the minimum, next frequency selected
    Frequency,
    /// The last point was already reached; the cursor did not move
    Complete,
}

/// Current position of a running sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCursor {
    pub frequency_index: usize,
    pub pulse_voltage: u32,
}

impl SweepCursor {
    /// Cursor at the first point of a sweep
    pub fn start(params: &SweepParameters) -> Self {
        Self {
            frequency_index: 0,
            pulse_voltage: params.pulse_min,
        }
    }

    /// Whether the cursor sits on the last point of the sweep
    pub fn is_terminal(&self, params: &SweepParameters) -> bool {
        self.pulse_voltage >= params.pulse_max
            && self.frequency_index >= params.last_frequency_index()
    }

    /// Move to the next point
    ///
    /// The terminal check happens before moving, so calling this on the last
    /// point returns [`Advance::Complete`] and leaves the cursor unchanged.
    pub fn advance(&mut self, params: &SweepParameters) -> Advance {
        if self.is_terminal(params) {
            return Advance::Complete;
        }
        if self.pulse_voltage >= params.pulse_max {
            self.pulse_voltage = params.pulse_min;
            self.frequency_index += 1;
            Advance::Frequency
        } else {
            self.pulse_voltage = self
                .pulse_voltage
                .saturating_add(params.pulse_step)
                .min(params.pulse_max);
            Advance::Pulse
        }
    }

    /// Frequency at the cursor
    pub fn frequency(&self, params: &SweepParameters) -> f64 {
        params
            .frequency(self.frequency_index)
            .unwrap_or_default()
    }

    /// Tag for a frame captured at the cursor
    pub fn tag(&self, params: &SweepParameters) -> FrameTag {
        FrameTag::new(self.frequency(params), self.pulse_voltage)
    }

    /// 1-based index of the cursor in capture order
    pub fn step_number(&self, params: &SweepParameters) -> usize {
        let within = if params.pulse_step == 0 || self.pulse_voltage >= params.pulse_max {
            params.steps_per_frequency() - 1
        } else {
            ((self.pulse_voltage - params.pulse_min) / params.pulse_step) as usize
        };
        self.frequency_index * params.steps_per_frequency() + within + 1
    }
}

/// Every point of a sweep in capture order
#[derive(Debug, Clone)]
pub struct SweepPlan<'a> {
    params: &'a SweepParameters,
    cursor: Option<SweepCursor>,
}

impl<'a> SweepPlan<'a> {
    pub fn new(params: &'a SweepParameters) -> Self {
        let cursor = if params.frequencies.is_empty() {
            None
        } else {
            Some(SweepCursor::start(params))
        };
        Self { params, cursor }
    }
}

impl Iterator for SweepPlan<'_> {
    type Item = FrameTag;

    fn next(&mut self) -> Option<FrameTag> {
        let cursor = self.cursor.as_mut()?;
        let tag = cursor.tag(self.params);
        if cursor.advance(self.params) == Advance::Complete {
            self.cursor = None;
        }
        Some(tag)
    }
}
