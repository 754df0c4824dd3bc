//! Core data types for the spectroscopy recorder
//!
//! This module contains the small value types shared between the backend
//! worker, the session layer and the frontend.
//!
//! # Main Types
//!
//! - [`AcquisitionState`] - Whether the controller is idle, displaying or recording
//! - [`ConnectionStatus`] - Probe connection state as seen by the UI
//! - [`FrameTag`] - The (frequency, pulse voltage) a frame was captured at
//! - [`SweepProgress`] - Position of the sweep as (step, total)
//! - [`SweepStats`] - Counters published to the status bar

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquisition mode of the sweep controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AcquisitionState {
    /// Not streaming, no timer armed
    #[default]
    Idle,
    /// Streaming for live view only; frames are not persisted
    DisplayOnly,
    /// Running a frequency x pulse-voltage sweep
    Recording,
}

impl AcquisitionState {
    /// Whether frames are being streamed from the probe
    pub fn is_active(&self) -> bool {
        !matches!(self, AcquisitionState::Idle)
    }

    /// Whether frames are being persisted
    pub fn is_recording(&self) -> bool {
        matches!(self, AcquisitionState::Recording)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "Idle",
            AcquisitionState::DisplayOnly => "Display",
            AcquisitionState::Recording => "Recording",
        }
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Connection status for the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to any probe
    #[default]
    Disconnected,
    /// Attempting to connect (initial or reconnect)
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection error occurred
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Acquisition settings a frame was captured with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTag {
    /// Transmit frequency in MHz
    pub frequency_mhz: f64,
    /// Pulse voltage in volts
    pub pulse_voltage: u32,
}

impl FrameTag {
    pub fn new(frequency_mhz: f64, pulse_voltage: u32) -> Self {
        Self {
            frequency_mhz,
            pulse_voltage,
        }
    }

    /// Frequency rendered for file names with `_` as separator, at least one
    /// decimal and no rounding (`7.5` -> `7_5`, `10.0` -> `10_0`,
    /// `5.04` -> `5_04`)
    pub fn frequency_label(&self) -> String {
        let mut label = self.frequency_mhz.to_string();
        if !label.contains('.') {
            label.push_str(".0");
        }
        label.replace('.', "_")
    }

    /// File name segment `<freq>MHz-<volts>V`
    pub fn file_segment(&self) -> String {
        format!("{}MHz-{}V", self.frequency_label(), self.pulse_voltage)
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz / {} V", self.frequency_mhz, self.pulse_voltage)
    }
}

/// Position within a sweep, 1-based step out of total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepProgress {
    pub step: usize,
    pub total: usize,
}

impl SweepProgress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.step as f32 / self.total as f32).min(1.0)
        }
    }
}

/// Counters about the current or last acquisition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Frames committed to the recorded buffer
    pub frames_captured: u64,
    /// Frames dropped by validation
    pub frames_rejected: u64,
    /// Frames shown in display mode
    pub frames_displayed: u64,
    /// Reconnect cycles performed
    pub reconnects: u64,
    /// Polls that saw no new frame
    pub missed_polls: u64,
}

impl SweepStats {
    /// Acceptance rate of captured frames as percentage
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_rejected;
        if total == 0 {
            100.0
        } else {
            (self.frames_captured as f64 / total as f64) * 100.0
        }
    }
}
