//! UltrasoundProbe trait for a unified probe interface
//!
//! This module provides the narrow device contract the sweep controller
//! drives, so the vendor-backed probe and the simulated probe are
//! interchangeable.

use crate::error::Result;
use crate::session::TrackedFrame;

/// Statistics for probe operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Successful connections
    pub connects: u64,
    /// Refused connections
    pub failed_connects: u64,
    /// Disconnections
    pub disconnects: u64,
    /// Times streaming was started
    pub streaming_starts: u64,
    /// Times streaming was stopped
    pub streaming_stops: u64,
    /// Frames produced by the device
    pub frames_produced: u64,
}

impl ProbeStats {
    /// Record a connection attempt
    pub fn record_connect(&mut self, success: bool) {
        if success {
            self.connects += 1;
        } else {
            self.failed_connects += 1;
        }
    }
}

/// Unified interface for ultrasound probes
///
/// Implementations must be `Send` so the probe can live on the backend
/// worker thread.
///
/// # Example
///
/// ```ignore
/// fn configure(probe: &mut dyn UltrasoundProbe) -> Result<()> {
///     probe.connect()?;
///     probe.set_frequency(5.0)?;
///     probe.set_pulse_voltage(20)?;
///     probe.start_recording()
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait UltrasoundProbe: Send {
    /// Connect to the probe
    fn connect(&mut self) -> Result<()>;

    /// Disconnect from the probe
    fn disconnect(&mut self);

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Start streaming frames
    fn start_recording(&mut self) -> Result<()>;

    /// Stop streaming frames
    fn stop_recording(&mut self);

    /// Check if frames are being streamed
    fn is_recording(&self) -> bool;

    /// Set the transmit frequency in MHz
    fn set_frequency(&mut self, frequency_mhz: f64) -> Result<()>;

    /// Current transmit frequency in MHz
    fn frequency(&self) -> f64;

    /// Set the pulse voltage in volts
    fn set_pulse_voltage(&mut self, volts: u32) -> Result<()>;

    /// Current pulse voltage in volts
    fn pulse_voltage(&self) -> u32;

    /// Store the pulse range of the running sweep (min, max, step)
    fn set_pulse_range(&mut self, min: u32, max: u32, step: u32);

    /// Pulse range as (min, max, step)
    fn pulse_range(&self) -> (u32, u32, u32);

    /// Monotonic frame counter; `0` means no frame yet
    fn frame_number(&mut self) -> u64;

    /// Latest frame of the named output channel, if the channel exists and
    /// has produced one
    fn latest_frame(&self, channel: &str) -> Option<TrackedFrame>;

    /// Get probe operation statistics
    fn stats(&self) -> &ProbeStats;
}
