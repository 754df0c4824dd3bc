//! Simulated Probe Implementation
//!
//! This module provides a simulated ultrasound probe that can be used to run
//! the application and its tests without hardware. It behaves like the real
//! device as far as the sweep controller can tell: a frame counter that only
//! moves while streaming, settings that are only accepted while connected,
//! and a latest-frame buffer on a named output channel.
//!
//! # Frame generation
//!
//! While streaming, every `polls_per_frame`-th read of the frame counter
//! produces a new frame. The image is a speckle pattern whose brightness
//! grows with the pulse voltage and whose depth attenuation grows with the
//! frequency, so frames from different sweep points are distinguishable.
//!
//! # Fault injection
//!
//! [`SimulatedFaults`] can make the probe refuse connections, stop producing
//! frames after a number of frames (until the next reconnect, or for good),
//! and attach transforms with a chosen validity to every frame.
//!
//! # Example
//!
//! ```ignore
//! use spectroscopy_recorder::backend::{SimulatedProbe, SimulatedFaults};
//!
//! let mut probe = SimulatedProbe::new(Default::default())
//!     .with_faults(SimulatedFaults::default().stall_after(3));
//! probe.connect()?;
//! probe.start_recording()?;
//! ```

use crate::config::{SimulationConfig, DEFAULT_CHANNEL_NAME};
use crate::error::{RecorderError, Result};
use crate::session::{FrameImage, FrameTransform, TrackedFrame};

use super::probe_trait::{ProbeStats, UltrasoundProbe};

/// Seconds between two simulated frames, used for timestamps
const FRAME_PERIOD_S: f64 = 0.1;

/// Faults the simulated probe can inject
#[derive(Debug, Clone, Default)]
pub struct SimulatedFaults {
    /// Refuse every connection
    pub refuse_connect: bool,
    /// Accept this many connections, refuse the following ones
    pub max_connects: Option<u64>,
    /// Stop producing frames after this many frames
    pub stall_after_frames: Option<u64>,
    /// When false a reconnect clears the stall
    pub stall_persists: bool,
    /// Transforms attached to every produced frame
    pub transforms: Vec<FrameTransform>,
}

impl SimulatedFaults {
    pub fn refuse_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn max_connects(mut self, count: u64) -> Self {
        self.max_connects = Some(count);
        self
    }

    /// Stall after `frames` frames; a reconnect resumes production
    pub fn stall_after(mut self, frames: u64) -> Self {
        self.stall_after_frames = Some(frames);
        self.stall_persists = false;
        self
    }

    /// Stall after `frames` frames for good
    pub fn stall_permanently_after(mut self, frames: u64) -> Self {
        self.stall_after_frames = Some(frames);
        self.stall_persists = true;
        self
    }

    pub fn with_transform(mut self, transform: FrameTransform) -> Self {
        self.transforms.push(transform);
        self
    }
}

/// Probe producing synthetic frames
#[derive(Debug)]
pub struct SimulatedProbe {
    config: SimulationConfig,
    channel_name: String,
    faults: SimulatedFaults,
    connected: bool,
    streaming: bool,
    frequency_mhz: f64,
    pulse_voltage: u32,
    pulse_range: (u32, u32, u32),
    frame_number: u64,
    polls_since_frame: u32,
    frames_since_connect: u64,
    latest: Option<TrackedFrame>,
    seed: u64,
    stats: ProbeStats,
}

impl SimulatedProbe {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            faults: SimulatedFaults::default(),
            connected: false,
            streaming: false,
            frequency_mhz: 0.0,
            pulse_voltage: 0,
            pulse_range: (0, 0, 0),
            frame_number: 0,
            polls_since_frame: 0,
            frames_since_connect: 0,
            latest: None,
            seed: 0x2545_f491_4f6c_dd1d,
            stats: ProbeStats::default(),
        }
    }

    /// Serve frames on a different output channel
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_faults(mut self, faults: SimulatedFaults) -> Self {
        self.faults = faults;
        self
    }

    fn is_stalled(&self) -> bool {
        match self.faults.stall_after_frames {
            Some(limit) if self.faults.stall_persists => self.stats.frames_produced >= limit,
            Some(limit) => self.frames_since_connect >= limit,
            None => false,
        }
    }

    fn next_noise(&mut self) -> f64 {
        let mut s = self.seed;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.seed = s;
        (s as f64) / (u64::MAX as f64)
    }

    fn synthesize_image(&mut self) -> FrameImage {
        let (width, height) = (self.config.image_width, self.config.image_height);
        let gain = (self.pulse_voltage as f64 / 100.0).min(1.0);
        let attenuation = self.frequency_mhz.max(0.0) * 0.5;
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let depth = y as f64 / height.max(1) as f64;
            let envelope = gain * (-attenuation * depth).exp();
            for _ in 0..width {
                let speckle = self.next_noise();
                pixels.push((255.0 * envelope * speckle).clamp(0.0, 255.0) as u8);
            }
        }
        FrameImage::new(width, height, pixels)
    }

    fn produce_frame(&mut self) {
        self.frame_number += 1;
        self.frames_since_connect += 1;
        self.stats.frames_produced += 1;

        let image = self.synthesize_image();
        let mut frame = TrackedFrame::new(self.frame_number as f64 * FRAME_PERIOD_S, image);
        frame.transforms = self.faults.transforms.clone();
        self.latest = Some(frame);
    }

    fn require_connected(&self, what: &str) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(RecorderError::DeviceUnavailable(format!(
                "cannot {} while disconnected",
                what
            )))
        }
    }
}

impl UltrasoundProbe for SimulatedProbe {
    fn connect(&mut self) -> Result<()> {
        let over_limit = self
            .faults
            .max_connects
            .is_some_and(|max| self.stats.connects >= max);
        if self.faults.refuse_connect || over_limit {
            self.stats.record_connect(false);
            return Err(RecorderError::DeviceUnavailable(
                "simulated probe refused the connection".to_string(),
            ));
        }
        self.connected = true;
        self.frames_since_connect = 0;
        self.polls_since_frame = 0;
        self.stats.record_connect(true);
        tracing::debug!("Simulated probe connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.stats.disconnects += 1;
        }
        self.streaming = false;
        self.connected = false;
        self.frequency_mhz = 0.0;
        self.pulse_voltage = 0;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn start_recording(&mut self) -> Result<()> {
        self.require_connected("start streaming")?;
        self.streaming = true;
        self.polls_since_frame = 0;
        self.stats.streaming_starts += 1;
        Ok(())
    }

    fn stop_recording(&mut self) {
        if self.streaming {
            self.stats.streaming_stops += 1;
        }
        self.streaming = false;
    }

    fn is_recording(&self) -> bool {
        self.streaming
    }

    fn set_frequency(&mut self, frequency_mhz: f64) -> Result<()> {
        self.require_connected("set the frequency")?;
        self.frequency_mhz = frequency_mhz;
        Ok(())
    }

    fn frequency(&self) -> f64 {
        self.frequency_mhz
    }

    fn set_pulse_voltage(&mut self, volts: u32) -> Result<()> {
        self.require_connected("set the pulse voltage")?;
        self.pulse_voltage = volts;
        Ok(())
    }

    fn pulse_voltage(&self) -> u32 {
        self.pulse_voltage
    }

    fn set_pulse_range(&mut self, min: u32, max: u32, step: u32) {
        self.pulse_range = (min, max, step);
    }

    fn pulse_range(&self) -> (u32, u32, u32) {
        self.pulse_range
    }

    fn frame_number(&mut self) -> u64 {
        if self.streaming && !self.is_stalled() {
            self.polls_since_frame += 1;
            if self.polls_since_frame >= self.config.polls_per_frame.max(1) {
                self.polls_since_frame = 0;
                self.produce_frame();
            }
        }
        self.frame_number
    }

    fn latest_frame(&self, channel: &str) -> Option<TrackedFrame> {
        if channel != self.channel_name {
            return None;
        }
        self.latest.clone()
    }

    fn stats(&self) -> &ProbeStats {
        &self.stats
    }
}
