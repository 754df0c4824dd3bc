//! Sweep controller: the acquisition state machine
//!
//! The controller owns the sweep parameters, the sweep cursor, the
//! acquisition state, the stall tracker and the recorded frame buffer. It is
//! driven by [`SweepController::on_poll_tick`], called once per poll period
//! by the backend worker while the controller is armed.
//!
//! # States
//!
//! - `Idle` - nothing streaming, timer disarmed
//! - `DisplayOnly` - streaming at the first frequency, frames only shown
//! - `Recording` - one frame per (frequency, pulse voltage), then flush
//!
//! Every way out of `DisplayOnly`/`Recording` (completion, fatal stall,
//! device loss, explicit stop) goes back to `Idle` through [`SweepController::stop`].
//!
//! # Single flight
//!
//! A tick disarms the controller before touching the device and re-arms it
//! at the end unless the tick stopped the acquisition. The worker only runs
//! a tick while armed, so ticks never overlap.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{RecorderError, Result};
use crate::session::{
    sequence_file_path, unique_sequence_file_path, FlushReport, FrameImage, ImageOrientation,
    SequenceWriter, TrackedFrameList,
};
use crate::sweep::{Advance, SweepCursor, SweepParameters};
use crate::types::{AcquisitionState, FrameTag, SweepProgress, SweepStats};

use super::probe_trait::UltrasoundProbe;

/// Consecutive empty polls and whether a reconnect was already tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StallTracker {
    pub missed_poll_count: u32,
    pub reconnect_attempted: bool,
}

impl StallTracker {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Something that happened during a controller operation
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Probe configured with new settings and streaming
    SettingsApplied { tag: FrameTag },
    /// A frame was committed to the sweep buffer
    FrameCaptured {
        tag: FrameTag,
        progress: SweepProgress,
        image: FrameImage,
    },
    /// A frame was dropped; the sweep continues
    FrameRejected { tag: FrameTag, reason: String },
    /// A new frame is available for the live view
    FrameDisplayed { image: FrameImage },
    /// No new frame this tick
    NoFrame { missed_polls: u32 },
    /// Stall threshold reached, reconnect cycle starting
    Reconnecting,
    /// Reconnect cycle finished, streaming again
    Reconnected,
    /// All sweep points captured and written
    SweepCompleted { report: FlushReport },
    /// Acquisition ended by an error; captured frames were written when recording
    Aborted {
        reason: String,
        report: Option<FlushReport>,
    },
}

struct ActiveSweep {
    params: SweepParameters,
    cursor: SweepCursor,
    output_folder: PathBuf,
}

/// Drives the probe through a frequency x pulse-voltage sweep
pub struct SweepController {
    probe: Box<dyn UltrasoundProbe>,
    writer: Box<dyn SequenceWriter>,

    channel_name: String,
    frequencies: Vec<f64>,
    default_display_pulse_voltage: u32,
    poll_interval: Duration,
    stall_threshold: u32,
    settle_delay: Duration,
    base_name: String,
    orientation: ImageOrientation,

    state: AcquisitionState,
    sweep: Option<ActiveSweep>,
    current: Option<FrameTag>,
    stall: StallTracker,
    last_observed_frame: u64,
    recorded: TrackedFrameList,
    armed: bool,
    stats: SweepStats,
}

impl SweepController {
    pub fn new(
        config: &AppConfig,
        probe: Box<dyn UltrasoundProbe>,
        writer: Box<dyn SequenceWriter>,
    ) -> Self {
        Self {
            probe,
            writer,
            channel_name: config.probe.channel_name.clone(),
            frequencies: config.sweep.frequencies_mhz.clone(),
            default_display_pulse_voltage: config.sweep.default_display_pulse_voltage,
            poll_interval: config.acquisition.poll_interval(),
            stall_threshold: config.acquisition.stall_threshold.max(1),
            settle_delay: config.acquisition.settle_delay(),
            base_name: config.output.base_name.clone(),
            orientation: config.output.orientation,
            state: AcquisitionState::Idle,
            sweep: None,
            current: None,
            stall: StallTracker::default(),
            last_observed_frame: 0,
            recorded: TrackedFrameList::new(),
            armed: false,
            stats: SweepStats::default(),
        }
    }

    // ==================== Accessors ====================

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Whether the next poll tick should run
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stall(&self) -> StallTracker {
        self.stall
    }

    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    /// Frequency table used for sweeps and the live view
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Settings the probe currently runs with
    pub fn current_settings(&self) -> Option<FrameTag> {
        self.current
    }

    pub fn parameters(&self) -> Option<&SweepParameters> {
        self.sweep.as_ref().map(|s| &s.params)
    }

    pub fn cursor(&self) -> Option<SweepCursor> {
        self.sweep.as_ref().map(|s| s.cursor)
    }

    /// Position of the sweep, counting the point being acquired
    pub fn progress(&self) -> Option<SweepProgress> {
        self.sweep.as_ref().map(|s| SweepProgress {
            step: s.cursor.step_number(&s.params),
            total: s.params.total_steps(),
        })
    }

    /// Number of frames waiting to be written
    pub fn recorded_len(&self) -> usize {
        self.recorded.len()
    }

    pub fn probe(&self) -> &dyn UltrasoundProbe {
        self.probe.as_ref()
    }

    // ==================== Lifecycle ====================

    /// Validate `params`, connect the probe and start recording the first
    /// sweep point into `output_folder`
    ///
    /// On any error the controller is left `Idle`.
    pub fn start_sweep(&mut self, params: SweepParameters, output_folder: &Path) -> Result<()> {
        self.stop();

        params.validate()?;
        if !output_folder.is_dir() {
            return Err(RecorderError::InvalidParameters(format!(
                "output folder {:?} is not a directory",
                output_folder
            )));
        }

        tracing::info!(
            "Starting sweep: {} frequencies, pulse {}..{} V step {} V, {} frames",
            params.frequencies.len(),
            params.pulse_min,
            params.pulse_max,
            params.pulse_step,
            params.total_steps()
        );

        self.connect_probe()?;
        self.probe
            .set_pulse_range(params.pulse_min, params.pulse_max, params.pulse_step);

        let cursor = SweepCursor::start(&params);
        let first = cursor.tag(&params);
        if let Err(e) = self.apply_settings(first) {
            self.release_probe();
            return Err(e);
        }

        self.recorded.clear();
        self.stall.reset();
        self.stats = SweepStats::default();
        self.sweep = Some(ActiveSweep {
            params,
            cursor,
            output_folder: output_folder.to_path_buf(),
        });
        self.state = AcquisitionState::Recording;

        if let Err(e) = self.restart_streaming() {
            self.stop();
            return Err(e);
        }
        self.arm();
        Ok(())
    }

    /// Connect the probe and stream at the first frequency for the live view
    ///
    /// `pulse_voltage == 0` means none was entered and the configured default
    /// is used.
    pub fn start_display(&mut self, pulse_voltage: u32) -> Result<()> {
        self.stop();

        let Some(&frequency) = self.frequencies.first() else {
            return Err(RecorderError::InvalidParameters(
                "no frequency configured".to_string(),
            ));
        };
        let pulse_voltage = if pulse_voltage == 0 {
            tracing::info!(
                "The pulse is set by default to {}V",
                self.default_display_pulse_voltage
            );
            self.default_display_pulse_voltage
        } else {
            pulse_voltage
        };

        self.connect_probe()?;
        let tag = FrameTag::new(frequency, pulse_voltage);
        if let Err(e) = self.apply_settings(tag) {
            self.release_probe();
            return Err(e);
        }

        self.stall.reset();
        self.stats = SweepStats::default();
        self.state = AcquisitionState::DisplayOnly;

        if let Err(e) = self.probe.start_recording() {
            self.stop();
            return Err(e);
        }
        self.last_observed_frame = self.probe.frame_number();
        tracing::info!("Live display started at {}", tag);
        self.arm();
        Ok(())
    }

    /// Disarm, stop and disconnect the probe, drop unwritten frames, go `Idle`
    ///
    /// Does nothing when already `Idle`.
    pub fn stop(&mut self) {
        self.armed = false;
        if self.state == AcquisitionState::Idle {
            return;
        }

        self.release_probe();
        if !self.recorded.is_empty() {
            tracing::info!("Discarding {} unwritten frame(s)", self.recorded.len());
        }
        self.recorded.clear();
        self.sweep = None;
        self.current = None;
        self.stall.reset();
        self.state = AcquisitionState::Idle;
        tracing::info!("Recording stopped");
    }

    /// Stop and make sure the probe is released, even when `Idle`
    pub fn shutdown(&mut self) {
        self.stop();
        if self.probe.is_connected() {
            self.probe.stop_recording();
            self.probe.disconnect();
        }
    }

    // ==================== Poll loop ====================

    /// One step of the acquisition state machine
    ///
    /// Returns what happened; an empty list means the controller was not
    /// armed.
    pub fn on_poll_tick(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        if !self.armed || !self.state.is_active() {
            return events;
        }
        self.armed = false;

        let frame_number = self.probe.frame_number();
        tracing::trace!("Poll tick: frame number = {}", frame_number);

        if frame_number != 0 && frame_number > self.last_observed_frame {
            self.last_observed_frame = frame_number;
            self.stall.reset();
            match self.state {
                AcquisitionState::Recording => self.handle_recorded_frame(&mut events),
                AcquisitionState::DisplayOnly => self.handle_displayed_frame(&mut events),
                AcquisitionState::Idle => {}
            }
        } else {
            self.handle_missed_poll(&mut events);
        }

        if self.state.is_active() {
            self.arm();
        }
        events
    }

    fn handle_recorded_frame(&mut self, events: &mut Vec<ControllerEvent>) {
        self.probe.stop_recording();

        let Some(sweep) = self.sweep.as_ref() else {
            self.abort(
                RecorderError::Config("recording without sweep parameters".to_string()),
                events,
            );
            return;
        };
        let tag = sweep.cursor.tag(&sweep.params);
        let progress = SweepProgress {
            step: sweep.cursor.step_number(&sweep.params),
            total: sweep.params.total_steps(),
        };

        match self.commit_frame(tag) {
            Ok(image) => {
                tracing::info!(
                    "New frame acquired for {} ({}/{})",
                    tag,
                    progress.step,
                    progress.total
                );
                events.push(ControllerEvent::FrameCaptured {
                    tag,
                    progress,
                    image,
                });
            }
            Err(e) => {
                tracing::warn!("Unable to record tracked frame at {}: {}", tag, e);
                self.stats.frames_rejected += 1;
                events.push(ControllerEvent::FrameRejected {
                    tag,
                    reason: e.to_string(),
                });
            }
        }

        let next = match self.sweep.as_mut() {
            Some(sweep) => match sweep.cursor.advance(&sweep.params) {
                Advance::Complete => None,
                Advance::Pulse | Advance::Frequency => Some(sweep.cursor.tag(&sweep.params)),
            },
            None => None,
        };

        match next {
            None => {
                let report = self.flush();
                tracing::info!(
                    "Sweep complete: {} file(s) written, {} failed",
                    report.written.len(),
                    report.failed.len()
                );
                self.stop();
                events.push(ControllerEvent::SweepCompleted { report });
            }
            Some(next) => {
                let result = self
                    .apply_settings(next)
                    .and_then(|_| self.restart_streaming());
                match result {
                    Ok(()) => events.push(ControllerEvent::SettingsApplied { tag: next }),
                    Err(e) => self.abort(e, events),
                }
            }
        }
    }

    fn handle_displayed_frame(&mut self, events: &mut Vec<ControllerEvent>) {
        self.stats.frames_displayed += 1;
        match self.probe.latest_frame(&self.channel_name) {
            Some(frame) => events.push(ControllerEvent::FrameDisplayed { image: frame.image }),
            None => tracing::debug!("No frame on channel '{}' to display", self.channel_name),
        }
    }

    fn handle_missed_poll(&mut self, events: &mut Vec<ControllerEvent>) {
        self.stall.missed_poll_count += 1;
        self.stats.missed_polls += 1;

        if self.stall.missed_poll_count < self.stall_threshold {
            events.push(ControllerEvent::NoFrame {
                missed_polls: self.stall.missed_poll_count,
            });
            return;
        }

        if !self.stall.reconnect_attempted {
            tracing::warn!(
                "No images received from the probe for {} polls, reconnecting",
                self.stall.missed_poll_count
            );
            self.stall.missed_poll_count = 0;
            self.stall.reconnect_attempted = true;
            events.push(ControllerEvent::Reconnecting);
            match self.reconnect() {
                Ok(()) => {
                    self.stats.reconnects += 1;
                    events.push(ControllerEvent::Reconnected);
                }
                Err(e) => self.abort(e, events),
            }
        } else {
            let missed_polls = self.stall.missed_poll_count;
            self.abort(RecorderError::AcquisitionStalled { missed_polls }, events);
        }
    }

    // ==================== Device helpers ====================

    fn arm(&mut self) {
        self.armed = true;
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
    }

    fn connect_probe(&mut self) -> Result<()> {
        tracing::info!("Connecting to the probe");
        self.probe.connect().map_err(|e| match e {
            RecorderError::DeviceUnavailable(_) => e,
            other => RecorderError::DeviceUnavailable(other.to_string()),
        })
    }

    fn release_probe(&mut self) {
        self.probe.stop_recording();
        self.settle();
        self.probe.disconnect();
        self.settle();
    }

    fn apply_settings(&mut self, tag: FrameTag) -> Result<()> {
        self.probe.set_frequency(tag.frequency_mhz)?;
        self.probe.set_pulse_voltage(tag.pulse_voltage)?;
        self.current = Some(tag);
        tracing::debug!("Probe set to {}", tag);
        Ok(())
    }

    fn restart_streaming(&mut self) -> Result<()> {
        self.settle();
        self.probe.start_recording()?;
        self.settle();
        self.last_observed_frame = self.probe.frame_number();
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        tracing::info!("Recording stopped and probe disconnected");
        self.release_probe();

        tracing::info!("Reconnect to the probe");
        self.connect_probe()?;
        if let Some(tag) = self.current {
            self.apply_settings(tag)?;
        }
        tracing::info!("Restart the probe");
        self.probe.start_recording()?;
        self.last_observed_frame = self.probe.frame_number();
        Ok(())
    }

    fn commit_frame(&mut self, tag: FrameTag) -> Result<FrameImage> {
        let frame = self.probe.latest_frame(&self.channel_name).ok_or_else(|| {
            RecorderError::FrameCommitRejected(format!(
                "failed to get tracked frame from channel '{}'",
                self.channel_name
            ))
        })?;
        let image = frame.image.clone();
        self.recorded.add_tracked_frame(frame, tag)?;
        self.stats.frames_captured += 1;
        Ok(image)
    }

    /// Write every buffered frame to its own file and clear the buffer
    fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let frames = self.recorded.take_frames();
        if frames.is_empty() {
            tracing::warn!("Nothing to save: no tracked frames were captured");
            return report;
        }
        let Some(folder) = self.sweep.as_ref().map(|s| s.output_folder.clone()) else {
            for recorded in frames {
                report
                    .failed
                    .push((recorded.tag, "no output folder".to_string()));
            }
            return report;
        };

        let now = chrono::Local::now();
        for recorded in frames {
            let path = unique_sequence_file_path(
                sequence_file_path(&folder, &self.base_name, &recorded.tag, &now),
                &report.written,
            );
            match self
                .writer
                .write(&path, std::slice::from_ref(&recorded.frame), self.orientation)
            {
                Ok(()) => {
                    tracing::info!("Captured tracked frame saved into {:?}", path);
                    report.written.push(path);
                }
                Err(e) => {
                    tracing::error!("Failed to save tracked frame {}: {}", recorded.tag, e);
                    report.failed.push((recorded.tag, e.to_string()));
                }
            }
        }
        report
    }

    /// End the acquisition after a sweep-fatal error, writing what was captured
    fn abort(&mut self, error: RecorderError, events: &mut Vec<ControllerEvent>) {
        tracing::error!("Acquisition aborted: {}", error);
        let report = if self.state.is_recording() {
            Some(self.flush())
        } else {
            None
        };
        self.stop();
        events.push(ControllerEvent::Aborted {
            reason: error.to_string(),
            report,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::probe_trait::MockUltrasoundProbe;
    use crate::backend::simulated_probe::{SimulatedFaults, SimulatedProbe};
    use crate::config::SimulationConfig;
    use crate::session::{FrameTransform, NrrdSequenceWriter, TrackedFrame, TransformStatus};

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.acquisition.settle_delay_ms = 0;
        config.acquisition.poll_interval_ms = 1;
        config.probe.simulation = SimulationConfig {
            image_width: 4,
            image_height: 4,
            polls_per_frame: 1,
        };
        config
    }

    fn controller_with(faults: SimulatedFaults) -> SweepController {
        let config = test_config();
        let probe = SimulatedProbe::new(config.probe.simulation.clone()).with_faults(faults);
        SweepController::new(&config, Box::new(probe), Box::new(NrrdSequenceWriter::new()))
    }

    fn run_to_idle(controller: &mut SweepController, max_ticks: usize) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        for _ in 0..max_ticks {
            if !controller.is_armed() {
                break;
            }
            events.extend(controller.on_poll_tick());
        }
        events
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_full_sweep_writes_one_file_per_point() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        let params = SweepParameters::with_default_frequencies(20, 40, 10);

        controller.start_sweep(params, dir.path()).unwrap();
        assert_eq!(controller.state(), AcquisitionState::Recording);
        assert!(controller.is_armed());
        assert_eq!(controller.current_settings(), Some(FrameTag::new(5.0, 20)));

        let events = run_to_idle(&mut controller, 1000);

        let captured: Vec<FrameTag> = events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::FrameCaptured { tag, .. } => Some(*tag),
                _ => None,
            })
            .collect();
        let expected: Vec<FrameTag> = [5.0, 7.5, 10.0]
            .iter()
            .flat_map(|&f| [20, 30, 40].map(|v| FrameTag::new(f, v)))
            .collect();
        assert_eq!(captured, expected);

        let report = events.iter().find_map(|e| match e {
            ControllerEvent::SweepCompleted { report } => Some(report.clone()),
            _ => None,
        });
        let report = report.expect("sweep should complete");
        assert_eq!(report.written.len(), 9);
        assert!(report.is_complete());

        let names = files_in(dir.path());
        assert_eq!(names.len(), 9);
        assert!(names.iter().any(|n| n.starts_with("VideoBufferMetafile_Rfmode-7_5MHz-30V-")));
        assert!(names.iter().all(|n| n.ends_with(".nrrd")));

        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert!(!controller.is_armed());
        assert!(!controller.probe().is_connected());
        assert_eq!(controller.stats().frames_captured, 9);
    }

    #[test]
    fn test_progress_reports_step_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        controller
            .start_sweep(SweepParameters::new(vec![5.0, 7.5], 10, 20, 10), dir.path())
            .unwrap();
        assert_eq!(controller.progress(), Some(SweepProgress { step: 1, total: 4 }));

        let events = run_to_idle(&mut controller, 100);
        let steps: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::FrameCaptured { progress, .. } => Some(progress.step),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_parameters_leave_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        let err = controller
            .start_sweep(SweepParameters::with_default_frequencies(0, 40, 10), dir.path())
            .unwrap_err();
        assert!(matches!(err, RecorderError::InvalidParameters(_)));
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert!(!controller.is_armed());
        assert_eq!(controller.probe().stats().connects, 0);
    }

    #[test]
    fn test_missing_output_folder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        let err = controller
            .start_sweep(
                SweepParameters::with_default_frequencies(20, 40, 10),
                &dir.path().join("nope"),
            )
            .unwrap_err();
        assert!(matches!(err, RecorderError::InvalidParameters(_)));
    }

    #[test]
    fn test_connect_failure_is_device_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MockUltrasoundProbe::new();
        probe
            .expect_connect()
            .times(1)
            .returning(|| Err(RecorderError::Io(std::io::Error::other("usb gone"))));

        let mut controller = SweepController::new(
            &test_config(),
            Box::new(probe),
            Box::new(NrrdSequenceWriter::new()),
        );
        let err = controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap_err();
        assert!(matches!(err, RecorderError::DeviceUnavailable(_)));
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert!(!controller.is_armed());
    }

    #[test]
    fn test_streaming_failure_releases_probe() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = MockUltrasoundProbe::new();
        probe.expect_connect().times(1).returning(|| Ok(()));
        probe.expect_set_pulse_range().returning(|_, _, _| ());
        probe.expect_set_frequency().returning(|_| Ok(()));
        probe.expect_set_pulse_voltage().returning(|_| Ok(()));
        probe
            .expect_start_recording()
            .times(1)
            .returning(|| Err(RecorderError::DeviceUnavailable("no stream".into())));
        probe.expect_stop_recording().returning(|| ());
        probe.expect_disconnect().times(1).returning(|| ());

        let mut controller = SweepController::new(
            &test_config(),
            Box::new(probe),
            Box::new(NrrdSequenceWriter::new()),
        );
        let err = controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap_err();
        assert!(matches!(err, RecorderError::DeviceUnavailable(_)));
        assert_eq!(controller.state(), AcquisitionState::Idle);
    }

    #[test]
    fn test_stop_mid_sweep_discards_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();

        controller.on_poll_tick();
        controller.on_poll_tick();
        assert_eq!(controller.recorded_len(), 2);

        controller.stop();
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert_eq!(controller.recorded_len(), 0);
        assert!(!controller.is_armed());
        assert!(!controller.probe().is_connected());
        assert!(files_in(dir.path()).is_empty());

        // Idempotent
        let disconnects = controller.probe().stats().disconnects;
        controller.stop();
        assert_eq!(controller.probe().stats().disconnects, disconnects);
        assert!(controller.on_poll_tick().is_empty());
    }

    #[test]
    fn test_stall_reconnects_once_then_aborts_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default().stall_permanently_after(2));
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 1000);

        let reconnects = events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::Reconnected))
            .count();
        assert_eq!(reconnects, 1);
        assert_eq!(controller.probe().stats().connects, 2);

        let missed = events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::NoFrame { .. }))
            .count();
        // Two runs of 50 empty polls; the 50th of each run escalates instead
        assert_eq!(missed, 2 * 49);

        let aborted = events.iter().find_map(|e| match e {
            ControllerEvent::Aborted { reason, report } => Some((reason.clone(), report.clone())),
            _ => None,
        });
        let (reason, report) = aborted.expect("stall should abort the sweep");
        assert!(reason.contains("stalled"));
        let report = report.expect("recording abort flushes");
        assert_eq!(report.written.len(), controller.stats().frames_captured as usize);
        assert_eq!(files_in(dir.path()).len(), report.written.len());
        assert!(!report.written.is_empty());
        assert_eq!(controller.state(), AcquisitionState::Idle);
    }

    #[test]
    fn test_reconnect_recovers_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default().stall_after(4));
        controller
            .start_sweep(SweepParameters::new(vec![5.0], 10, 30, 10), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 1000);
        assert!(events.iter().any(|e| matches!(e, ControllerEvent::Reconnected)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::SweepCompleted { .. })));
        assert_eq!(files_in(dir.path()).len(), 3);
        assert_eq!(controller.stats().reconnects, 1);
    }

    #[test]
    fn test_reconnect_reapplies_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        // Each point costs a baseline frame and a captured frame; eight frames
        // cover 5 MHz and 7.5 MHz / 20 V, so the stall hits at 7.5 MHz / 30 V
        let mut controller = controller_with(SimulatedFaults::default().stall_after(8));
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();

        let mut reconnected = false;
        for _ in 0..1000 {
            if controller
                .on_poll_tick()
                .iter()
                .any(|e| matches!(e, ControllerEvent::Reconnected))
            {
                reconnected = true;
                break;
            }
        }
        assert!(reconnected);

        assert_eq!(controller.probe().stats().connects, 2);
        assert_eq!(controller.current_settings(), Some(FrameTag::new(7.5, 30)));
        assert_eq!(controller.probe().frequency(), 7.5);
        assert_eq!(controller.probe().pulse_voltage(), 30);
        assert_eq!(controller.state(), AcquisitionState::Recording);
    }

    #[test]
    fn test_frequencies_with_close_labels_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        controller
            .start_sweep(SweepParameters::new(vec![5.0, 5.04], 30, 30, 0), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 100);
        let report = events
            .iter()
            .find_map(|e| match e {
                ControllerEvent::SweepCompleted { report } => Some(report.clone()),
                _ => None,
            })
            .expect("sweep should complete");

        let names = files_in(dir.path());
        assert_eq!(report.written.len(), 2);
        assert_eq!(names.len(), report.written.len());
        assert!(names.iter().any(|n| n.contains("-5_0MHz-30V-")));
        assert!(names.iter().any(|n| n.contains("-5_04MHz-30V-")));
    }

    #[test]
    fn test_repeated_frequency_does_not_overwrite_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        controller
            .start_sweep(SweepParameters::new(vec![7.5, 7.5], 20, 20, 0), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 100);
        let report = events
            .iter()
            .find_map(|e| match e {
                ControllerEvent::SweepCompleted { report } => Some(report.clone()),
                _ => None,
            })
            .expect("sweep should complete");

        assert_eq!(report.written.len(), 2);
        assert_ne!(report.written[0], report.written[1]);
        assert_eq!(files_in(dir.path()).len(), 2);
    }

    #[test]
    fn test_failed_reconnect_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(
            SimulatedFaults::default()
                .stall_permanently_after(2)
                .max_connects(1),
        );
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 1000);
        assert!(!events.iter().any(|e| matches!(e, ControllerEvent::Reconnected)));
        let reason = events.iter().find_map(|e| match e {
            ControllerEvent::Aborted { reason, .. } => Some(reason.clone()),
            _ => None,
        });
        assert!(reason.unwrap().contains("Device unavailable"));
        assert_eq!(controller.state(), AcquisitionState::Idle);
    }

    #[test]
    fn test_invalid_transforms_are_rejected_but_sweep_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(
            SimulatedFaults::default()
                .with_transform(FrameTransform::new("ProbeToTracker", TransformStatus::Invalid)),
        );
        controller
            .start_sweep(SweepParameters::new(vec![5.0, 7.5], 10, 20, 10), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 100);
        let rejected = events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::FrameRejected { .. }))
            .count();
        assert_eq!(rejected, 4);
        assert_eq!(controller.stats().frames_rejected, 4);
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::SweepCompleted { report } if report.total() == 0)));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_display_mode_uses_default_voltage() {
        let mut controller = controller_with(SimulatedFaults::default());
        controller.start_display(0).unwrap();
        assert_eq!(controller.state(), AcquisitionState::DisplayOnly);
        assert_eq!(controller.current_settings(), Some(FrameTag::new(5.0, 20)));

        let events: Vec<_> = (0..5).flat_map(|_| controller.on_poll_tick()).collect();
        let displayed = events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::FrameDisplayed { .. }))
            .count();
        assert_eq!(displayed, 5);
        assert!(controller.cursor().is_none());
        assert_eq!(controller.recorded_len(), 0);
        assert_eq!(controller.state(), AcquisitionState::DisplayOnly);

        controller.stop();
        assert_eq!(controller.state(), AcquisitionState::Idle);
    }

    #[test]
    fn test_display_mode_keeps_entered_voltage() {
        let mut controller = controller_with(SimulatedFaults::default());
        controller.start_display(35).unwrap();
        assert_eq!(controller.current_settings(), Some(FrameTag::new(5.0, 35)));
        assert_eq!(controller.probe().pulse_voltage(), 35);
    }

    #[test]
    fn test_display_stall_aborts_without_flush() {
        let mut controller = controller_with(SimulatedFaults::default().stall_permanently_after(0));
        controller.start_display(20).unwrap();
        let events = run_to_idle(&mut controller, 1000);
        assert!(events.iter().any(|e| matches!(
            e,
            ControllerEvent::Aborted { report: None, .. }
        )));
        assert_eq!(controller.state(), AcquisitionState::Idle);
    }

    #[test]
    fn test_write_failure_abandons_only_that_frame() {
        struct FailAt30V {
            written: usize,
        }
        impl SequenceWriter for FailAt30V {
            fn write(
                &mut self,
                path: &Path,
                frames: &[TrackedFrame],
                _orientation: ImageOrientation,
            ) -> Result<()> {
                if path.to_string_lossy().contains("-30V-") {
                    return Err(RecorderError::WriteFailure("disk full".into()));
                }
                self.written += frames.len();
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = test_config();
        let probe = SimulatedProbe::new(config.probe.simulation.clone());
        let mut controller =
            SweepController::new(&config, Box::new(probe), Box::new(FailAt30V { written: 0 }));
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();

        let events = run_to_idle(&mut controller, 1000);
        let report = events
            .iter()
            .find_map(|e| match e {
                ControllerEvent::SweepCompleted { report } => Some(report.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(report.written.len(), 6);
        assert_eq!(report.failed.len(), 3);
        assert!(report.failed.iter().all(|(tag, _)| tag.pulse_voltage == 30));
    }

    #[test]
    fn test_restart_while_active_stops_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_with(SimulatedFaults::default());
        controller.start_display(0).unwrap();
        controller
            .start_sweep(SweepParameters::with_default_frequencies(20, 40, 10), dir.path())
            .unwrap();
        assert_eq!(controller.state(), AcquisitionState::Recording);
        assert_eq!(controller.probe().stats().connects, 2);
        assert_eq!(controller.probe().stats().disconnects, 1);
    }
}
