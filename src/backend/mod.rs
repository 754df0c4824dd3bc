//! Backend module for probe acquisition
//!
//! This module runs the sweep controller in a separate thread to keep the
//! UI responsive. It uses crossbeam channels for thread-safe communication
//! with the frontend.
//!
//! # Architecture
//!
//! The backend runs in a separate thread from the UI, communicating via channels:
//!
//! - [`BackendCommand`] - Messages sent from UI to backend (start sweep, display, stop)
//! - [`BackendMessage`] - Messages sent from backend to UI (state, frames, reports, errors)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`RecorderBackend`] - Main backend entry point that owns the worker
//!
//! # Components
//!
//! - [`UltrasoundProbe`] - Device contract driven by the controller
//! - [`SimulatedProbe`] - Synthetic probe used without hardware and in tests
//! - [`SweepController`] - The acquisition state machine
//! - [`BackendWorker`] - Main worker loop that processes commands and ticks the controller
//!
//! # Example
//!
//! ```ignore
//! use spectroscopy_recorder::backend::RecorderBackend;
//! use spectroscopy_recorder::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let (backend, frontend) = RecorderBackend::new(config);
//!
//! // Spawn backend thread
//! std::thread::spawn(move || backend.run());
//!
//! // Send commands from UI
//! frontend.start_display(0);
//!
//! // Receive messages
//! for msg in frontend.drain() {
//!     match msg {
//!         BackendMessage::LiveFrame(image) => {
//!             // Update the preview texture
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod controller;
pub mod probe_trait;
pub mod simulated_probe;
pub mod worker;

pub use controller::{ControllerEvent, StallTracker, SweepController};
pub use probe_trait::{ProbeStats, UltrasoundProbe};
pub use simulated_probe::{SimulatedFaults, SimulatedProbe};
pub use worker::BackendWorker;

use crate::config::AppConfig;
use crate::session::{FlushReport, FrameImage, NrrdSequenceWriter, SequenceWriter};
use crate::sweep::SweepParameters;
use crate::types::{AcquisitionState, ConnectionStatus, FrameTag, SweepProgress, SweepStats};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Message sent from the UI to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Record one frame per sweep point into `output_folder`
    StartSweep {
        params: SweepParameters,
        output_folder: PathBuf,
    },
    /// Stream at the first frequency for the live view (`0` = default voltage)
    StartDisplay { pulse_voltage: u32 },
    /// Stop the running acquisition, discarding unwritten frames
    Stop,
    /// Request current statistics
    RequestStats,
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Acquisition state changed
    AcquisitionState(AcquisitionState),
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// Probe now runs with these settings
    SettingsApplied(FrameTag),
    /// A frame was committed for a sweep point
    FrameCaptured {
        tag: FrameTag,
        progress: SweepProgress,
    },
    /// A frame was dropped; the sweep continues
    FrameRejected { tag: FrameTag, reason: String },
    /// Latest image for the preview
    LiveFrame(FrameImage),
    /// The probe stalled and is being reconnected
    Reconnecting,
    /// Sweep completed and its files were written
    SweepFinished(FlushReport),
    /// Acquisition ended by an error
    SweepAborted {
        reason: String,
        report: Option<FlushReport>,
    },
    /// A command failed
    Error(String),
    /// Statistics update
    Stats(SweepStats),
    /// Backend is shutting down
    Shutdown,
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Start a recording sweep
    pub fn start_sweep(&self, params: SweepParameters, output_folder: PathBuf) {
        let _ = self.command_sender.send(BackendCommand::StartSweep {
            params,
            output_folder,
        });
    }

    /// Start the live view
    pub fn start_display(&self, pulse_voltage: u32) {
        let _ = self
            .command_sender
            .send(BackendCommand::StartDisplay { pulse_voltage });
    }

    /// Stop the running acquisition
    pub fn stop(&self) {
        let _ = self.command_sender.send(BackendCommand::Stop);
    }

    /// Ask for a statistics update
    pub fn request_stats(&self) {
        let _ = self.command_sender.send(BackendCommand::RequestStats);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The acquisition backend that runs in a separate thread
pub struct RecorderBackend {
    /// The worker, ready to run
    worker: BackendWorker,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl RecorderBackend {
    /// Create a backend driving the simulated probe
    pub fn new(config: AppConfig) -> (Self, FrontendReceiver) {
        let probe = SimulatedProbe::new(config.probe.simulation.clone())
            .with_channel_name(config.probe.channel_name.clone());
        Self::with_probe(config, Box::new(probe), Box::new(NrrdSequenceWriter::new()))
    }

    /// Create a backend around the given probe and writer
    pub fn with_probe(
        config: AppConfig,
        probe: Box<dyn UltrasoundProbe>,
        writer: Box<dyn SequenceWriter>,
    ) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(256);
        // Bounded for backpressure; live frames are dropped when the UI lags
        let (msg_tx, msg_rx) = bounded(1024);

        let running = Arc::new(AtomicBool::new(true));
        let controller = SweepController::new(&config, probe, writer);
        let worker = BackendWorker::new(controller, cmd_rx, msg_tx, running.clone());

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (Self { worker, running }, frontend)
    }

    /// Run the backend loop
    pub fn run(mut self) {
        self.worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
