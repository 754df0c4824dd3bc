//! Backend Worker Thread Implementation
//!
//! This module contains the main worker loop that runs in a separate thread
//! and drives the sweep controller. It communicates with the UI thread
//! through crossbeam channels.
//!
//! # Responsibilities
//!
//! The worker thread handles:
//!
//! - **Command processing**: Responds to UI commands (start sweep, display, stop, quit)
//! - **Poll ticks**: Runs the controller once per poll interval while it is armed
//! - **Event forwarding**: Turns controller events into [`BackendMessage`]s
//! - **Statistics**: Sends sweep counters to the UI periodically
//!
//! # Rate Limiting
//!
//! Each loop iteration sleeps for what is left of the poll interval
//! (default 100 ms), so the controller is ticked at the configured rate and
//! never twice at once.

use crate::backend::controller::{ControllerEvent, SweepController};
use crate::backend::{BackendCommand, BackendMessage};
use crate::error::RecorderError;
use crate::sweep::SweepParameters;
use crate::types::{AcquisitionState, ConnectionStatus};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between two statistics updates sent to the UI
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// The backend worker that runs the acquisition loop
pub struct BackendWorker {
    /// The acquisition state machine
    controller: SweepController,
    /// Command receiver from the UI
    command_rx: Receiver<BackendCommand>,
    /// Message sender to the UI
    message_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Current connection status
    connection_status: ConnectionStatus,
    /// Last state reported to the UI
    reported_state: AcquisitionState,
    /// Last loop iteration, for rate limiting
    last_poll_time: Instant,
    /// Last time stats were sent to UI
    last_stats_time: Instant,
    /// Messages dropped because the UI queue was full
    dropped_messages: u64,
}

impl BackendWorker {
    /// Create a new backend worker
    pub fn new(
        controller: SweepController,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            controller,
            command_rx,
            message_tx,
            running,
            connection_status: ConnectionStatus::Disconnected,
            reported_state: AcquisitionState::Idle,
            last_poll_time: Instant::now(),
            last_stats_time: Instant::now(),
            dropped_messages: 0,
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Backend worker started");

        while self.running.load(Ordering::SeqCst) {
            self.run_once();

            if self.controller.state().is_active()
                && self.last_stats_time.elapsed() >= STATS_INTERVAL
            {
                self.send_stats();
                self.last_stats_time = Instant::now();
            }

            self.rate_limit();
        }

        // Cleanup
        self.controller.shutdown();
        self.sync_state();

        let _ = self.message_tx.send(BackendMessage::Shutdown);
        tracing::info!("Backend worker stopped");
    }

    /// Process pending commands, then run one poll tick if armed
    pub fn run_once(&mut self) {
        self.process_commands();
        if self.running.load(Ordering::SeqCst) && self.controller.is_armed() {
            let events = self.controller.on_poll_tick();
            for event in events {
                self.forward_event(event);
            }
            self.sync_state();
        }
    }

    /// Process pending commands from the UI
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::StartSweep {
                params,
                output_folder,
            } => {
                self.start_sweep(params, output_folder);
            }
            BackendCommand::StartDisplay { pulse_voltage } => {
                self.start_display(pulse_voltage);
            }
            BackendCommand::Stop => {
                self.controller.stop();
                self.sync_state();
            }
            BackendCommand::RequestStats => {
                self.send_stats();
            }
            BackendCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn start_sweep(&mut self, params: SweepParameters, output_folder: PathBuf) {
        self.update_connection_status(ConnectionStatus::Connecting);
        match self.controller.start_sweep(params, &output_folder) {
            Ok(()) => {
                self.update_connection_status(ConnectionStatus::Connected);
                self.sync_state();
                if let Some(tag) = self.controller.current_settings() {
                    let _ = self.message_tx.send(BackendMessage::SettingsApplied(tag));
                }
            }
            Err(e) => {
                tracing::error!("Failed to start sweep: {}", e);
                self.report_start_failure(e);
            }
        }
    }

    fn start_display(&mut self, pulse_voltage: u32) {
        self.update_connection_status(ConnectionStatus::Connecting);
        match self.controller.start_display(pulse_voltage) {
            Ok(()) => {
                self.update_connection_status(ConnectionStatus::Connected);
                self.sync_state();
                if let Some(tag) = self.controller.current_settings() {
                    let _ = self.message_tx.send(BackendMessage::SettingsApplied(tag));
                }
            }
            Err(e) => {
                tracing::error!("Failed to start live display: {}", e);
                self.report_start_failure(e);
            }
        }
    }

    fn report_start_failure(&mut self, error: RecorderError) {
        let status = if error.is_sweep_fatal() {
            ConnectionStatus::Error
        } else {
            ConnectionStatus::Disconnected
        };
        self.update_connection_status(status);
        self.sync_state();
        let _ = self.message_tx.send(BackendMessage::Error(error.to_string()));
    }

    /// Translate a controller event into UI messages
    fn forward_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::SettingsApplied { tag } => {
                self.try_send_message(BackendMessage::SettingsApplied(tag));
            }
            ControllerEvent::FrameCaptured {
                tag,
                progress,
                image,
            } => {
                let _ = self
                    .message_tx
                    .send(BackendMessage::FrameCaptured { tag, progress });
                self.try_send_message(BackendMessage::LiveFrame(image));
            }
            ControllerEvent::FrameRejected { tag, reason } => {
                let _ = self
                    .message_tx
                    .send(BackendMessage::FrameRejected { tag, reason });
            }
            ControllerEvent::FrameDisplayed { image } => {
                self.try_send_message(BackendMessage::LiveFrame(image));
            }
            ControllerEvent::NoFrame { missed_polls } => {
                tracing::trace!("No new frame ({} missed polls)", missed_polls);
            }
            ControllerEvent::Reconnecting => {
                self.update_connection_status(ConnectionStatus::Connecting);
                let _ = self.message_tx.send(BackendMessage::Reconnecting);
            }
            ControllerEvent::Reconnected => {
                self.update_connection_status(ConnectionStatus::Connected);
            }
            ControllerEvent::SweepCompleted { report } => {
                self.update_connection_status(ConnectionStatus::Disconnected);
                self.send_stats();
                let _ = self.message_tx.send(BackendMessage::SweepFinished(report));
            }
            ControllerEvent::Aborted { reason, report } => {
                self.update_connection_status(ConnectionStatus::Error);
                self.send_stats();
                let _ = self
                    .message_tx
                    .send(BackendMessage::SweepAborted { reason, report });
            }
        }
    }

    /// Sleep to maintain the poll rate
    fn rate_limit(&mut self) {
        let target_interval = self.controller.poll_interval();
        let elapsed = self.last_poll_time.elapsed();

        if elapsed < target_interval {
            std::thread::sleep(target_interval - elapsed);
        }

        self.last_poll_time = Instant::now();
    }

    /// Report the controller state to the UI when it changed
    fn sync_state(&mut self) {
        let state = self.controller.state();
        if state != self.reported_state {
            self.reported_state = state;
            let _ = self.message_tx.send(BackendMessage::AcquisitionState(state));
            if state == AcquisitionState::Idle
                && self.connection_status == ConnectionStatus::Connected
            {
                self.update_connection_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Update connection status and notify UI
    fn update_connection_status(&mut self, status: ConnectionStatus) {
        if self.connection_status == status {
            return;
        }
        self.connection_status = status;
        let _ = self
            .message_tx
            .send(BackendMessage::ConnectionStatus(status));
    }

    /// Send statistics to UI (using try_send for backpressure)
    fn send_stats(&mut self) {
        let stats = self.controller.stats().clone();
        self.try_send_message(BackendMessage::Stats(stats));
    }

    /// Try to send a message, counting it as dropped if the queue is full
    fn try_send_message(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
            tracing::trace!("UI queue full, {} messages dropped", self.dropped_messages);
        }
    }
}
