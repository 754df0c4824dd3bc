//! Shared topic data published by the backend and consumed by the UI.
//!
//! The `Topics` struct is a plain data bus with direct field access.
//! The app writes to it from `process_backend_messages()` through
//! [`Topics::apply`]; panels and the status bar read from it.

use crate::backend::BackendMessage;
use crate::session::{FlushReport, FrameImage};
use crate::types::{AcquisitionState, ConnectionStatus, FrameTag, SweepProgress, SweepStats};

/// All shared data published by the backend.
#[derive(Debug, Default)]
pub struct Topics {
    // --- Status (low frequency) ---
    /// Current probe connection status
    pub connection_status: ConnectionStatus,
    /// Current acquisition state
    pub acquisition_state: AcquisitionState,
    /// Settings the probe currently runs with
    pub current_settings: Option<FrameTag>,
    /// Progress of the running sweep
    pub progress: Option<SweepProgress>,
    /// Last sweep point captured
    pub last_capture: Option<FrameTag>,
    /// Sweep statistics (updated ~2Hz while active)
    pub stats: SweepStats,
    /// Whether a reconnect cycle is in progress
    pub reconnecting: bool,

    // --- Results ---
    /// Report of the last finished or aborted sweep
    pub last_report: Option<FlushReport>,

    // --- Live data ---
    /// Latest image from the probe
    pub live_frame: Option<FrameImage>,
    /// Incremented on every new live frame; the live view compares against it
    pub live_generation: u64,
}

impl Topics {
    /// Fold one backend message into the topics
    ///
    /// Returns an error text when the message should be shown to the user.
    pub fn apply(&mut self, msg: BackendMessage) -> Option<String> {
        match msg {
            BackendMessage::AcquisitionState(state) => {
                self.acquisition_state = state;
                if state == AcquisitionState::Idle {
                    self.current_settings = None;
                    self.reconnecting = false;
                } else {
                    self.progress = None;
                    self.last_capture = None;
                }
            }
            BackendMessage::ConnectionStatus(status) => {
                self.connection_status = status;
                if status == ConnectionStatus::Connected {
                    self.reconnecting = false;
                }
            }
            BackendMessage::SettingsApplied(tag) => {
                self.current_settings = Some(tag);
            }
            BackendMessage::FrameCaptured { tag, progress } => {
                self.last_capture = Some(tag);
                self.progress = Some(progress);
            }
            BackendMessage::FrameRejected { tag, reason } => {
                tracing::warn!("Frame at {} rejected: {}", tag, reason);
                return Some(format!("Frame at {} rejected: {}", tag, reason));
            }
            BackendMessage::LiveFrame(image) => {
                self.live_frame = Some(image);
                self.live_generation = self.live_generation.wrapping_add(1);
            }
            BackendMessage::Reconnecting => {
                self.reconnecting = true;
            }
            BackendMessage::SweepFinished(report) => {
                tracing::info!(
                    "Sweep finished: {} file(s) written, {} failed",
                    report.written.len(),
                    report.failed.len()
                );
                let error = (!report.is_complete())
                    .then(|| format!("{} file(s) could not be written", report.failed.len()));
                self.last_report = Some(report);
                return error;
            }
            BackendMessage::SweepAborted { reason, report } => {
                if let Some(report) = report {
                    self.last_report = Some(report);
                }
                return Some(format!("Acquisition aborted: {}", reason));
            }
            BackendMessage::Error(error) => {
                return Some(error);
            }
            BackendMessage::Stats(stats) => {
                self.stats = stats;
            }
            BackendMessage::Shutdown => {
                tracing::info!("Backend shutdown received");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_capture_updates_progress() {
        let mut topics = Topics::default();
        topics.apply(BackendMessage::AcquisitionState(AcquisitionState::Recording));
        let tag = FrameTag::new(7.5, 30);
        assert!(topics
            .apply(BackendMessage::FrameCaptured {
                tag,
                progress: SweepProgress { step: 5, total: 9 },
            })
            .is_none());
        assert_eq!(topics.last_capture, Some(tag));
        assert_eq!(topics.progress.map(|p| p.step), Some(5));
    }

    #[test]
    fn test_new_acquisition_clears_progress() {
        let mut topics = Topics {
            progress: Some(SweepProgress { step: 9, total: 9 }),
            ..Default::default()
        };
        topics.apply(BackendMessage::AcquisitionState(AcquisitionState::Recording));
        assert!(topics.progress.is_none());
    }

    #[test]
    fn test_live_frame_bumps_generation() {
        let mut topics = Topics::default();
        topics.apply(BackendMessage::LiveFrame(FrameImage::blank(2, 2)));
        topics.apply(BackendMessage::LiveFrame(FrameImage::blank(2, 2)));
        assert_eq!(topics.live_generation, 2);
        assert!(topics.live_frame.is_some());
    }

    #[test]
    fn test_abort_surfaces_error_and_keeps_report() {
        let mut topics = Topics::default();
        let report = FlushReport {
            written: vec![PathBuf::from("a.nrrd")],
            failed: Vec::new(),
        };
        let error = topics.apply(BackendMessage::SweepAborted {
            reason: "stalled".to_string(),
            report: Some(report.clone()),
        });
        assert!(error.unwrap().contains("stalled"));
        assert_eq!(topics.last_report, Some(report));
    }

    #[test]
    fn test_partial_flush_is_reported() {
        let mut topics = Topics::default();
        let error = topics.apply(BackendMessage::SweepFinished(FlushReport {
            written: Vec::new(),
            failed: vec![(FrameTag::new(5.0, 20), "disk full".to_string())],
        }));
        assert!(error.is_some());
    }

    #[test]
    fn test_reconnect_flag() {
        let mut topics = Topics::default();
        topics.apply(BackendMessage::Reconnecting);
        assert!(topics.reconnecting);
        topics.apply(BackendMessage::ConnectionStatus(ConnectionStatus::Connected));
        assert!(!topics.reconnecting);
    }
}
