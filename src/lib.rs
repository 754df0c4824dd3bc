//! # Spectroscopy Recorder: Ultrasound Frequency/Pulse Sweep Acquisition
//!
//! A desktop controller for an ultrasound probe. It sweeps a matrix of
//! transmit frequencies and pulse voltages, captures one frame at each
//! setting and writes each captured frame as a tracked-frame sequence file.
//!
//! ## Architecture
//!
//! - **Backend**: Runs the sweep controller on a worker thread; the controller
//!   polls the probe frame counter, advances the sweep, and recovers from stalls
//! - **Frontend**: Renders the controls and the live image using eframe/egui
//! - **Session**: Tracked frames, the in-memory frame buffer, and the NRRD writer
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Configuration
//!
//! Acquisition settings (`config.toml`) and application state
//! (`app_state.json`) are stored in the platform-appropriate data directory
//! under `org.spectroscopy.recorder`:
//!
//! - **Linux**: `~/.local/share/org.spectroscopy.recorder/`
//! - **macOS**: `~/Library/Application Support/org.spectroscopy.recorder/`
//! - **Windows**: `%APPDATA%\org.spectroscopy.recorder\`
//!
//! ## Example
//!
//! ```ignore
//! use spectroscopy_recorder::{
//!     backend::RecorderBackend,
//!     config::{AppConfig, AppState},
//!     frontend::RecorderApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let app_state = AppState::load_or_default();
//!
//!     let (backend, frontend_receiver) = RecorderBackend::new(config.clone());
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "Ultrasound Spectroscopy Recorder",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(RecorderApp::new(cc, frontend_receiver, config, app_state)))),
//!     )
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod session;
pub mod sweep;
pub mod types;

// Re-export commonly used types
pub use backend::{RecorderBackend, SimulatedProbe, SweepController, UltrasoundProbe};
pub use config::{AppConfig, AppState};
pub use error::{RecorderError, Result};
pub use frontend::RecorderApp;
pub use sweep::{SweepCursor, SweepParameters};
pub use types::{AcquisitionState, FrameTag};
