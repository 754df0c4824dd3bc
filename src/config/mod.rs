//! Configuration module for the spectroscopy recorder
//!
//! This module handles application configuration including:
//! - Acquisition configuration (`config.toml`): probe channel, frequency table,
//!   poll timing, stall threshold, output naming
//! - Application state persistence (`app_state.json`): last output folder and
//!   pulse inputs, UI preferences
//! - Runtime settings during execution
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/org.spectroscopy.recorder/`
//! - **macOS**: `~/Library/Application Support/org.spectroscopy.recorder/`
//! - **Windows**: `%APPDATA%\org.spectroscopy.recorder\`
//!
//! # Example
//!
//! ```ignore
//! use spectroscopy_recorder::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default();
//! let mut state = AppState::load_or_default();
//! state.last_output_folder = Some("/data/run1".into());
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{RecorderError, Result};
use crate::session::ImageOrientation;
use crate::sweep::DEFAULT_FREQUENCIES_MHZ;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "org.spectroscopy.recorder";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Acquisition configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Log directory inside the app data directory
pub const LOG_DIR: &str = "logs";

/// Default poll period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default number of empty polls before the probe is considered stalled
pub const DEFAULT_STALL_THRESHOLD: u32 = 50;

/// Default settle time around streaming start/stop in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Pulse voltage used for the live view when none was entered
pub const DEFAULT_DISPLAY_PULSE_VOLTAGE: u32 = 20;

/// Output channel carrying the RF frames
pub const DEFAULT_CHANNEL_NAME: &str = "RfVideoStream";

/// Prefix of written sequence files
pub const DEFAULT_BASE_NAME: &str = "VideoBufferMetafile_Rfmode";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        RecorderError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            RecorderError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the path to the acquisition configuration file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Acquisition configuration
///
/// Every field has a default so a partial `config.toml` is enough.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Probe connection configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Sweep configuration
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Poll loop timing
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Output naming
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RecorderError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::Config(format!("Failed to read configuration {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `config.toml` from the app data directory, returning defaults if
    /// it is missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load configuration, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecorderError::Config(format!("Failed to create configuration directory: {}", e))
            })?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RecorderError::Config(format!("Failed to serialize configuration: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            RecorderError::Config(format!("Failed to write configuration {:?}: {}", path, e))
        })
    }
}

/// Probe connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// Name of the output channel frames are read from
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Settings of the simulated probe
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_channel_name() -> String {
    DEFAULT_CHANNEL_NAME.to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Parameters of the simulated probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Image width in pixels
    #[serde(default = "default_image_width")]
    pub image_width: usize,

    /// Image height in pixels
    #[serde(default = "default_image_height")]
    pub image_height: usize,

    /// A new frame appears every this many frame-counter reads
    #[serde(default = "default_polls_per_frame")]
    pub polls_per_frame: u32,
}

fn default_image_width() -> usize {
    128
}

fn default_image_height() -> usize {
    256
}

fn default_polls_per_frame() -> u32 {
    2
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            image_width: default_image_width(),
            image_height: default_image_height(),
            polls_per_frame: default_polls_per_frame(),
        }
    }
}

/// Frequency table and display defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    /// Ordered transmit frequencies in MHz
    #[serde(default = "default_frequencies")]
    pub frequencies_mhz: Vec<f64>,

    /// Pulse voltage for the live view when none was entered
    #[serde(default = "default_display_pulse_voltage")]
    pub default_display_pulse_voltage: u32,
}

fn default_frequencies() -> Vec<f64> {
    DEFAULT_FREQUENCIES_MHZ.to_vec()
}

fn default_display_pulse_voltage() -> u32 {
    DEFAULT_DISPLAY_PULSE_VOLTAGE
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            frequencies_mhz: default_frequencies(),
            default_display_pulse_voltage: default_display_pulse_voltage(),
        }
    }
}

/// Poll loop timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionConfig {
    /// Period of the poll tick in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive empty polls before a stall is declared
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,

    /// Blocking wait around streaming start/stop in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_stall_threshold() -> u32 {
    DEFAULT_STALL_THRESHOLD
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl AcquisitionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Output naming
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Prefix of every written file
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Orientation tag stored in the sequence header
    #[serde(default)]
    pub orientation: ImageOrientation,
}

fn default_base_name() -> String {
    DEFAULT_BASE_NAME.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_name: default_base_name(),
            orientation: ImageOrientation::default(),
        }
    }
}

// ==================== App State ====================

/// Persistent application state
///
/// Remembers the last inputs between launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last folder sequences were written to
    #[serde(default)]
    pub last_output_folder: Option<PathBuf>,

    /// Last pulse inputs
    #[serde(default)]
    pub last_pulse_min: u32,
    #[serde(default)]
    pub last_pulse_max: u32,
    #[serde(default)]
    pub last_pulse_step: u32,

    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_output_folder: None,
            last_pulse_min: 0,
            last_pulse_max: 0,
            last_pulse_step: 0,
            ui_preferences: UiPreferences::default(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            RecorderError::Config("Could not determine app state path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load app state from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RecorderError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| RecorderError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(APP_STATE_FILE))
    }

    /// Save app state to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RecorderError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RecorderError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Remember the inputs of a started sweep
    pub fn remember_sweep(&mut self, settings: &RuntimeSettings) {
        self.last_pulse_min = settings.pulse_min;
        self.last_pulse_max = settings.pulse_max;
        self.last_pulse_step = settings.pulse_step;
        if settings.output_folder.is_some() {
            self.last_output_folder = settings.output_folder.clone();
        }
    }
}

/// UI preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self { dark_mode: true }
    }
}
