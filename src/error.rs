//! Error handling for the spectroscopy recorder
//!
//! This module defines the error taxonomy of the acquisition loop and a
//! Result alias for use throughout the application.

use thiserror::Error;

/// Main error type for recorder operations
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Sweep bounds or step rejected before the sweep started
    #[error("Invalid sweep parameters: {0}")]
    InvalidParameters(String),

    /// The probe could not be connected (at start or during a reconnect)
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single captured frame was dropped
    #[error("Frame rejected: {0}")]
    FrameCommitRejected(String),

    /// No new frames arrived for the stall threshold, even after a reconnect
    #[error("Acquisition stalled after {missed_polls} polls without a new frame")]
    AcquisitionStalled { missed_polls: u32 },

    /// Writing a sequence file failed
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RecorderError>,
    },
}

impl RecorderError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RecorderError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the error ends the running sweep
    ///
    /// Parameter and per-frame errors are recovered locally; connectivity
    /// loss and repeated stalls terminate the sweep.
    pub fn is_sweep_fatal(&self) -> bool {
        match self {
            RecorderError::DeviceUnavailable(_) | RecorderError::AcquisitionStalled { .. } => true,
            RecorderError::WithContext { source, .. } => source.is_sweep_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| RecorderError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| RecorderError::Io(e).with_context(f()))
    }
}
