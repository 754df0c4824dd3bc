//! Ultrasound Spectroscopy Recorder - Main Entry Point
//!
//! Sweeps an ultrasound probe over transmit frequencies and pulse voltages
//! and records one frame per setting.

use anyhow::Context;
use spectroscopy_recorder::{
    backend::RecorderBackend,
    config::{self, AppConfig, AppState},
    frontend::RecorderApp,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install stdout logging and, when the data directory is usable, a daily
/// rolling log file
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spectroscopy_recorder=debug"));

    let file_writer = config::ensure_app_data_dir()
        .map(|dir| dir.join(config::LOG_DIR))
        .ok()
        .map(|dir| tracing_appender::rolling::daily(dir, "recorder.log"))
        .map(tracing_appender::non_blocking);

    match file_writer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    tracing::info!("Starting Ultrasound Spectroscopy Recorder");

    let config = AppConfig::load_or_default();
    let app_state = AppState::load_or_default();
    tracing::debug!(
        "Frequencies: {:?} MHz, poll every {} ms, stall after {} polls",
        config.sweep.frequencies_mhz,
        config.acquisition.poll_interval_ms,
        config.acquisition.stall_threshold
    );

    // Spawn the acquisition backend
    let (backend, frontend_receiver) = RecorderBackend::new(config.clone());
    let backend_handle = std::thread::Builder::new()
        .name("acquisition".to_string())
        .spawn(move || backend.run())
        .context("Failed to spawn the acquisition thread")?;

    // Configure eframe options
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 640.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Ultrasound Spectroscopy Recorder"),
        ..Default::default()
    };

    // Run the eframe application
    let result = eframe::run_native(
        "Ultrasound Spectroscopy Recorder",
        native_options,
        Box::new(|cc| {
            Ok(Box::new(RecorderApp::new(
                cc,
                frontend_receiver,
                config,
                app_state,
            )))
        }),
    );

    // The app sends Shutdown on exit; wait for the probe to be released
    tracing::info!("Shutting down...");
    if backend_handle.join().is_err() {
        tracing::error!("Acquisition thread panicked");
    }

    result.map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}
