//! Integration tests for the sweep lifecycle
//!
//! These tests run the backend worker thread end to end with the simulated
//! probe:
//! - Full sweep over the reference parameters
//! - Stall detection, reconnect, and fatal stall flush
//! - Stop mid-sweep and live display
//! - Device and parameter errors surfaced as messages

mod common;

use common::builders::{ConfigBuilder, SweepBuilder};
use common::mock_helpers::{collect_until, shutdown, spawn_simulated_backend};
use common::{file_names, test_timeout};
use spectroscopy_recorder::backend::{BackendMessage, SimulatedFaults};
use spectroscopy_recorder::types::{AcquisitionState, ConnectionStatus, FrameTag};

fn is_idle(msg: &BackendMessage) -> bool {
    matches!(msg, BackendMessage::AcquisitionState(AcquisitionState::Idle))
}

#[test]
fn test_backend_creation_and_shutdown() {
    let (handle, frontend) =
        spawn_simulated_backend(ConfigBuilder::fast().build(), SimulatedFaults::default());
    shutdown(handle, &frontend);

    let messages = frontend.drain();
    assert!(matches!(messages.last(), Some(BackendMessage::Shutdown)));
}

#[test]
fn test_reference_sweep_writes_nine_files() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) =
        spawn_simulated_backend(ConfigBuilder::fast().build(), SimulatedFaults::default());

    frontend.start_sweep(SweepBuilder::new().build(), dir.path().to_path_buf());
    // Idle is only reported after the flush
    let messages = collect_until(&frontend, test_timeout(), is_idle);
    assert!(messages
        .iter()
        .any(|m| matches!(m, BackendMessage::SweepFinished(r) if r.written.len() == 9)));

    let captured: Vec<FrameTag> = messages
        .iter()
        .filter_map(|m| match m {
            BackendMessage::FrameCaptured { tag, .. } => Some(*tag),
            _ => None,
        })
        .collect();
    let voltages: Vec<u32> = captured.iter().map(|t| t.pulse_voltage).collect();
    assert_eq!(voltages, vec![20, 30, 40, 20, 30, 40, 20, 30, 40]);
    let frequencies: Vec<f64> = captured.iter().map(|t| t.frequency_mhz).collect();
    assert_eq!(
        frequencies,
        vec![5.0, 5.0, 5.0, 7.5, 7.5, 7.5, 10.0, 10.0, 10.0]
    );

    let names = file_names(dir.path());
    assert_eq!(names.len(), 9);
    for label in ["5_0MHz", "7_5MHz", "10_0MHz"] {
        for volts in ["20V", "30V", "40V"] {
            let prefix = format!("VideoBufferMetafile_Rfmode-{}-{}-", label, volts);
            assert!(
                names.iter().any(|n| n.starts_with(&prefix) && n.ends_with(".nrrd")),
                "missing file for {}",
                prefix
            );
        }
    }

    // Written files carry the NRRD header and the capture settings
    let first = std::fs::read(dir.path().join(&names[0])).unwrap();
    assert!(first.starts_with(b"NRRD0004\n"));
    let text = String::from_utf8_lossy(&first);
    assert!(text.contains("UltrasoundImageOrientation:=FM"));
    assert!(text.contains("Seq_Frame0000_RecordInformation:="));

    shutdown(handle, &frontend);
}

#[test]
fn test_progress_counts_every_point() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) =
        spawn_simulated_backend(ConfigBuilder::fast().build(), SimulatedFaults::default());

    frontend.start_sweep(
        SweepBuilder::new().frequencies(&[5.0]).pulse(10, 25, 10).build(),
        dir.path().to_path_buf(),
    );
    let messages = collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SweepFinished(_))
    });

    let progress: Vec<(usize, usize)> = messages
        .iter()
        .filter_map(|m| match m {
            BackendMessage::FrameCaptured { progress, .. } => Some((progress.step, progress.total)),
            _ => None,
        })
        .collect();
    // 10, 20, then clamped to 25
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert!(file_names(dir.path()).iter().any(|n| n.contains("-25V-")));

    shutdown(handle, &frontend);
}

#[test]
fn test_stall_reconnects_then_flushes_on_fatal_stall() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) = spawn_simulated_backend(
        ConfigBuilder::fast().stall_threshold(10).build(),
        SimulatedFaults::default().stall_permanently_after(4),
    );

    frontend.start_sweep(SweepBuilder::new().build(), dir.path().to_path_buf());
    let messages = collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SweepAborted { .. })
    });

    let reconnects = messages
        .iter()
        .filter(|m| matches!(m, BackendMessage::Reconnecting))
        .count();
    assert_eq!(reconnects, 1);

    let captured = messages
        .iter()
        .filter(|m| matches!(m, BackendMessage::FrameCaptured { .. }))
        .count();
    assert!(captured > 0);

    let report = messages.iter().find_map(|m| match m {
        BackendMessage::SweepAborted { reason, report } => {
            assert!(reason.contains("stalled"));
            report.clone()
        }
        _ => None,
    });
    let report = report.expect("fatal stall while recording flushes the buffer");
    assert_eq!(report.written.len(), captured);
    assert_eq!(file_names(dir.path()).len(), captured);
    assert!(messages
        .iter()
        .any(|m| matches!(m, BackendMessage::ConnectionStatus(ConnectionStatus::Error))));

    shutdown(handle, &frontend);
}

#[test]
fn test_stop_mid_sweep_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    // The probe stalls after a few frames, so the sweep cannot finish on its own
    let (handle, frontend) = spawn_simulated_backend(
        ConfigBuilder::fast().stall_threshold(1_000_000).build(),
        SimulatedFaults::default().stall_permanently_after(3),
    );

    frontend.start_sweep(SweepBuilder::new().build(), dir.path().to_path_buf());
    collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::FrameCaptured { .. })
    });

    frontend.stop();
    collect_until(&frontend, test_timeout(), is_idle);

    assert!(file_names(dir.path()).is_empty());

    shutdown(handle, &frontend);
}

#[test]
fn test_display_streams_live_frames() {
    let (handle, frontend) =
        spawn_simulated_backend(ConfigBuilder::fast().build(), SimulatedFaults::default());

    frontend.start_display(0);
    let messages = collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::LiveFrame(_))
    });
    assert!(messages.iter().any(|m| matches!(
        m,
        BackendMessage::AcquisitionState(AcquisitionState::DisplayOnly)
    )));
    assert!(messages.iter().any(|m| matches!(
        m,
        BackendMessage::SettingsApplied(tag) if *tag == FrameTag::new(5.0, 20)
    )));

    frontend.stop();
    collect_until(&frontend, test_timeout(), is_idle);

    shutdown(handle, &frontend);
}

#[test]
fn test_unavailable_device_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) = spawn_simulated_backend(
        ConfigBuilder::fast().build(),
        SimulatedFaults::default().refuse_connect(),
    );

    frontend.start_sweep(SweepBuilder::new().build(), dir.path().to_path_buf());
    let messages = collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Error(_))
    });
    assert!(messages.iter().any(|m| matches!(
        m,
        BackendMessage::Error(e) if e.contains("Device unavailable")
    )));

    // The backend survives and still answers
    frontend.start_display(0);
    collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Error(_))
    });

    shutdown(handle, &frontend);
}

#[test]
fn test_invalid_parameters_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) =
        spawn_simulated_backend(ConfigBuilder::fast().build(), SimulatedFaults::default());

    frontend.start_sweep(
        SweepBuilder::new().pulse(20, 40, 0).build(),
        dir.path().to_path_buf(),
    );
    let messages = collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Error(_))
    });
    assert!(!messages
        .iter()
        .any(|m| matches!(m, BackendMessage::AcquisitionState(AcquisitionState::Recording))));

    shutdown(handle, &frontend);
}

#[test]
fn test_custom_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) = spawn_simulated_backend(
        ConfigBuilder::fast().base_name("Phantom").build(),
        SimulatedFaults::default(),
    );

    frontend.start_sweep(
        SweepBuilder::new().frequencies(&[10.0]).pulse(30, 30, 0).build(),
        dir.path().to_path_buf(),
    );
    collect_until(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SweepFinished(_))
    });

    let names = file_names(dir.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("Phantom-10_0MHz-30V-"));

    shutdown(handle, &frontend);
}
