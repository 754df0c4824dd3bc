//! Backend construction and message helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use spectroscopy_recorder::backend::{
    BackendMessage, FrontendReceiver, RecorderBackend, SimulatedFaults, SimulatedProbe,
};
use spectroscopy_recorder::config::AppConfig;
use spectroscopy_recorder::session::NrrdSequenceWriter;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Create test channels with default size
pub fn create_test_channels<T, U>() -> (Sender<T>, Receiver<T>, Sender<U>, Receiver<U>) {
    let (tx1, rx1) = bounded(16);
    let (tx2, rx2) = bounded(16);
    (tx1, rx1, tx2, rx2)
}

/// Spawn a backend thread driving a simulated probe with `faults`
pub fn spawn_simulated_backend(
    config: AppConfig,
    faults: SimulatedFaults,
) -> (JoinHandle<()>, FrontendReceiver) {
    let probe = SimulatedProbe::new(config.probe.simulation.clone()).with_faults(faults);
    let (backend, frontend) = RecorderBackend::with_probe(
        config,
        Box::new(probe),
        Box::new(NrrdSequenceWriter::new()),
    );
    let handle = std::thread::spawn(move || backend.run());
    (handle, frontend)
}

/// Collect messages until `done` matches one of them or `timeout` expires
pub fn collect_until(
    frontend: &FrontendReceiver,
    timeout: Duration,
    done: impl Fn(&BackendMessage) -> bool,
) -> Vec<BackendMessage> {
    let deadline = Instant::now() + timeout;
    let mut messages = Vec::new();
    while Instant::now() < deadline {
        let batch = frontend.drain();
        let finished = batch.iter().any(&done);
        messages.extend(batch);
        if finished {
            return messages;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!(
        "timed out after {:?}; received {} message(s): {:?}",
        timeout,
        messages.len(),
        messages.iter().rev().take(5).collect::<Vec<_>>()
    );
}

/// Shut the backend down and wait for its thread
pub fn shutdown(handle: JoinHandle<()>, frontend: &FrontendReceiver) {
    frontend.shutdown();
    handle.join().expect("backend thread should exit cleanly");
}
