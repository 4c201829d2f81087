//! Shared harness for entry-point tests.
//!
//! Each integration test binary installs one process-wide runtime whose
//! sink captures lines and whose halt primitive parks the halted thread
//! forever. Tests run the trapping call on a spawned thread and observe
//! whether that thread returned or halted.

#![allow(dead_code, reason = "not every test binary uses every helper")]
#![allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use ubtrap_rt::{
    install, DiagnosticSink, ExecutionContext, HaltPrimitive, Report, TrapConfig, TrapRuntime,
};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
static HALTED: Mutex<Vec<ThreadId>> = Mutex::new(Vec::new());
static INSTALL: Once = Once::new();

struct CaptureSink;

impl DiagnosticSink for CaptureSink {
    fn emit(&self, report: &Report<'_>) {
        LINES.lock().unwrap().push(report.to_string());
    }
}

/// Records the halting thread, then never lets it run again.
struct ParkForever;

impl HaltPrimitive for ParkForever {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Application
    }

    fn halt(&self) {
        HALTED.lock().unwrap().push(thread::current().id());
        loop {
            thread::park();
        }
    }
}

/// Install the capturing runtime for this test binary.
pub fn install_capture(panic_on_violation: bool) {
    INSTALL.call_once(|| {
        let config = TrapConfig::default().with_panic_on_violation(panic_on_violation);
        install(TrapRuntime::new(&config, CaptureSink, ParkForever)).unwrap();
    });
}

/// Every captured line reported for `file`.
pub fn lines_for(file: &str) -> Vec<String> {
    let needle = format!(" at {file}:");
    LINES
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Returned,
    Halted,
}

/// Run `f` on its own thread and report how it ended.
pub fn run_isolated(f: impl FnOnce() + Send + 'static) -> Ending {
    let handle = thread::spawn(f);
    let id = handle.thread().id();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if HALTED.lock().unwrap().contains(&id) {
            return Ending::Halted;
        }
        if handle.is_finished() {
            handle.join().unwrap();
            return Ending::Returned;
        }
        assert!(Instant::now() < deadline, "thread neither returned nor halted");
        thread::sleep(Duration::from_millis(1));
    }
}
