//! Process supervision scenarios
//!
//! End-to-end tests for the process manager: spawning real scripts,
//! draining captured output, and the terminate/cleanup lifecycle.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use splitrun::process::{ProcessManager, ProcessStatus};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn wait_until_stopped(manager: &ProcessManager, pane: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while manager.is_running(pane) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    std::thread::sleep(Duration::from_millis(50));
}

#[test]
fn test_echo_scenario_full_lifecycle() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let script = write_script(temp.path(), "echo.sh", "#!/bin/sh\necho hello\n");

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&script, 0).expect("start"));

    // Within a bounded poll window the slot moves Running -> Finished.
    wait_until_stopped(&manager, 0);
    assert_eq!(manager.status(0).expect("status"), ProcessStatus::Finished);

    // Output is reproduced exactly, and draining is destructive.
    assert_eq!(manager.take_output(0).expect("drain"), "hello\n");
    assert_eq!(manager.take_output(0).expect("second drain"), "");

    // The slot returns to idle after the cleanup sweep.
    assert_eq!(manager.cleanup_finished(), 1);
    assert_eq!(manager.status(0).expect("status"), ProcessStatus::Idle);
}

#[test]
fn test_terminate_scenario_graceful_then_terminated() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let script = write_script(
        temp.path(),
        "sleep-loop.sh",
        "#!/bin/sh\nwhile true; do sleep 1; done\n",
    );

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&script, 0).expect("start"));
    std::thread::sleep(Duration::from_millis(100));
    assert!(manager.is_running(0));

    manager.terminate_script(0).expect("terminate");
    assert_eq!(
        manager.status(0).expect("status"),
        ProcessStatus::Terminated
    );
    assert!(!manager.is_running(0));
}

#[test]
fn test_at_most_two_slots_run_concurrently() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let sleeper = write_script(temp.path(), "sleep.sh", "#!/bin/sh\nsleep 30\n");

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&sleeper, 0).expect("start 0"));
    assert!(manager.start_script(&sleeper, 1).expect("start 1"));

    // Both slots busy: starting again is refused without side effects.
    assert!(!manager.start_script(&sleeper, 0).expect("retry 0"));
    assert!(!manager.start_script(&sleeper, 1).expect("retry 1"));
    assert!(manager.is_running(0));
    assert!(manager.is_running(1));

    // There is no third slot.
    assert!(manager.start_script(&sleeper, 2).is_err());

    manager.terminate_script(0).expect("terminate 0");
    manager.terminate_script(1).expect("terminate 1");
}

#[test]
fn test_output_order_is_preserved_per_pane() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let script = write_script(
        temp.path(),
        "seq.sh",
        "#!/bin/sh\nfor i in 1 2 3 4 5; do echo step-$i; done\n",
    );

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&script, 0).expect("start"));
    wait_until_stopped(&manager, 0);

    let output = manager.take_output(0).expect("drain");
    assert_eq!(output, "step-1\nstep-2\nstep-3\nstep-4\nstep-5\n");
}

#[test]
fn test_buffer_never_exceeds_configured_cap() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let script = write_script(
        temp.path(),
        "flood.sh",
        "#!/bin/sh\nfor i in $(seq 1 50); do echo line-$i; done\n",
    );

    let mut manager = ProcessManager::new(10);
    assert!(manager.start_script(&script, 0).expect("start"));
    wait_until_stopped(&manager, 0);

    let output = manager.take_output(0).expect("drain");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 10);
    // Oldest lines were evicted first.
    assert_eq!(lines[0], "line-41");
    assert_eq!(lines[9], "line-50");
}

#[test]
fn test_failed_script_reports_error_and_captures_stderr() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let script = write_script(
        temp.path(),
        "fail.sh",
        "#!/bin/sh\necho working\necho broken >&2\nexit 2\n",
    );

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&script, 1).expect("start"));
    wait_until_stopped(&manager, 1);

    assert_eq!(manager.status(1).expect("status"), ProcessStatus::Error);
    assert_eq!(manager.exit_code(1).expect("exit code"), Some(2));

    // stdout and stderr arrive on the same combined stream, in order.
    assert_eq!(manager.take_output(1).expect("drain"), "working\nbroken\n");
}

#[test]
fn test_slot_is_reusable_after_cleanup() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let first = write_script(temp.path(), "first.sh", "#!/bin/sh\necho first\n");
    let second = write_script(temp.path(), "second.sh", "#!/bin/sh\necho second\n");

    let mut manager = ProcessManager::new(1000);
    assert!(manager.start_script(&first, 0).expect("start first"));
    wait_until_stopped(&manager, 0);

    // Before cleanup the slot is still holding its terminal status.
    assert!(!manager.start_script(&second, 0).expect("busy slot"));
    assert_eq!(manager.cleanup_finished(), 1);

    let _ = manager.take_output(0);
    assert!(manager.start_script(&second, 0).expect("start second"));
    wait_until_stopped(&manager, 0);
    assert!(manager.take_output(0).expect("drain").contains("second"));
}
