//! # Process Manager
//!
//! Supervises up to two concurrently running scripts. Each running script
//! occupies one slot: the child process, a dedicated reader thread
//! draining the combined stdout/stderr pipe, and a bounded line buffer
//! the UI polls from the main thread.
//!
//! ## Concurrency
//!
//! The reader thread is the single producer for its slot's line buffer;
//! the main thread is the single consumer. Status and exit code live in
//! small shared cells so both sides can observe lifecycle transitions.
//! No lock is ever held across the UI/process boundary.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Starting -> Running -> {Finished | Error | Terminated} -> (cleanup) -> Idle
//! ```
//!
//! A spawn failure moves a slot straight from Starting to Error without
//! ever reaching Running.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::discovery::build_command;

/// Maximum number of concurrently supervised scripts.
pub const MAX_PROCESSES: usize = 2;

/// How long a process gets to exit after SIGTERM before SIGKILL is sent.
const TERMINATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Interval between liveness checks while waiting for graceful exit.
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// Execution status of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// No process associated with the slot.
    Idle,
    /// Spawn is in flight; exists only transiently.
    Starting,
    /// Process is alive and output capture is active.
    Running,
    /// Process exited with code 0.
    Finished,
    /// Process exited with a non-zero code, died to a signal, or failed
    /// to spawn.
    Error,
    /// Process was terminated on request.
    Terminated,
}

impl ProcessStatus {
    /// True while the slot owns a live process.
    pub fn is_active(self) -> bool {
        matches!(self, ProcessStatus::Starting | ProcessStatus::Running)
    }

    /// True once the process has stopped but the slot is not yet recycled.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessStatus::Finished | ProcessStatus::Error | ProcessStatus::Terminated
        )
    }

    /// Short label for status bars and log lines.
    pub fn label(self) -> &'static str {
        match self {
            ProcessStatus::Idle => "idle",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Running => "running",
            ProcessStatus::Finished => "finished",
            ProcessStatus::Error => "error",
            ProcessStatus::Terminated => "terminated",
        }
    }
}

/// One execution slot: process handle, reader thread, and output buffer.
struct Slot {
    status: Arc<Mutex<ProcessStatus>>,
    exit_code: Arc<Mutex<Option<i32>>>,
    output: Arc<Mutex<VecDeque<String>>>,
    child: Arc<Mutex<Option<Child>>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    pid: Option<i32>,
    command: String,
    started_at: Option<Instant>,
}

impl Slot {
    fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(ProcessStatus::Idle)),
            exit_code: Arc::new(Mutex::new(None)),
            output: Arc::new(Mutex::new(VecDeque::new())),
            child: Arc::new(Mutex::new(None)),
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
            pid: None,
            command: String::new(),
            started_at: None,
        }
    }

    fn status(&self) -> ProcessStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(ProcessStatus::Error)
    }

    fn set_status(&self, status: ProcessStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    /// Join the reader thread and reap the child if the thread never got
    /// to. Leaves buffered output in place for a final drain.
    fn retire(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Ok(mut guard) = self.child.lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.wait();
            }
        }
        self.pid = None;
        self.command.clear();
        self.started_at = None;
        self.stop.store(false, Ordering::Relaxed);
    }
}

/// Supervisor for up to [`MAX_PROCESSES`] concurrent scripts.
pub struct ProcessManager {
    slots: [Slot; MAX_PROCESSES],
    buffer_size: usize,
}

impl ProcessManager {
    /// Create a manager whose per-slot output buffers hold at most
    /// `buffer_size` lines.
    pub fn new(buffer_size: usize) -> Self {
        info!(buffer_size, "process manager initialized");
        Self {
            slots: [Slot::new(), Slot::new()],
            buffer_size: buffer_size.max(1),
        }
    }

    fn slot(&self, pane: usize) -> Result<&Slot> {
        self.slots.get(pane).ok_or_else(|| {
            Error::Process(format!("invalid pane index: {pane} (must be 0 or 1)"))
        })
    }

    fn slot_mut(&mut self, pane: usize) -> Result<&mut Slot> {
        self.slots.get_mut(pane).ok_or_else(|| {
            Error::Process(format!("invalid pane index: {pane} (must be 0 or 1)"))
        })
    }

    /// Start `script` in the given slot.
    ///
    /// Returns `Ok(false)` without side effects when the slot is busy, and
    /// `Ok(false)` with the slot marked [`ProcessStatus::Error`] when the
    /// spawn call itself fails. Internal setup failures (reader thread
    /// creation) are [`Error::Process`].
    pub fn start_script(&mut self, script: &Path, pane: usize) -> Result<bool> {
        let buffer_size = self.buffer_size;
        let slot = self.slot_mut(pane)?;

        if slot.status() != ProcessStatus::Idle {
            warn!(pane, "slot is already in use");
            return Ok(false);
        }
        slot.set_status(ProcessStatus::Starting);

        let command = build_command(script);
        info!(pane, command = %command, "starting script");

        // stderr is folded into the stdout pipe so the slot captures one
        // combined, process-ordered stream. The exec keeps the recorded
        // pid pointing at the interpreter, so signals reach it directly.
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(format!("exec {command} 2>&1"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                error!(pane, "failed to spawn process: {e}");
                slot.set_status(ProcessStatus::Error);
                return Ok(false);
            }
        };

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            slot.set_status(ProcessStatus::Error);
            return Err(Error::Process(
                "spawned process has no capture pipe".to_string(),
            ));
        };

        let pid = child.id() as i32;
        slot.pid = Some(pid);
        slot.command = command;
        slot.started_at = Some(Instant::now());
        if let Ok(mut guard) = slot.exit_code.lock() {
            *guard = None;
        }
        if let Ok(mut guard) = slot.child.lock() {
            *guard = Some(child);
        }
        slot.stop.store(false, Ordering::Relaxed);
        slot.set_status(ProcessStatus::Running);

        let output = Arc::clone(&slot.output);
        let status = Arc::clone(&slot.status);
        let exit_code = Arc::clone(&slot.exit_code);
        let child_cell = Arc::clone(&slot.child);
        let stop = Arc::clone(&slot.stop);

        let handle = std::thread::Builder::new()
            .name(format!("reader-{pane}"))
            .spawn(move || {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    reader_loop(stdout, &output, &status, &exit_code, &child_cell, &stop, buffer_size);
                }));
                if result.is_err() {
                    // A reader thread must never take the process down.
                    error!(pane, "output reader thread panicked");
                    if let Ok(mut guard) = status.lock() {
                        *guard = ProcessStatus::Error;
                    }
                }
            })
            .map_err(|e| {
                self.slots[pane].set_status(ProcessStatus::Error);
                Error::Process(format!("failed to spawn reader thread: {e}"))
            })?;

        self.slots[pane].reader = Some(handle);
        info!(pane, pid, "script started");
        Ok(true)
    }

    /// Terminate the script in `pane`, escalating from SIGTERM to SIGKILL
    /// after [`TERMINATION_TIMEOUT`]. Idempotent when the slot is idle.
    /// Blocks the caller for at most roughly the timeout.
    pub fn terminate_script(&mut self, pane: usize) -> Result<()> {
        let slot = self.slot_mut(pane)?;
        let status = slot.status();

        if status == ProcessStatus::Idle {
            debug!(pane, "no script running, nothing to terminate");
            return Ok(());
        }

        info!(pane, pid = ?slot.pid, "terminating script");
        slot.stop.store(true, Ordering::Relaxed);

        if status.is_active() {
            if let Some(pid) = slot.pid {
                if is_alive(pid) {
                    kill_with_escalation(pid);
                } else {
                    debug!(pane, pid, "process already dead, skipping signals");
                }
            }
        }

        slot.retire();
        slot.set_status(ProcessStatus::Terminated);
        info!(pane, "script terminated");
        Ok(())
    }

    /// True while the slot's process is starting or running.
    pub fn is_running(&self, pane: usize) -> bool {
        self.slots
            .get(pane)
            .map(|slot| slot.status().is_active())
            .unwrap_or(false)
    }

    /// Current status of the slot.
    pub fn status(&self, pane: usize) -> Result<ProcessStatus> {
        Ok(self.slot(pane)?.status())
    }

    /// Exit code recorded for the slot's last process, if it has exited.
    pub fn exit_code(&self, pane: usize) -> Result<Option<i32>> {
        let slot = self.slot(pane)?;
        Ok(slot.exit_code.lock().map(|c| *c).unwrap_or(None))
    }

    /// Runtime of the slot's process; zero when not running.
    pub fn runtime(&self, pane: usize) -> Result<Duration> {
        let slot = self.slot(pane)?;
        if !slot.status().is_active() {
            return Ok(Duration::ZERO);
        }
        Ok(slot
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO))
    }

    /// Command line being executed in the slot; empty when idle.
    pub fn command(&self, pane: usize) -> Result<String> {
        Ok(self.slot(pane)?.command.clone())
    }

    /// Drain all buffered output lines for the slot, newline-terminated.
    /// Non-blocking and destructive: a line is returned at most once.
    pub fn take_output(&self, pane: usize) -> Result<String> {
        let slot = self.slot(pane)?;
        let mut buffer = slot
            .output
            .lock()
            .map_err(|_| Error::Process("output buffer poisoned".to_string()))?;

        if buffer.is_empty() {
            return Ok(String::new());
        }
        let mut text = String::new();
        for line in buffer.drain(..) {
            text.push_str(&line);
            text.push('\n');
        }
        Ok(text)
    }

    /// Discard all buffered output for the slot.
    pub fn clear_output(&self, pane: usize) -> Result<()> {
        let slot = self.slot(pane)?;
        if let Ok(mut buffer) = slot.output.lock() {
            buffer.clear();
        }
        debug!(pane, "cleared output buffer");
        Ok(())
    }

    /// Periodic sweep: finalize processes that exited naturally and
    /// recycle slots in a terminal status back to idle. The completion
    /// banner is appended to the slot's output so the final drain shows
    /// it. Returns the number of slots recycled.
    pub fn cleanup_finished(&mut self) -> usize {
        let mut cleaned = 0;

        for pane in 0..MAX_PROCESSES {
            let slot = &mut self.slots[pane];

            // A process can exit without the reader having reaped it yet
            // (for example when a grandchild still holds the pipe open).
            // A non-blocking wait finalizes the status in that window.
            if slot.status().is_active() {
                if let Ok(mut guard) = slot.child.try_lock() {
                    if let Some(child) = guard.as_mut() {
                        if let Ok(Some(exit)) = child.try_wait() {
                            let code = exit.code();
                            record_exit(&slot.exit_code, &slot.status, code);
                            guard.take();
                            debug!(pane, ?code, "finalized exited process in cleanup");
                        }
                    }
                }
            }

            let status = slot.status();
            if status.is_terminal() {
                let code = slot.exit_code.lock().map(|c| *c).unwrap_or(None);
                info!(pane, status = status.label(), ?code, "recycling finished slot");

                if let Ok(mut buffer) = slot.output.lock() {
                    push_bounded(&mut buffer, completion_banner(status, code), self.buffer_size);
                }

                slot.retire();
                slot.set_status(ProcessStatus::Idle);
                if let Ok(mut guard) = slot.exit_code.lock() {
                    *guard = None;
                }
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            debug!(cleaned, "cleaned up finished processes");
        }
        cleaned
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        for pane in 0..MAX_PROCESSES {
            if self.is_running(pane) {
                let _ = self.terminate_script(pane);
            }
        }
    }
}

/// Body of the per-slot reader thread: drain the pipe line by line, then
/// reap the child and record its exit.
fn reader_loop(
    stdout: std::process::ChildStdout,
    output: &Mutex<VecDeque<String>>,
    status: &Mutex<ProcessStatus>,
    exit_code: &Mutex<Option<i32>>,
    child_cell: &Mutex<Option<Child>>,
    stop: &AtomicBool,
    buffer_size: usize,
) {
    debug!("output reader thread started");

    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match line {
            Ok(line) => {
                if let Ok(mut buffer) = output.lock() {
                    push_bounded(&mut buffer, line, buffer_size);
                }
            }
            Err(e) => {
                debug!("pipe read error: {e}");
                break;
            }
        }
    }

    // EOF: the child closed its end of the pipe. Reap it and record the
    // exit, unless termination already took over the slot.
    if let Ok(mut guard) = child_cell.lock() {
        if let Some(mut child) = guard.take() {
            match child.wait() {
                Ok(exit) => record_exit(exit_code, status, exit.code()),
                Err(e) => {
                    warn!("failed to wait for child: {e}");
                    record_exit(exit_code, status, None);
                }
            }
        }
    }

    debug!("output reader thread finished");
}

fn record_exit(exit_code: &Mutex<Option<i32>>, status: &Mutex<ProcessStatus>, code: Option<i32>) {
    if let Ok(mut guard) = exit_code.lock() {
        *guard = code;
    }
    if let Ok(mut guard) = status.lock() {
        // Termination already claimed the slot; keep that verdict.
        if guard.is_active() {
            *guard = match code {
                Some(0) => ProcessStatus::Finished,
                _ => ProcessStatus::Error,
            };
        }
    }
}

fn push_bounded(buffer: &mut VecDeque<String>, line: String, cap: usize) {
    buffer.push_back(line);
    while buffer.len() > cap {
        buffer.pop_front();
    }
}

fn completion_banner(status: ProcessStatus, code: Option<i32>) -> String {
    match (status, code) {
        (ProcessStatus::Finished, _) => {
            "\x1b[32mprocess completed successfully\x1b[0m".to_string()
        }
        (ProcessStatus::Terminated, _) => "\x1b[33mprocess terminated\x1b[0m".to_string(),
        (_, Some(code)) => format!("\x1b[31mprocess exited with code {code}\x1b[0m"),
        (_, None) => "\x1b[31mprocess exited abnormally\x1b[0m".to_string(),
    }
}

/// Signal-0 liveness probe. A zombie still counts as alive until reaped.
fn is_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}

/// SIGTERM, a bounded grace period, then SIGKILL. Returns whether the
/// process is gone when we give up waiting.
fn kill_with_escalation(pid: i32) -> bool {
    let target = Pid::from_raw(pid);
    debug!(pid, "sending SIGTERM");

    if signal::kill(target, Signal::SIGTERM).is_err() {
        // Likely exited between the liveness check and the signal.
        return !is_alive(pid);
    }

    let deadline = Instant::now() + TERMINATION_TIMEOUT;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            debug!(pid, "process exited after SIGTERM");
            return true;
        }
        std::thread::sleep(LIVENESS_POLL);
    }

    warn!(pid, "process survived SIGTERM, sending SIGKILL");
    let _ = signal::kill(target, Signal::SIGKILL);
    std::thread::sleep(Duration::from_millis(200));
    !is_alive(pid)
}
