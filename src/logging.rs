//! # Logging
//!
//! Process-wide leveled logging with an explicit initialization step.
//! The interactive session logs to a file so tracing output never
//! corrupts the terminal UI; headless modes log to stderr instead.
//!
//! Built on `tracing` + `tracing-subscriber`. The level comes from
//! [`Settings::log_level`], and `RUST_LOG` style directives are still
//! honored through the environment filter for finer-grained control.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// Append to the configured log file (interactive TUI sessions).
    File,
    /// Write to stderr (headless modes, where no UI can be corrupted).
    Stderr,
}

/// Install the global tracing subscriber.
///
/// Must be called once, before any subsystem logs. Returns
/// [`Error::FileSystem`] when the log file cannot be opened.
pub fn init(settings: &Settings, sink: LogSink) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(settings.log_level.into());

    match sink {
        LogSink::File => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .map_err(|e| {
                    Error::FileSystem(format!(
                        "cannot open log file {}: {e}",
                        settings.log_file.display()
                    ))
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogSink::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }

    Ok(())
}
