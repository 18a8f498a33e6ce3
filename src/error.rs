//! Application error taxonomy.
//!
//! Every subsystem reports failures through [`Error`]. Initialization
//! failures abort the run with a non-zero exit code; per-script failures
//! are recovered locally and surfaced as pane text or status messages.

use thiserror::Error;

/// Top-level error type shared by all subsystems.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal UI failures: terminal too small, backend initialization,
    /// drawing errors.
    #[error("UI error: {0}")]
    Ui(String),

    /// Process supervision failures: spawn setup, reader thread creation,
    /// invalid pane indices.
    #[error("process error: {0}")]
    Process(String),

    /// File system failures: inaccessible script directories, unreadable
    /// log file paths.
    #[error("filesystem error: {0}")]
    FileSystem(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = Error::Ui("terminal too small (minimum 80x24 required)".to_string());
        assert!(err.to_string().contains("80x24"));

        let err = Error::Process("invalid pane index: 7".to_string());
        assert!(err.to_string().starts_with("process error"));

        let err = Error::FileSystem("cannot read /root/locked".to_string());
        assert!(err.to_string().starts_with("filesystem error"));
    }
}
