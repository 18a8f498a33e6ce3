//! # Runtime Settings
//!
//! Settings are assembled from environment variables and command-line
//! flags; nothing is persisted between runs. Recognized variables:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `SCRIPT_RUNNER_LOG_LEVEL` | `DEBUG`, `INFO`, `WARNING` or `ERROR` | `INFO` |
//! | `SCRIPT_RUNNER_BUFFER_SIZE` | captured output lines kept per pane | `1000` |
//! | `SCRIPT_RUNNER_SCRIPTS_DIR` | overrides the default discovery roots | unset |
//!
//! The log file lives at `~/.script-runner.log`, resolved through the
//! `directories` crate, with a working-directory fallback when no home
//! directory can be determined.

use std::path::PathBuf;

use tracing::Level;

/// Default number of captured output lines retained per pane.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

const LOG_FILE_NAME: &str = ".script-runner.log";

/// Runtime configuration shared by the binary and the controller.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Minimum level written to the log sink.
    pub log_level: Level,
    /// Captured output lines kept per pane before eviction.
    pub buffer_size: usize,
    /// Optional user-supplied discovery root, replacing the defaults.
    pub scripts_dir: Option<PathBuf>,
    /// Log file destination for the interactive session.
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            buffer_size: DEFAULT_BUFFER_SIZE,
            scripts_dir: None,
            log_file: default_log_file(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(value) = std::env::var("SCRIPT_RUNNER_LOG_LEVEL") {
            match parse_level(&value) {
                Some(level) => settings.log_level = level,
                None => eprintln!("Warning: ignoring invalid SCRIPT_RUNNER_LOG_LEVEL: {value}"),
            }
        }

        if let Ok(value) = std::env::var("SCRIPT_RUNNER_BUFFER_SIZE") {
            match parse_buffer_size(&value) {
                Some(size) => settings.buffer_size = size,
                None => eprintln!("Warning: ignoring invalid SCRIPT_RUNNER_BUFFER_SIZE: {value}"),
            }
        }

        if let Ok(value) = std::env::var("SCRIPT_RUNNER_SCRIPTS_DIR") {
            if !value.is_empty() {
                settings.scripts_dir = Some(PathBuf::from(value));
            }
        }

        settings
    }

    /// Directories searched for executable scripts. A configured
    /// `scripts_dir` replaces the default roots entirely; otherwise the
    /// conventional locations are probed and only existing ones kept,
    /// with the current directory as the last resort.
    pub fn script_directories(&self) -> Vec<PathBuf> {
        if let Some(dir) = &self.scripts_dir {
            return vec![dir.clone()];
        }

        let candidates = [
            PathBuf::from("scripts"),
            PathBuf::from("demos/sample_scripts"),
            PathBuf::from("."),
        ];
        let mut dirs: Vec<PathBuf> = candidates.into_iter().filter(|d| d.is_dir()).collect();
        if dirs.is_empty() {
            dirs.push(PathBuf::from("."));
        }
        dirs
    }
}

/// Parse a log level name as used by `SCRIPT_RUNNER_LOG_LEVEL`.
/// `WARNING` is accepted as an alias for `WARN`.
pub fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARNING" | "WARN" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

/// Parse a per-pane buffer size. Zero is rejected; a pane must be able to
/// hold at least one line.
pub fn parse_buffer_size(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|size| *size > 0)
}

fn default_log_file() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}
