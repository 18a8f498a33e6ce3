//! # Splitrun CLI Entry Point
//!
//! Splitrun is a terminal multi-pane script runner: a script list on the
//! left, two live output panes on the right, and a process supervisor
//! that runs up to two scripts concurrently.
//!
//! ## Usage
//!
//! ```bash
//! # Launch the interactive UI, discovering scripts from the defaults
//! splitrun
//!
//! # Discover from a specific directory
//! splitrun --scripts-dir ./deploy
//!
//! # Headless: print discovered scripts and exit
//! splitrun --list-scripts
//!
//! # Headless: run one script (or several, stopping at the first failure)
//! splitrun --execute ./deploy/migrate.sh
//! splitrun --batch ./jobs/a.sh ./jobs/b.py
//! ```
//!
//! ## Key Bindings
//!
//! - `Up`/`k`, `Down`/`j` - move in the script list (separators skipped)
//! - `Enter` - run the selection in the active output pane
//! - `Space` - run the selection in the next idle pane
//! - `Tab` - cycle focus between the output panes
//! - `Ctrl+C` / `t` - terminate the active pane's process
//! - `PageUp`/`PageDown`, mouse wheel - scroll output
//! - `Ctrl+L` - clear the active output pane
//! - `r` / `F5` - refresh the script list
//! - `Ctrl+Left`/`Ctrl+Right`, `[`, `]`, `,`, `.` - resize panes
//! - `Ctrl+R` - rebuild the interface
//! - `F1` / `?` - help, `Ctrl+Q` / `Esc` - quit

use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use splitrun::config::Settings;
use splitrun::error::Error;
use splitrun::logging::{self, LogSink};
use splitrun::process::{discover_scripts, is_executable, ProcessManager};
use splitrun::runner::{CrosstermEventReader, ScriptRunner};
use splitrun::ui::layout::{MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH};

/// Splitrun - run scripts side by side in a multi-pane terminal UI
#[derive(Parser, Debug)]
#[command(name = "splitrun")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A multi-pane terminal script runner", long_about = None)]
struct Args {
    /// Print all discovered scripts and exit
    #[arg(long, conflicts_with_all = ["execute", "batch"])]
    list_scripts: bool,

    /// Run a single script headlessly, streaming its output to stdout
    #[arg(long, value_name = "FILE", conflicts_with = "batch")]
    execute: Option<PathBuf>,

    /// Run several scripts headlessly in sequence, stopping at the first
    /// failure
    #[arg(long, value_name = "FILE", num_args = 1..)]
    batch: Vec<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Directory to discover scripts in (replaces the default roots)
    #[arg(long, value_name = "DIR")]
    scripts_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = &args.scripts_dir {
        settings.scripts_dir = Some(dir.clone());
    }
    if args.debug {
        settings.log_level = tracing::Level::DEBUG;
    }

    // Headless modes log to stderr; the interactive UI logs to a file so
    // tracing output cannot corrupt the display.
    if args.list_scripts {
        logging::init(&settings, LogSink::Stderr)?;
        return list_scripts(&settings);
    }
    if let Some(script) = &args.execute {
        logging::init(&settings, LogSink::Stderr)?;
        let code = run_headless(&settings, std::slice::from_ref(script)).await?;
        std::process::exit(code);
    }
    if !args.batch.is_empty() {
        logging::init(&settings, LogSink::Stderr)?;
        let code = run_headless(&settings, &args.batch).await?;
        std::process::exit(code);
    }

    logging::init(&settings, LogSink::File)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting splitrun");

    // Fatal startup errors print to stderr since the UI is not active yet.
    if let Err(e) = check_terminal_size() {
        error!("startup failed: {e}");
        eprintln!("{e}");
        std::process::exit(1);
    }

    // Restore the terminal even if the application panics.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let result = run_interactive(settings).await;

    let _ = panic::take_hook();

    if let Err(e) = &result {
        error!("application error: {e}");
    }
    result
}

fn check_terminal_size() -> Result<(), Error> {
    let (width, height) = crossterm::terminal::size()
        .map_err(|e| Error::Ui(format!("cannot query terminal size: {e}")))?;
    if width < MIN_TERMINAL_WIDTH || height < MIN_TERMINAL_HEIGHT {
        return Err(Error::Ui(format!(
            "terminal too small: {width}x{height} (minimum {MIN_TERMINAL_WIDTH}x{MIN_TERMINAL_HEIGHT} required)"
        )));
    }
    Ok(())
}

async fn run_interactive(settings: Settings) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode for terminal")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut runner = ScriptRunner::new(&settings);
    let mut events = CrosstermEventReader;
    let run_result = runner.run(&mut terminal, &mut events).await;

    // Restore the terminal even when the event loop failed.
    let cleanup_result = cleanup_terminal(&mut terminal);

    run_result?;
    cleanup_result?;
    Ok(())
}

/// Clean up terminal state
fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;

    terminal.show_cursor().context("Failed to show cursor")?;

    Ok(())
}

/// Print discovered scripts grouped by directory.
fn list_scripts(settings: &Settings) -> Result<()> {
    let mut total = 0;
    for dir in settings.script_directories() {
        let scripts =
            discover_scripts(&dir).with_context(|| format!("failed to scan {}", dir.display()))?;
        if scripts.is_empty() {
            continue;
        }
        println!("{}:", dir.display());
        for script in &scripts {
            println!("  {}", script.display());
        }
        total += scripts.len();
    }
    if total == 0 {
        eprintln!("No executable scripts found.");
        eprintln!("Searched: {:?}", settings.script_directories());
    }
    Ok(())
}

/// Run scripts sequentially without the UI, streaming captured output to
/// stdout. Returns the first non-zero exit code, or 0.
async fn run_headless(settings: &Settings, scripts: &[PathBuf]) -> Result<i32> {
    let mut manager = ProcessManager::new(settings.buffer_size);

    for script in scripts {
        if !is_executable(script) {
            anyhow::bail!("script is not executable: {}", script.display());
        }

        let started = manager
            .start_script(script, 0)
            .with_context(|| format!("failed to set up {}", script.display()))?;
        if !started {
            anyhow::bail!("failed to start {}", script.display());
        }

        loop {
            stream_output(&manager)?;
            if !manager.is_running(0) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // The reader thread has seen EOF by now; drain what is left.
        stream_output(&manager)?;

        let code = manager
            .exit_code(0)
            .map_err(anyhow::Error::from)?
            .unwrap_or(1);
        manager.cleanup_finished();
        // Discard the completion banner; headless output stays raw.
        let _ = manager.take_output(0);

        info!(script = %script.display(), code, "headless script finished");
        if code != 0 {
            return Ok(code);
        }
    }

    Ok(0)
}

fn stream_output(manager: &ProcessManager) -> Result<()> {
    let text = manager.take_output(0).map_err(anyhow::Error::from)?;
    if !text.is_empty() {
        print!("{text}");
        io::stdout().flush().context("failed to flush stdout")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_is_interactive() {
        let args = Args::parse_from(["splitrun"]);
        assert!(!args.list_scripts);
        assert!(args.execute.is_none());
        assert!(args.batch.is_empty());
        assert!(!args.debug);
        assert!(args.scripts_dir.is_none());
    }

    #[test]
    fn test_args_parse_execute() {
        let args = Args::parse_from(["splitrun", "--execute", "/tmp/job.sh"]);
        assert_eq!(args.execute, Some(PathBuf::from("/tmp/job.sh")));
    }

    #[test]
    fn test_args_parse_batch() {
        let args = Args::parse_from(["splitrun", "--batch", "a.sh", "b.sh"]);
        assert_eq!(args.batch, vec![PathBuf::from("a.sh"), PathBuf::from("b.sh")]);
    }

    #[test]
    fn test_args_execute_conflicts_with_batch() {
        let result = Args::try_parse_from([
            "splitrun",
            "--execute",
            "a.sh",
            "--batch",
            "b.sh",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_scripts_dir() {
        let args = Args::parse_from(["splitrun", "--scripts-dir", "/opt/jobs", "--debug"]);
        assert_eq!(args.scripts_dir, Some(PathBuf::from("/opt/jobs")));
        assert!(args.debug);
    }

    #[tokio::test]
    async fn test_run_headless_executes_script() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().expect("create temp dir");
        let script = temp.path().join("ok.sh");
        fs::write(&script, "#!/bin/sh\nexit 0\n").expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let settings = Settings::default();
        let code = run_headless(&settings, &[script]).await.expect("run");
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_run_headless_propagates_exit_code() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().expect("create temp dir");
        let failing = temp.path().join("fail.sh");
        fs::write(&failing, "#!/bin/sh\nexit 7\n").expect("write script");
        fs::set_permissions(&failing, fs::Permissions::from_mode(0o755)).expect("chmod");
        let never_run = temp.path().join("after.sh");
        fs::write(&never_run, "#!/bin/sh\nexit 0\n").expect("write script");
        fs::set_permissions(&never_run, fs::Permissions::from_mode(0o755)).expect("chmod");

        let settings = Settings::default();
        let code = run_headless(&settings, &[failing, never_run])
            .await
            .expect("run");
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn test_run_headless_rejects_non_executable() {
        use std::fs;

        let temp = tempfile::TempDir::new().expect("create temp dir");
        let script = temp.path().join("plain.sh");
        fs::write(&script, "#!/bin/sh\nexit 0\n").expect("write script");

        let settings = Settings::default();
        let result = run_headless(&settings, &[script]).await;
        assert!(result.is_err());
    }
}
