//! Script discovery.
//!
//! A file is a runnable script iff it carries an execute permission bit,
//! regardless of extension. The extension only decides which interpreter
//! the command line uses; extensionless executables run directly.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Recursively scan `dir` for executable files.
///
/// A missing directory yields an empty list (the caller may probe several
/// candidate roots); an unreadable directory is an [`Error::FileSystem`].
/// Results are sorted for stable presentation.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    debug!(directory = %dir.display(), "discovering scripts");

    if !dir.exists() {
        warn!(directory = %dir.display(), "script directory does not exist");
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(Error::FileSystem(format!(
            "path is not a directory: {}",
            dir.display()
        )));
    }

    let mut scripts = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // The root itself being unreadable is fatal; a nested
                // entry failing is only worth a warning.
                if err.depth() == 0 {
                    return Err(Error::FileSystem(format!(
                        "failed to scan directory {}: {err}",
                        dir.display()
                    )));
                }
                warn!("failed to read directory entry: {err}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && is_executable(path) {
            debug!(script = %path.display(), "found executable script");
            scripts.push(path.to_path_buf());
        }
    }

    scripts.sort();
    info!(
        count = scripts.len(),
        directory = %dir.display(),
        "script discovery complete"
    );
    Ok(scripts)
}

/// True iff `path` is a regular file with any execute permission bit set.
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match path.metadata() {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Build the shell command line that executes `script`.
///
/// The interpreter is chosen by extension; unknown or missing extensions
/// run the file directly as a binary.
pub fn build_command(script: &Path) -> String {
    let extension = script
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let quoted = format!("\"{}\"", script.display());
    match extension.as_deref() {
        Some("py") => format!("python3 {quoted}"),
        Some("sh") | Some("bash") => format!("bash {quoted}"),
        Some("js") => format!("node {quoted}"),
        Some("rb") => format!("ruby {quoted}"),
        Some("pl") => format!("perl {quoted}"),
        _ => quoted,
    }
}
