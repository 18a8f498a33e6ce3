//! Discovery and configuration tests
//!
//! Exercises script discovery and settings parsing the way the CLI entry
//! point wires them together.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use splitrun::config::{parse_buffer_size, parse_level, Settings};
use splitrun::process::{build_command, discover_scripts, is_executable};
use tempfile::TempDir;

fn write_executable(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\necho hi\n").expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

#[test]
fn test_discovery_spans_mixed_script_types() {
    let temp = TempDir::new().expect("create temp dir");
    write_executable(temp.path(), "deploy.sh");
    write_executable(temp.path(), "report.py");
    write_executable(temp.path(), "tool");
    fs::write(temp.path().join("README.md"), "docs").expect("write");

    let scripts = discover_scripts(temp.path()).expect("discover");
    assert_eq!(scripts.len(), 3);
    assert!(scripts.iter().all(|s| is_executable(s)));
}

#[test]
fn test_discovery_empty_directory() {
    let temp = TempDir::new().expect("create temp dir");
    let scripts = discover_scripts(temp.path()).expect("discover");
    assert!(scripts.is_empty());
}

#[tokio::test]
async fn test_settings_drive_discovery_roots() {
    let temp = TempDir::new().expect("create temp dir");
    write_executable(temp.path(), "only.sh");

    let settings = Settings {
        scripts_dir: Some(temp.path().to_path_buf()),
        ..Settings::default()
    };

    let dirs = settings.script_directories();
    assert_eq!(dirs, vec![temp.path().to_path_buf()]);

    let scripts = discover_scripts(&dirs[0]).expect("discover");
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].ends_with("only.sh"));
}

#[test]
fn test_env_value_parsers() {
    assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
    assert_eq!(parse_level("nonsense"), None);
    assert_eq!(parse_buffer_size("500"), Some(500));
    assert_eq!(parse_buffer_size("0"), None);
}

#[test]
fn test_command_construction_matches_interpreters() {
    let cases = [
        ("job.py", "python3"),
        ("job.sh", "bash"),
        ("job.js", "node"),
        ("job.rb", "ruby"),
        ("job.pl", "perl"),
    ];
    for (name, interpreter) in cases {
        let command = build_command(Path::new(name));
        assert!(
            command.starts_with(interpreter),
            "{name} should use {interpreter}, got {command}"
        );
    }
    // Extensionless files run directly.
    assert_eq!(build_command(Path::new("/opt/tool")), "\"/opt/tool\"");
}
