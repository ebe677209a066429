//! Raw diagnostics logging for debugging.

use chrono::Utc;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Set up the diagnostics directory and return the log file path.
pub fn setup_log_file() -> PathBuf {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir).ok();

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    log_dir.join(format!("{}.log", timestamp))
}

/// Get the diagnostics directory path.
pub fn log_directory() -> PathBuf {
    let base_dir = env::var("TMPDIR")
        .or_else(|_| env::var("XDG_RUNTIME_DIR"))
        .unwrap_or_else(|_| "/tmp".to_string());

    let project_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    PathBuf::from(base_dir)
        .join("sirpi")
        .join("logs")
        .join(project_name)
}

/// Best-effort append of one line to a diagnostics file. Dropped frames and
/// malformed payloads land here; failures to log are themselves ignored.
pub fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        let _ = writeln!(file, "{} {}", Utc::now().format("%H:%M:%S%.3f"), line);
    }
}
