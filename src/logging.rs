//! Logging setup for the overlay host.
//!
//! Everything in the crate logs through the `log` facade with a bracketed
//! component prefix. `init_logging` installs an `env_logger` backend that
//! writes either to stderr or to a daily log file, with old files cleaned up.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{OverlayResult, ResultExt};

/// Maximum number of log files to keep
const MAX_LOG_FILES: usize = 5;

/// Log file name prefix
const LOG_FILE_PREFIX: &str = "vrcx_overlay_";

/// Default log directory (`<data dir>/VRCX/logs`), if the platform has one.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .map(|dir| dir.join("VRCX").join("logs"))
}

/// Initialize the logging backend.
///
/// Filter comes from `RUST_LOG` (default `info`). With `log_dir`, output goes
/// to today's file in that directory; otherwise to stderr. Calling this when a
/// logger is already installed is not an error.
pub fn init_logging(log_dir: Option<&Path>) -> OverlayResult<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let path = current_log_path(dir);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        builder.target(env_logger::Target::Pipe(Box::new(file)));
        cleanup_old_logs(dir);
    }

    if builder.try_init().is_err() {
        log::debug!("[LOGGING] Logger already installed");
        return Ok(());
    }

    log::info!("[LOGGING] Logging initialized");
    if let Some(dir) = log_dir {
        log::info!("[LOGGING] Log directory: {}", dir.display());
    }

    Ok(())
}

/// Path of the log file for today (one per day).
fn current_log_path(log_dir: &Path) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, date))
}

/// Keep only the newest MAX_LOG_FILES of our log files.
fn cleanup_old_logs(log_dir: &Path) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| is_own_log_file(&e.path()))
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(MAX_LOG_FILES) {
        let _ = fs::remove_file(file.path());
    }
}

fn is_own_log_file(path: &Path) -> bool {
    let is_log = path.extension().map(|ext| ext == "log").unwrap_or(false);
    let is_ours = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX))
        .unwrap_or(false);
    is_log && is_ours
}
