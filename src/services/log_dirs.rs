//! Log file locations
//!
//! Logs live in `$XDG_STATE_HOME/termdialog/logs/` (typically
//! `~/.local/state/termdialog/logs/`), one `termdialog-{PID}.log` per run so
//! concurrent instances never share a file. Logs of dead processes are removed
//! on startup once they are a day old.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

/// Minimum age for log files to be cleaned up (24 hours)
const CLEANUP_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const APP_DIR: &str = "termdialog";

/// Cached log directory path
static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the log directory, creating it if necessary.
///
/// Falls back to the system temp directory when the state directory is
/// unavailable or cannot be created.
pub fn log_dir() -> &'static PathBuf {
    LOG_DIR.get_or_init(|| {
        let fallback = std::env::temp_dir().join("termdialog-logs");
        let dir = xdg_log_dir().unwrap_or_else(|| fallback.clone());

        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create log directory {:?}: {}", dir, e);
            return fallback;
        }

        dir
    })
}

fn xdg_log_dir() -> Option<PathBuf> {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(state_home);
        if path.is_absolute() {
            return Some(path.join(APP_DIR).join("logs"));
        }
    }

    dirs::home_dir().map(|home| home.join(".local").join("state").join(APP_DIR).join("logs"))
}

/// Log file for this process: `{log_dir}/termdialog-{PID}.log`
pub fn main_log_path() -> PathBuf {
    log_dir().join(format!("{}-{}.log", APP_DIR, std::process::id()))
}

/// Remove log files of processes that are no longer running.
pub fn cleanup_stale_logs() {
    cleanup_stale_logs_in_dir(log_dir(), std::process::id());
}

fn cleanup_stale_logs_in_dir(dir: &Path, current_pid: u32) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        let Some(pid) = extract_pid_from_filename(&name) else {
            continue;
        };
        if pid == current_pid {
            continue;
        }

        if !is_process_running(pid)
            && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && is_file_older_than(&entry.path(), CLEANUP_AGE)
        {
            match fs::remove_file(entry.path()) {
                Ok(()) => tracing::debug!("Cleaned up stale log file: {:?}", entry.path()),
                Err(e) => tracing::debug!("Failed to clean up stale log {:?}: {}", entry.path(), e),
            }
        }
    }
}

fn is_file_older_than(path: &Path, age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|elapsed| elapsed > age)
}

/// Extract PID from a filename like "termdialog-12345.log"
fn extract_pid_from_filename(name: &str) -> Option<u32> {
    let without_ext = name.strip_suffix(".log")?;
    let (_, pid) = without_ext.rsplit_once('-')?;
    pid.parse().ok()
}

/// Check if a process with the given PID is still running
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // Signal 0 only checks whether the process exists
        unsafe {
            libc::kill(pid as libc::pid_t, 0) == 0
                || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
        }
    }

    #[cfg(not(unix))]
    {
        // Assume running so nothing is removed by mistake
        let _ = pid;
        true
    }
}

/// Print the directories termdialog reads from and writes to
pub fn print_all_paths() {
    use std::io::Write;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let config_dir = dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("<unavailable>"));

    writeln!(handle, "termdialog directories:").ok();
    writeln!(handle).ok();
    writeln!(handle, "Config:     {}", config_dir.display()).ok();
    writeln!(
        handle,
        "  config.json:  {}",
        config_dir.join("config.json").display()
    )
    .ok();
    writeln!(
        handle,
        "  themes/:      {}",
        config_dir.join("themes").display()
    )
    .ok();
    writeln!(handle).ok();
    writeln!(handle, "Logs:       {}", log_dir().display()).ok();
}
