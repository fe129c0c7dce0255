//! Tracing subscriber setup
//!
//! Logs always go to a file: the host terminal belongs to the UI.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber writing to `log_file_path`.
///
/// Filtering follows `RUST_LOG`, with DEBUG as the default level.
pub fn init_global(log_file_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let log_file = File::create(log_file_path)
        .with_context(|| format!("Failed to create log file {}", log_file_path.display()))?;

    build_subscriber(log_file)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Build a subscriber with file logging.
///
/// Shared between production and tests.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::DEBUG.into())
        .from_env_lossy();
    // Grid updates are far too chatty at debug
    if let Ok(directive) = "alacritty_terminal=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_thread_names(true);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_subscriber_writes_to_file() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("dialog opened");
            tracing::warn!("terminal failed to start");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("INFO"));
        assert!(contents.contains("dialog opened"));
        assert!(contents.contains("WARN"));
        assert!(contents.contains("terminal failed to start"));
        // No color codes in the file
        assert!(!contents.contains("\x1b["));
    }

    #[test]
    fn test_subscriber_includes_debug_by_default() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("debug detail");
            tracing::trace!("trace detail");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("debug detail"));
        assert!(!contents.contains("trace detail"));
    }
}
