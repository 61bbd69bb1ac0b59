//! Shared logging utilities for VMS binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "vms=info,vms_provision=info,vms_store=info";
const HOME_ENV: &str = "VMS_HOME";

/// Logging configuration shared by VMS binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
    /// Write a daily-rolling log file under [`logs_dir`].
    pub file: bool,
}

/// Keeps the background file writer alive; drop it only at process exit.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing with stderr output and an optional rolling file writer.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let base_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let console_filter = if config.verbose {
        base_filter()
    } else {
        EnvFilter::new("warn")
    };

    let (file_layer, guard) = if config.file {
        let dir = ensure_logs_dir().context("Failed to ensure log directory")?;
        let appender =
            tracing_appender::rolling::daily(&dir, format!("{}.log", sanitize_name(config.app_name)));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(base_filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}

/// Get the VMS home directory: `$VMS_HOME`, else `~/.vms`, else `./.vms`.
pub fn vms_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vms")
}

/// Get the logs directory: <home>/logs
pub fn logs_dir() -> PathBuf {
    logs_dir_in(&vms_home())
}

fn logs_dir_in(home: &Path) -> PathBuf {
    home.join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("vms-server"), "vms-server");
        assert_eq!(sanitize_name("vms server/1"), "vms_server_1");
    }

    #[test]
    fn test_logs_dir_is_under_home() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(logs_dir_in(home.path()), home.path().join("logs"));
    }
}
