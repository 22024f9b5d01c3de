use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// File name prefix of the rolling log files.
const LOG_FILE_PREFIX: &str = "catvote";

/// Installs a console subscriber filtered at `log_level`, plus a daily
/// rolling file in `log_dir` when one is given.
///
/// `RUST_LOG` takes precedence over `log_level` when set. Keep the returned
/// guard alive for as long as file logging should keep flushing.
pub fn setup_logging(log_dir: Option<&Path>, log_level: &str) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(normalize_level(log_level)))?;

    let console = fmt::layer().with_target(true);

    match log_dir {
        Some(dir) => {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
            // Keep only the most recent file from previous runs.
            cleanup_old_logs(dir)?;

            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", LOG_FILE_PREFIX));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()?;
            Ok(None)
        }
    }
}

fn normalize_level(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" | "fatal" => "error",
        _ => "info",
    }
}

/// Deletes all but the newest `.log` file (by modification time) in `log_dir`.
pub fn cleanup_old_logs(log_dir: &Path) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| is_log_file(&e.path()))
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, e.path()))
        })
        .collect();

    // Newest first
    entries.sort_by_key(|(modified, _)| std::cmp::Reverse(*modified));

    for (_, path) in entries.iter().skip(1) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(error = %e, "Failed to delete old log file {}", path.display());
        }
    }

    Ok(())
}

// Daily files are named `catvote.log.YYYY-MM-DD`.
fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
}
