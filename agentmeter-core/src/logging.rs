//! Log setup for agentmeter.
//!
//! Stdout belongs to the rendered dashboard, so everything traced goes to
//! `$XDG_STATE_HOME/agentmeter/agentmeter.<YYYY-MM-DD>.log`, one file per
//! UTC day, with old files pruned past `logging.max_files`.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

const FILE_PREFIX: &str = "agentmeter";
const FILE_SUFFIX: &str = "log";

/// Flushes buffered log lines when dropped. Hold it for the life of `main`.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Install the global file subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let dir = Config::state_dir();
    let appender = file_appender(&dir, config)?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(level_filter(&config.level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install log subscriber: {}", e)))?;

    tracing::info!(
        file = %log_file_path(Utc::now().date_naive()).display(),
        level = %config.level,
        "Logging to file"
    );
    Ok(LoggingGuard { _worker: worker })
}

/// Subscriber for unit tests, captured by the test harness. Safe to call repeatedly.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The file agentmeter logs to on `date` (UTC).
pub fn log_file_path(date: NaiveDate) -> PathBuf {
    Config::state_dir().join(file_name(date))
}

fn file_name(date: NaiveDate) -> String {
    format!("{}.{}.{}", FILE_PREFIX, date.format("%Y-%m-%d"), FILE_SUFFIX)
}

fn file_appender(dir: &Path, config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX)
        .max_log_files(config.max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("cannot open log directory {}: {}", dir.display(), e)))
}

/// `RUST_LOG` if it parses, else the configured level, else `info`.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_is_date_suffixed() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(file_name(date), "agentmeter.2025-03-12.log");
        assert!(log_file_path(date).ends_with("agentmeter/agentmeter.2025-03-12.log"));
    }

    #[test]
    fn test_appender_writes_dated_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");
        let appender = file_appender(&dir, &LoggingConfig::default()).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(appender)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(sessions = 3, "aggregated");
        });

        let written = std::fs::read_to_string(dir.join(file_name(Utc::now().date_naive()))).unwrap();
        assert!(written.contains("aggregated"));
        assert!(written.contains("sessions=3"));
    }

    #[test]
    fn test_init_test_is_reentrant() {
        let _ = level_filter("not a level ===");
        init_test();
        init_test();
        tracing::debug!("still alive");
    }
}
