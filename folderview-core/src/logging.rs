//! src/logging.rs
//! ============================================================================
//! # Logging: structured JSON log installation
//!
//! Installs one global `tracing` subscriber: an `EnvFilter` plus a JSON `fmt`
//! layer writing to a rolling, non-blocking `.jsonl` file. Span close events
//! are recorded so `#[instrument]`ed filter passes and reloads carry their
//! busy/idle timings. The returned [`WorkerGuard`] must be held for the life
//! of the process; dropping it flushes and stops the writer thread.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{format::FmtSpan, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,

    /// Also emit an event when an instrumented span closes.
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Self::NEVER,
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("folderview"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
            span_events: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.log_level = CompactString::new(level);
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = log_dir.into();
        self
    }

    pub async fn build(self) -> Result<WorkerGuard> {
        validate_config(&self.config)?;

        if LOGGER_INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoggingError::AlreadyInitialized.into());
        }

        match self.install().await {
            Ok(guard) => Ok(guard),
            Err(e) => {
                LOGGER_INSTALLED.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn install(self) -> Result<WorkerGuard> {
        let config = self.config;
        setup_log_directory(&config.log_dir).await?;

        let file_appender = RollingFileAppender::builder()
            .rotation(config.rotation.into())
            .filename_prefix(config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(config.max_log_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::from_default_env().add_directive(
            Directive::from_str(&config.log_level).context("Invalid log level in config")?,
        );

        let span_events = if config.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(false)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        tracing::info!(
            marker = "LOGGER_INSTALLED",
            log_dir = %config.log_dir.display(),
            level = %config.log_level,
            "Structured logging initialized"
        );

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_config(config: &LoggerConfig) -> Result<()> {
    if config.log_file_prefix.trim().is_empty() {
        return Err(
            LoggingError::ConfigError("Log file prefix must not be empty".to_string()).into(),
        );
    }

    if config.max_log_files == 0 {
        return Err(
            LoggingError::ConfigError("Max log files must be greater than 0".to_string()).into(),
        );
    }

    Directive::from_str(&config.log_level)
        .map_err(|e| LoggingError::ConfigError(format!("Invalid log level: {e}")))?;

    validate_log_directory(&config.log_dir)?;
    Ok(())
}

fn validate_log_directory(path: &Path) -> Result<()> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()).into());
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(LoggingError::InvalidLogDirectory(
                "Path contains parent directory references".to_string(),
            )
            .into());
        }
    }

    Ok(())
}

async fn setup_log_directory(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        TokioFs::create_dir_all(log_dir)
            .await
            .map_err(LoggingError::DirectoryCreationFailed)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(())
}

pub async fn init_default_logging() -> Result<WorkerGuard> {
    LoggerBuilder::new().build().await
}

pub async fn init_logging_with_level(level: &str) -> Result<WorkerGuard> {
    LoggerBuilder::new().with_level(level).build().await
}

pub async fn init_logging_with_config(config: LoggerConfig) -> Result<WorkerGuard> {
    LoggerBuilder::new().with_config(config).build().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_parent_dir_and_empty_path() {
        let parent = LoggerConfig {
            log_dir: PathBuf::from("../outside"),
            ..LoggerConfig::default()
        };
        let empty = LoggerConfig {
            log_dir: PathBuf::new(),
            ..LoggerConfig::default()
        };

        assert!(validate_config(&parent).is_err());
        assert!(validate_config(&empty).is_err());
    }

    #[test]
    fn test_rejects_bad_level_and_zero_files() {
        let bad_level = LoggerConfig {
            log_level: CompactString::new("not a [level"),
            ..LoggerConfig::default()
        };
        let no_files = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };

        assert!(validate_config(&bad_level).is_err());
        assert!(validate_config(&no_files).is_err());
    }

    #[tokio::test]
    async fn test_setup_creates_nested_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("a").join("b");

        setup_log_directory(&nested).await.expect("created");
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_setup_under_a_file_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").expect("write");

        let err = setup_log_directory(&blocker.join("logs"))
            .await
            .expect_err("parent is a file");

        assert!(matches!(
            err.downcast_ref::<LoggingError>(),
            Some(LoggingError::DirectoryCreationFailed(_))
        ));
    }

    #[test]
    fn test_rotation_deserializes_lowercase() {
        let cfg: LoggerConfig = toml::from_str("rotation = \"hourly\"").expect("parse");
        assert_eq!(cfg.rotation, LogRotation::Hourly);
        assert_eq!(cfg.log_level, "info");
    }
}
