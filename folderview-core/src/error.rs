//! ``src/error.rs``
//! ============================================================================
//! # `ViewError`: unified error type for the folder view engine
//!
//! • Stack-friendly payloads (`CompactString`)
//! • One-call `tracing` emission via [`ViewError::trace`]
//! • `#[non_exhaustive]` for forward-compatible extension
use std::io::{self, ErrorKind};

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;
use tracing::{Level, event};

/// Convenient alias carrying the crate error type
pub type ViewResult<T> = Result<T, ViewError>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ViewError {
    // ────────────────────────────────────────────────────────────
    // Table access
    // ────────────────────────────────────────────────────────────
    #[error("Row {row} out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("Column {column} out of range (column count {column_count})")]
    ColumnOutOfRange { column: usize, column_count: usize },

    // ────────────────────────────────────────────────────────────
    // Folder collaborator
    // ────────────────────────────────────────────────────────────
    #[error("Directory not found: {0}")]
    DirectoryNotFound(CompactString),

    #[error("Listing {directory} failed: {reason}")]
    ProviderFailed {
        directory: CompactString,
        reason: CompactString,
    },

    // ────────────────────────────────────────────────────────────
    // Configuration
    // ────────────────────────────────────────────────────────────
    #[error("Invalid config: {field} - {message}")]
    InvalidConfig {
        field: CompactString,
        message: CompactString,
    },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config I/O error: {kind:?}")]
    ConfigIo {
        kind: ErrorKind,
        #[source]
        source: Box<io::Error>,
    },

    // ────────────────────────────────────────────────────────────
    // Notification channel
    // ────────────────────────────────────────────────────────────
    #[error("Notification channel closed: {0}")]
    ChannelClosed(CompactString),
}

impl ViewError {
    /// Whether the view can keep running and render a status row instead
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_)
                | Self::ProviderFailed { .. }
                | Self::ConfigIo { .. }
                | Self::ConfigParse(_)
        )
    }

    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::RowOutOfRange { .. } | Self::ColumnOutOfRange { .. } => "table_access",

            Self::DirectoryNotFound(_) | Self::ProviderFailed { .. } => "folder_listing",

            Self::InvalidConfig { .. } | Self::ConfigParse(_) | Self::ConfigIo { .. } => {
                "configuration"
            }

            Self::ChannelClosed(_) => "notification_channel",
        }
    }

    #[inline]
    #[must_use]
    const fn error_marker(&self) -> &'static str {
        match self {
            Self::RowOutOfRange { .. } => "ERROR_ROW_OUT_OF_RANGE",

            Self::ColumnOutOfRange { .. } => "ERROR_COLUMN_OUT_OF_RANGE",

            Self::DirectoryNotFound(_) => "ERROR_DIRECTORY_NOT_FOUND",

            Self::ProviderFailed { .. } => "ERROR_PROVIDER_FAILED",

            Self::InvalidConfig { .. } => "ERROR_INVALID_CONFIG",

            Self::ConfigParse(_) => "ERROR_CONFIG_PARSE",

            Self::ConfigIo { .. } => "ERROR_CONFIG_IO",

            Self::ChannelClosed(_) => "ERROR_CHANNEL_CLOSED",
        }
    }

    // ────────────────────────────────────────────────────────────
    // Single-call tracing emission
    // ────────────────────────────────────────────────────────────
    #[must_use]
    pub fn trace(self) -> Self {
        event!(
            Level::ERROR,
            marker = self.error_marker(),
            operation_type = self.operation_type(),
            error = %self,
            recoverable = self.is_recoverable(),
        );

        self
    }

    // ────────────────────────────────────────────────────────────
    // Smart constructors
    // ────────────────────────────────────────────────────────────
    #[inline]
    #[must_use]
    pub const fn row_out_of_range(row: usize, row_count: usize) -> Self {
        Self::RowOutOfRange { row, row_count }
    }

    #[inline]
    #[must_use]
    pub fn directory_not_found(directory: &str) -> Self {
        Self::DirectoryNotFound(CompactString::new(directory))
    }

    #[inline]
    #[must_use]
    pub fn provider_failed(directory: &str, reason: &str) -> Self {
        Self::ProviderFailed {
            directory: CompactString::new(directory),
            reason: CompactString::new(reason),
        }
    }

    #[inline]
    #[must_use]
    pub fn invalid_config(field: &str, message: &str) -> Self {
        Self::InvalidConfig {
            field: CompactString::new(field),
            message: CompactString::new(message),
        }
    }

    #[inline]
    #[must_use]
    pub fn channel_closed(channel: &str) -> Self {
        Self::ChannelClosed(CompactString::new(channel))
    }
}

// Sources are not all `Clone`; they are rebuilt from kind and message.
impl Clone for ViewError {
    fn clone(&self) -> Self {
        match self {
            Self::RowOutOfRange { row, row_count } => Self::RowOutOfRange {
                row: *row,
                row_count: *row_count,
            },
            Self::ColumnOutOfRange {
                column,
                column_count,
            } => Self::ColumnOutOfRange {
                column: *column,
                column_count: *column_count,
            },
            Self::DirectoryNotFound(dir) => Self::DirectoryNotFound(dir.clone()),
            Self::ProviderFailed { directory, reason } => Self::ProviderFailed {
                directory: directory.clone(),
                reason: reason.clone(),
            },
            Self::InvalidConfig { field, message } => Self::InvalidConfig {
                field: field.clone(),
                message: message.clone(),
            },
            Self::ConfigParse(e) => Self::InvalidConfig {
                field: CompactString::const_new("toml"),
                message: e.to_compact_string(),
            },
            Self::ConfigIo { kind, source } => Self::ConfigIo {
                kind: *kind,
                source: Box::new(io::Error::new(source.kind(), source.to_string())),
            },
            Self::ChannelClosed(name) => Self::ChannelClosed(name.clone()),
        }
    }
}

impl From<io::Error> for ViewError {
    fn from(err: io::Error) -> Self {
        Self::ConfigIo {
            kind: err.kind(),
            source: Box::new(err),
        }
    }
}
