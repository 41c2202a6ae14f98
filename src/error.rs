//! Error types for rusty-logbook.

use std::path::PathBuf;

/// Result type alias for log reading operations.
pub type Result<T> = std::result::Result<T, LogError>;

/// Failures that stop a whole operation.
///
/// Problems confined to a single row of a dataset are not errors; they are
/// recorded as [`Diagnostic`](crate::data::model::Diagnostic)s on the
/// extracted dataset instead.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file does not exist or could not be opened.
    #[error("log file {path:?} not found or unreadable: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or seeking failed after the file was opened.
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Requested dataset does not exist.
    #[error("dataset {index} requested but the file holds {n_logs}")]
    IndexOutOfRange { index: usize, n_logs: usize },

    /// Named marker preset is not one of the built-in formats.
    #[error("unknown log format '{name}' (expected one of: {expected})")]
    UnknownFormat { name: String, expected: String },

    /// A user-supplied marker pattern failed to compile.
    #[error("invalid marker pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Reader configuration could not be parsed.
    #[error("invalid reader configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A plot callout referenced something that is not in the log.
    #[error("report error: {message}")]
    Report { message: String },

    /// Building the Arrow view of a dataset failed.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl LogError {
    /// Classify an open failure: missing and unreadable files are both
    /// reported as `NotFound`, anything else as `Io`.
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let path = path.into();
        match source.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => LogError::NotFound { path, source },
            _ => LogError::Io { path, source },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn report(message: impl Into<String>) -> Self {
        LogError::Report {
            message: message.into(),
        }
    }
}
