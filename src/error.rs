use std::path::PathBuf;

use thiserror::Error;

/// Main error type for nobus operations
#[derive(Error, Debug)]
pub enum NobusError {
    #[error("IO error during {context}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("{resource} '{identifier}' not found")]
    NotFound { resource: String, identifier: String },

    #[error("{resource} '{identifier}' already exists")]
    AlreadyExists { resource: String, identifier: String },

    /// The cache on disk does not look the way it was written. Never repaired automatically.
    #[error("Inconsistent cache at {}: {reason}", path.display())]
    Inconsistent { path: PathBuf, reason: String },

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidArgument {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Configuration error{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        message: String,
        path: Option<PathBuf>,
    },
}

impl NobusError {
    pub fn not_found(resource: &str, identifier: impl std::fmt::Display) -> Self {
        NobusError::NotFound {
            resource: resource.to_string(),
            identifier: identifier.to_string(),
        }
    }

    pub fn already_exists(resource: &str, identifier: impl std::fmt::Display) -> Self {
        NobusError::AlreadyExists {
            resource: resource.to_string(),
            identifier: identifier.to_string(),
        }
    }

    pub fn invalid_argument(field: &str, value: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        NobusError::InvalidArgument {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn inconsistent(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        NobusError::Inconsistent {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NobusError>;

pub trait ErrorContext<T> {
    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| NobusError::Io {
            source: e,
            context: f(),
        })
    }
}

impl<T> ErrorContext<T> for std::result::Result<T, walkdir::Error> {
    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| NobusError::Io {
            source: e.into(),
            context: f(),
        })
    }
}
