//! Error types shared across Cutsync crates.

use std::path::PathBuf;

/// Top-level error type for Cutsync operations.
#[derive(Debug, thiserror::Error)]
pub enum CutsyncError {
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Tracking database error: {message}")]
    Tracking { message: String },

    #[error("Job submission error: {message}")]
    Submission { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CutsyncError.
pub type CutsyncResult<T> = Result<T, CutsyncError>;

impl CutsyncError {
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking {
            message: msg.into(),
        }
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
