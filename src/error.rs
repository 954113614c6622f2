// src/error.rs

//! Crate-wide error type for the deckhand agent

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No installer is registered for the requested package format
    #[error("Unsupported package type: {0}")]
    UnsupportedPackageType(String),

    /// An installer registration resolved to a non-conforming implementation
    #[error("Invalid installer implementation: {0}")]
    InvalidInstaller(String),

    /// Package extraction or target directory setup failed
    #[error("Installation failed: {0}")]
    Installation(String),

    /// A lifecycle hook script exited non-zero
    #[error("Stage script \"{stage}\" failed with exit code {code}")]
    StageScriptFailed { stage: String, code: i32 },

    /// A lifecycle hook script did not exit within the configured timeout
    #[error("Stage script \"{stage}\" timed out after {} seconds", .timeout.as_secs())]
    StageScriptTimeout { stage: String, timeout: Duration },

    /// Entity repository access failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// Job scheduling failed
    #[error("Job queue error: {0}")]
    JobQueue(String),

    /// Agent or master configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Node registration against the master failed
    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
