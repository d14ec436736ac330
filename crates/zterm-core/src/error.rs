//! Error types for zterm operations.
//!
//! This module defines [`ZtermError`], the error enum shared across the zterm
//! crates. Per-command and per-producer errors are contained and rendered in
//! the UI; only unrecoverable init errors abort the process.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ZtermError`].
pub type Result<T> = std::result::Result<T, ZtermError>;

/// Error type for all zterm operations.
#[derive(Debug, Error)]
pub enum ZtermError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file could not be read
    #[error("cannot read config file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is invalid YAML
    #[error("invalid config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration file could not be written
    #[error("cannot write config file {path}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Terminal setup or teardown failed
    #[error("terminal error: {message}")]
    Terminal { message: String },

    // =========================================================================
    // Producer Errors
    // =========================================================================
    /// Child process could not be spawned
    #[error("cannot spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    /// Child process exited with a nonzero status
    #[error("exit status {status}")]
    CommandFailed { status: i32 },

    // =========================================================================
    // Remote (SSH) Errors
    // =========================================================================
    /// Connecting the multiplexed client failed
    #[error("cannot connect to {host}: {message}")]
    SshConnect { host: String, message: String },

    /// Opening a session on the shared client failed
    #[error("cannot open new session: {message}")]
    SshSession { message: String },

    /// Remote command exited with a nonzero status
    #[error("ssh: {code}")]
    SshExit { code: i32 },

    /// A remote command was requested but no client is configured
    #[error("SSH connection not created, adjust your configuration")]
    SshUnavailable,

    // =========================================================================
    // Console Command Errors
    // =========================================================================
    /// Referenced view does not exist
    #[error("view '{name}' doesn't exist")]
    UnknownView { name: String },

    /// A view with this name already exists
    #[error("view '{name}' already exists")]
    DuplicateView { name: String },

    /// Command arguments were missing or malformed
    #[error("{message}")]
    Usage { message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in zterm)
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ZtermError {
    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a spawn error for a command string.
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            message: source.to_string(),
        }
    }

    /// Create a usage error for a console command.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error should abort startup rather than be
    /// rendered inside the UI.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Terminal { .. } | Self::ConfigRead { .. } | Self::ConfigParse { .. } | Self::Internal { .. }
        )
    }
}
