//! # zterm-core
//!
//! Core types, errors and utilities for the zterm dashboard.
//!
//! This crate provides:
//! - [`ZtermError`] - the error enum shared across the zterm crates
//! - [`config`] - the YAML configuration document (server, theme, views)
//! - [`logging`] - tracing setup with file output under `~/.zterm/logs/`
//! - [`dsn`] - mainframe dataset name helpers for remote file arguments

pub mod config;
pub mod dsn;
pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use config::{Config, Server, ThemeConfig, ViewConfig};
pub use error::{Result, ZtermError};
pub use logging::{init_logging, LogGuard};
