//! Configuration document for zterm.
//!
//! A YAML document with three sections: `server` (remote endpoint), `theme`
//! (color slots) and `views` (panel name to layout/job/highlight mapping).
//! The document is written back by the console `savecfg` command, so the
//! serde representation round-trips every field the dashboard can change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZtermError};

/// Fallback config file name written when no file was loaded.
pub const DEFAULT_CONFIG_FILE: &str = ".zterm.yml";

/// Remote server endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub user: String,
    /// Refresh interval in seconds used for panels at startup.
    pub refresh: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            refresh: 5,
        }
    }
}

/// Theme color slots. Values are color names (`red`, `magenta`, ...) or hex
/// (`#rrggbb`); empty means "keep the default".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    /// One of `basic`, `ansi256`, `truecolor`.
    #[serde(rename = "color-space")]
    pub color_space: String,
    pub fgcolor: String,
    pub bgcolor: String,
    pub frame: String,
    #[serde(rename = "frame-select")]
    pub frame_select: String,
    pub console: String,
    pub error: String,
    pub highlight: String,
}

/// Per-view configuration: stack position, height weight, optional refresh
/// job and highlight word lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    pub position: i32,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hiline: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hiword: Vec<String>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub theme: ThemeConfig,
    pub views: BTreeMap<String, ViewConfig>,

    /// Path the document was loaded from; `None` when running on defaults.
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist and parse. Without one, `./.zterm.yml`
    /// then `~/.zterm.yml` are tried; if neither exists the defaults are
    /// returned (a missing config file is not an error).
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                return Self::load_file(&candidate);
            }
        }

        Ok(Config::default())
    }

    fn load_file(path: &Path) -> Result<Config> {
        let data = std::fs::read_to_string(path).map_err(|e| ZtermError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = serde_yaml::from_str(&data).map_err(|e| ZtermError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), views = config.views.len(), "config loaded");
        Ok(config)
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(DEFAULT_CONFIG_FILE));
        }
        paths
    }

    /// Write the document back.
    ///
    /// Writes to the path it was loaded from; when running on defaults (no
    /// file was found at startup) falls back to [`DEFAULT_CONFIG_FILE`] in
    /// the working directory. Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let target = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let data = serde_yaml::to_string(self).map_err(|e| ZtermError::internal(format!(
            "config serialization failed: {e}"
        )))?;
        std::fs::write(&target, data).map_err(|e| ZtermError::ConfigWrite {
            path: target.clone(),
            source: e,
        })?;
        tracing::info!(path = %target.display(), "config saved");
        Ok(target)
    }

    /// Path the document was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pin the document to a path for subsequent saves.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }
}
