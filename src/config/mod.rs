//! Project configuration loaded from `tinct.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[store]`   | Where documents live (`dir`, local state blob) |
//! | `[palette]` | Palette file location                          |
//! | `[sync]`    | Polling toggle and interval                    |
//! | `[layout]`  | Aspect-ratio target and tolerance              |
//!
//! The file is found by walking upward from the current directory, the
//! same way version-control roots are found. A missing file is not an
//! error: everything has a default and the project root falls back to
//! the current directory. Unknown fields produce a warning so typos do
//! not silently disable a setting.

use crate::log;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Default config file name, overridable with `--config`.
pub const CONFIG_FILE: &str = "tinct.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Sections
// ============================================================================

/// `[store]` - where documents are persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of `.svg` files.
    pub dir: PathBuf,
    /// State blob for the local-only fallback store.
    pub state: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("svgs"),
            state: PathBuf::from(".tinct/local.json"),
        }
    }
}

/// `[palette]` - palette file location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub path: PathBuf,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("palette.json"),
        }
    }
}

/// `[sync]` - change polling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether watch mode polls the store for remote changes.
    pub poll: bool,
    /// Seconds between poll passes.
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll: false,
            interval_secs: 2,
        }
    }
}

/// `[layout]` - aspect-ratio normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub target_ratio: f64,
    pub ratio_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            target_ratio: 1.0,
            ratio_tolerance: 0.05,
        }
    }
}

// ============================================================================
// Root configuration
// ============================================================================

/// Root configuration structure representing tinct.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TinctConfig {
    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub store: StoreConfig,
    pub palette: PaletteConfig,
    pub sync: SyncConfig,
    pub layout: LayoutConfig,
}

impl TinctConfig {
    /// Load the config named by the CLI, searching upward from cwd.
    ///
    /// When no file is found, defaults apply and the project root is
    /// the current directory.
    pub fn load(config_name: &Path) -> Result<Self> {
        let mut config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                config
            }
            None => {
                let mut config = Self::default();
                config.root =
                    std::env::current_dir().context("failed to get current working directory")?;
                config
            }
        };
        config.normalize_paths();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Make all configured paths absolute relative to the project root.
    fn normalize_paths(&mut self) {
        for path in [
            &mut self.store.dir,
            &mut self.store.state,
            &mut self.palette.path,
        ] {
            if path.is_relative() {
                let absolute = self.root.join(path.as_path());
                *path = absolute;
            }
        }
    }
}

/// Print warning about unknown fields.
fn print_unknown_fields_warning(fields: &[String], path: &Path) {
    let display_path = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    log!("warning"; "unknown fields in {}, ignoring:", display_path);
    for field in fields {
        eprintln!("- {field}");
    }
}

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    if config_name.is_absolute() && config_name.exists() {
        return Some(config_name.to_path_buf());
    }

    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
