//! Display configuration
//!
//! A small TOML file shared between the host and display processes. Load
//! failures never abort loading: defaults are used and the problem is
//! logged. Loading writes the normalized file back so the user always
//! has something to edit.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.toml";

const CONFIG_HEADER: &str = "\
# To use a custom background image, set `background` to an image path.
# The recommended size is 960x540.
";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the memory usage bar and run the sampler.
    pub enable_memory_display: bool,
    /// Optional custom background image for the display window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enable_memory_display: true,
            background: None,
        }
    }
}

/// Default configuration directory for the current user.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadscreen")
}

impl DisplayConfig {
    /// Load the configuration from `dir`, falling back to defaults on
    /// any failure, and write the normalized file back.
    pub fn load_or_init(dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("failed to create config dir {}: {e}", dir.display());
        }

        let path = dir.join(CONFIG_FILE);
        let config = match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("failed to parse {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("failed to read {}: {e}", path.display());
                Self::default()
            }
        };

        if let Err(e) = config.store(&path) {
            warn!("failed to write {}: {e}", path.display());
        }
        config
    }

    fn store(&self, path: &Path) -> Result<()> {
        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, format!("{CONFIG_HEADER}{body}"))
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
