//! Wavefront Configuration Module
//!
//! Config is stored in `~/.config/wavefront/config.toml`:
//!
//! ```toml
//! [executor]
//! max_concurrent = 4
//!
//! [output]
//! format = "json"   # or "text"
//! ```
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flag (`--max-concurrent`)
//! 2. Environment variable (`WAVEFRONT_MAX_CONCURRENT`)
//! 3. Config file (default location or `--config PATH`)
//! 4. Defaults (unbounded, text output)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};

/// Environment variable overriding `executor.max_concurrent`
pub const ENV_MAX_CONCURRENT: &str = "WAVEFRONT_MAX_CONCURRENT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaveConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// `[executor]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutorConfig {
    /// Signed so that a bad value is reported instead of failing to parse
    pub max_concurrent: Option<i64>,
}

/// `[output]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl WaveConfig {
    /// Returns `~/.config/wavefront/` on Unix, `%APPDATA%/wavefront/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wavefront")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path (the file must exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| WaveError::ConfigFile {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| WaveError::ConfigFile {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Merge environment variables over file values
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var(ENV_MAX_CONCURRENT) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let value = raw.parse::<i64>().map_err(|_| WaveError::Configuration {
                    reason: format!("{ENV_MAX_CONCURRENT}='{raw}' is not an integer"),
                })?;
                self.executor.max_concurrent = Some(value);
            }
        }
        Ok(self)
    }

    /// Apply a CLI override (highest priority)
    pub fn with_max_concurrent(mut self, max_concurrent: Option<i64>) -> Self {
        if max_concurrent.is_some() {
            self.executor.max_concurrent = max_concurrent;
        }
        self
    }

    /// Full chain: file (explicit or default) → env → CLI flag
    pub fn resolve(config_path: Option<&Path>, cli_max_concurrent: Option<i64>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let config = config.with_env()?.with_max_concurrent(cli_max_concurrent);
        config.max_concurrent()?;
        Ok(config)
    }

    /// Effective concurrency bound; non-positive values are rejected
    pub fn max_concurrent(&self) -> Result<Option<usize>> {
        match self.executor.max_concurrent {
            None => Ok(None),
            Some(n) if n > 0 => usize::try_from(n).map(Some).map_err(|_| WaveError::Configuration {
                reason: format!("max_concurrent {n} is too large"),
            }),
            Some(n) => Err(WaveError::Configuration {
                reason: format!("max_concurrent must be a positive integer, got {n}"),
            }),
        }
    }
}
