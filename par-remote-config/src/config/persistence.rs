//! Config persistence and path resolution for `Config`.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - `load_from` / `save_to` for explicit paths
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - Traversal-safe path validation

use super::Config;
use crate::error::ConfigError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load configuration from the default path, creating it when missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            let config_dir = Self::config_dir();
            if let Err(e) = Self::validate_config_path(&config_path, &config_dir) {
                log::error!("Config path validation failed: {e}");
                return Err(e.into());
            }
            Self::load_from(&config_path)
        } else {
            log::info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            if let Err(e) = config.save() {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            log::info!("Default config created successfully");
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Loading existing config from {:?}", path);

        // The config names internal gateway hosts; warn when others can read it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o044 != 0 {
                    log::warn!(
                        "Config file {:?} is readable by group or others (mode {:04o}). Run: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path,
                    );
                }
            }
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config: Config = serde_yaml_ng::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::Parse)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::Io)?;
        fs::rename(&temp_path, path).map_err(ConfigError::Io)?;

        Ok(())
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("par-remote")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("par-remote")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Validate that `path` (which must already exist on disk) resolves via
    /// `canonicalize` to a location inside `expected_base`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PathTraversal` when the canonical path does not
    /// start with the canonical `expected_base`, or `ConfigError::Io` if the
    /// path cannot be canonicalized.
    pub fn validate_config_path(path: &Path, expected_base: &Path) -> Result<PathBuf, ConfigError> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("cannot canonicalize {}: {e}", path.display()),
            )
        })?;

        // If the base doesn't exist yet (first run), use the un-resolved path.
        let canonical_base =
            fs::canonicalize(expected_base).unwrap_or_else(|_| expected_base.to_path_buf());

        if !canonical.starts_with(&canonical_base) {
            return Err(ConfigError::PathTraversal(format!(
                "path '{}' resolves to '{}' which is outside the expected directory '{}'",
                path.display(),
                canonical.display(),
                canonical_base.display(),
            )));
        }

        Ok(canonical)
    }
}
