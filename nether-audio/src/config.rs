//! Audio configuration (`audio.toml`)
//!
//! Loaded from the platform config directory, falling back to defaults when
//! the file is missing or unreadable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::Listener;
use crate::error::ConfigError;

const CONFIG_FILE: &str = "audio.toml";

/// Settings applied by [`AudioSystem::new`](crate::AudioSystem::new)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Hardware voices to request (default: 16). The pool may end up smaller.
    #[serde(default = "default_simultaneous_streams")]
    pub simultaneous_streams: usize,
    /// Initial listener placement
    #[serde(default)]
    pub listener: Listener,
}

fn default_simultaneous_streams() -> usize {
    16
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            simultaneous_streams: default_simultaneous_streams(),
            listener: Listener::default(),
        }
    }
}

/// Returns the platform-specific config directory.
///
/// On Linux: `~/.config/Nethercore`. Returns `None` if the home directory
/// cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.nethercore", "", "Nethercore")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

impl AudioConfig {
    /// Load `audio.toml` from [`config_dir`], or defaults if it is missing or
    /// invalid
    pub fn load() -> Self {
        let Some(path) = config_dir().map(|dir| dir.join(CONFIG_FILE)) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Using default audio config: {}", e);
            Self::default()
        })
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML; absent keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    // =============================================================
    // Defaults
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = AudioConfig::default();
        assert_eq!(config.simultaneous_streams, 16);
        assert_eq!(config.listener.position, Vec3::ZERO);
        assert_eq!(config.listener.at, Vec3::NEG_Z);
        assert_eq!(config.listener.up, Vec3::Y);
    }

    #[test]
    fn test_config_deserialize_empty() {
        // Empty TOML should produce defaults
        let config = AudioConfig::from_toml_str("").unwrap();
        assert_eq!(config, AudioConfig::default());
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_partial_listener() {
        let toml_str = r#"
simultaneous_streams = 4

[listener]
position = [1.0, 2.0, 3.0]
"#;
        let config = AudioConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.simultaneous_streams, 4);
        assert_eq!(config.listener.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.listener.velocity, Vec3::ZERO); // default
        assert_eq!(config.listener.at, Vec3::NEG_Z); // default
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = AudioConfig::from_toml_str("simultaneous_streams = \"lots\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // =============================================================
    // File persistence
    // =============================================================

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = AudioConfig::default();
        config.simultaneous_streams = 32;
        config.listener.position = Vec3::new(0.0, 1.5, 0.0);

        config.save_to(&path).unwrap();
        let loaded = AudioConfig::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AudioConfig::load_from(&dir.path().join(CONFIG_FILE));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
