//! Configuration manager for loading and saving sketch configuration

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::AppConfig;

/// Configuration error types
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Configuration manager handles loading, saving, and accessing configuration
pub struct ConfigManager {
    config: AppConfig,
    config_path: PathBuf,
    dirty: bool,
}

impl ConfigManager {
    /// Create a new configuration manager, loading from the OS config directory
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Create a configuration manager backed by a specific file.
    ///
    /// A missing file yields defaults marked dirty, so the next save writes them.
    pub fn with_path(config_path: PathBuf) -> Self {
        let (config, dirty) = match Self::load_from_path(&config_path) {
            Ok(Some(config)) => (config, false),
            Ok(None) => {
                tracing::info!("No config file found, using defaults");
                (AppConfig::new(), true)
            }
            Err(e) => {
                tracing::warn!("Failed to load config file: {}", e);
                (AppConfig::new(), false)
            }
        };

        Self {
            config,
            config_path,
            dirty,
        }
    }

    /// Get the OS-standard configuration directory
    fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sketch-engine")
    }

    /// Get the default configuration file path
    fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.ron")
    }

    /// Load configuration from a file path; Ok(None) if the file does not exist
    fn load_from_path(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config =
            ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(Some(config))
    }

    /// Get a reference to the current configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration (marks as dirty)
    pub fn config_mut(&mut self) -> &mut AppConfig {
        self.dirty = true;
        &mut self.config
    }

    /// Check if the configuration has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save the configuration to disk
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = ron::ser::to_string_pretty(&self.config, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(&self.config_path, &content).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::info!("Saved config to {:?}", self.config_path);
        self.dirty = false;
        Ok(())
    }

}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
