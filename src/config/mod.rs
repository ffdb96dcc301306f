use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::constants::{DEFAULT_TILE_SIZE, MAX_HISTORY_SIZE};

/// Application configuration persisted to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfigData {
    /// Tile edge length for newly created documents
    pub default_tile_size: u32,

    /// Undo steps kept per document
    pub max_history_size: usize,

    /// Where documents are stored; the platform data directory when unset
    pub documents_dir: Option<PathBuf>,

    /// Key of the last document written (remembered, not auto-loaded)
    pub last_document_key: Option<String>,
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            default_tile_size: DEFAULT_TILE_SIZE,
            max_history_size: MAX_HISTORY_SIZE,
            documents_dir: None,
            last_document_key: None,
        }
    }
}

impl AppConfigData {
    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(crate::paths::documents_dir)
    }
}

/// Loaded configuration plus where it lives
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The persisted configuration data
    pub data: AppConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Whether config needs to be saved (dirty flag)
    pub dirty: bool,
}

impl AppConfig {
    pub fn set_last_document(&mut self, key: &str) {
        if self.data.last_document_key.as_deref() != Some(key) {
            self.data.last_document_key = Some(key.to_string());
            self.dirty = true;
        }
    }

    /// Write the config if anything changed since it was loaded
    pub fn save_if_dirty(&mut self) {
        if self.dirty {
            save_config(self);
            self.dirty = false;
        }
    }
}

/// Result of loading config from disk
#[derive(Debug)]
pub struct LoadConfigResult {
    pub config: AppConfig,
    /// Error message if config was reset to defaults due to an error
    pub reset_reason: Option<String>,
}

/// Load configuration from the platform config file
pub fn load_config() -> LoadConfigResult {
    load_config_from(&crate::paths::config_file())
}

/// Load configuration from `config_path`, falling back to defaults
pub fn load_config_from(config_path: &Path) -> LoadConfigResult {
    let (data, reset_reason) = if config_path.exists() {
        match std::fs::read_to_string(config_path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(data) => {
                    info!("Loaded config from {:?}", config_path);
                    (data, None)
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}", e);
                    (
                        AppConfigData::default(),
                        Some(format!("Configuration file was corrupted: {}", e)),
                    )
                }
            },
            Err(e) => {
                warn!("Failed to read config file: {}", e);
                (
                    AppConfigData::default(),
                    Some(format!("Could not read configuration file: {}", e)),
                )
            }
        }
    } else {
        info!("No config file found, using defaults");
        (AppConfigData::default(), None)
    };

    LoadConfigResult {
        config: AppConfig {
            data,
            config_path: config_path.to_path_buf(),
            dirty: false,
        },
        reset_reason,
    }
}

/// Save configuration to disk
pub fn save_config(config: &AppConfig) {
    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Some(parent) = config.config_path.parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                error!("Failed to create config directory: {}", e);
                return;
            }
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}
