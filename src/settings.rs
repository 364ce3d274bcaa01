//! Player settings persistence
//!
//! Handles saving and loading the player configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::LiveVideoMode;
use crate::selection::ZoneTrackFilter;

/// Player settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where zone documents come from
    pub catalog: CatalogSettings,
    /// Site context used for track selection
    pub filter: ZoneTrackFilter,
    /// Content cache settings
    pub storage: StorageSettings,
    /// Display settings
    pub display: DisplaySettings,
}

/// Catalog source selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogSourceSettings {
    /// `{base_url}/data/zone-{id}.json` over HTTP
    Http { base_url: String },
    /// `{path}/zone-{id}.json` on local storage
    Directory { path: PathBuf },
}

impl Default for CatalogSourceSettings {
    fn default() -> Self {
        CatalogSourceSettings::Directory {
            path: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub source: CatalogSourceSettings,
    /// Zone to load at startup
    pub zone_id: Option<i64>,
    /// Select and request the priority track as soon as the zone loads
    pub auto_select: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: CatalogSourceSettings::default(),
            zone_id: None,
            auto_select: true,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Maximum content cache size in MB
    pub max_cache_mb: u64,
    /// Custom cache directory (None = use default)
    pub cache_dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_cache_mb: 2048, // 2GB default
            cache_dir: None,
        }
    }
}

impl StorageSettings {
    /// Directory downloaded content is stored in
    pub fn content_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(crate::utils::content_cache_dir)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub live_video_mode: LiveVideoMode,
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "zoneplay", "ZonePlay")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::file_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to_file(&path)
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not determine config directory")]
    NoConfigDir,
}
