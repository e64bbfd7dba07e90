//! User settings persisted as JSON under the platform config directory.
//!
//! Holds where the package lives, which portal item it comes from and when it
//! was last downloaded. Missing files and missing fields fall back to defaults.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::api::{AuthMode, PortalConfig};
use crate::domain::LocalPackage;

pub const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com";
pub const DEFAULT_PACKAGE_FILE_NAME: &str = "OfflineMapbook.mmpk";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

const APP_DIR_NAME: &str = "offline-mapbook";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to write settings file: {0}")]
    WriteError(String),

    #[error("Failed to create settings directory: {0}")]
    DirectoryError(#[source] std::io::Error),

    #[error("Invalid setting {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub download_dir: PathBuf,
    pub package_file_name: String,
    pub portal_url: Url,
    pub item_id: String,
    pub auth: AuthMode,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub last_download: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            package_file_name: DEFAULT_PACKAGE_FILE_NAME.to_string(),
            portal_url: default_portal_url(),
            item_id: String::new(),
            auth: AuthMode::None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            last_download: None,
        }
    }
}

impl Settings {
    /// Load settings from a specific path, returning defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write settings to `path`, replacing the previous file in one rename.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(SettingsError::DirectoryError)?;

        let content = serde_json::to_string_pretty(self)?;
        let mut staged = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| SettingsError::WriteError(e.to_string()))?;
        staged
            .write_all(content.as_bytes())
            .map_err(|e| SettingsError::WriteError(e.to_string()))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| SettingsError::WriteError(e.to_string()))?;
        staged
            .persist(path)
            .map_err(|e| SettingsError::WriteError(e.error.to_string()))?;
        Ok(())
    }

    /// Canonical location of the package file.
    pub fn package_path(&self) -> PathBuf {
        self.download_dir.join(&self.package_file_name)
    }

    pub fn local_package(&self) -> LocalPackage {
        LocalPackage::new(self.package_path(), self.last_download)
    }

    /// Check the values the acquisition flow can't run without.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.item_id.trim().is_empty() {
            return Err(SettingsError::InvalidValue {
                key: "item_id",
                reason: "no portal item configured".to_string(),
            });
        }

        let file_name = Path::new(&self.package_file_name);
        if self.package_file_name.is_empty() || file_name.file_name() != Some(file_name.as_os_str()) {
            return Err(SettingsError::InvalidValue {
                key: "package_file_name",
                reason: format!("'{}' is not a plain file name", self.package_file_name),
            });
        }

        if self.portal_url.host_str().is_none() {
            return Err(SettingsError::InvalidValue {
                key: "portal_url",
                reason: format!("'{}' has no host", self.portal_url),
            });
        }

        Ok(())
    }

    pub fn portal_config(&self) -> PortalConfig {
        PortalConfig {
            auth: self.auth.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            ..PortalConfig::new(self.portal_url.clone(), self.item_id.clone())
        }
    }
}

fn default_portal_url() -> Url {
    Url::parse(DEFAULT_PORTAL_URL).expect("default portal URL is valid")
}

/// The user's download folder, falling back to home, then the working directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the path to the settings directory (e.g. ~/.config/offline-mapbook).
pub fn settings_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn settings_file_path() -> PathBuf {
    settings_directory().join(SETTINGS_FILE_NAME)
}
