use std::path::PathBuf;

use crate::{
    api::{PortalClient, TcpProbe},
    config::{self, Settings},
    domain::AppError,
};

use super::acquisition::PackageAcquirer;

/// State shared by the shell and the acquisition flow, passed explicitly.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub settings_path: PathBuf,
}

impl AppContext {
    pub fn new(settings: Settings, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            settings_path: settings_path.into(),
        }
    }

    /// Load the user's settings from the default location
    pub fn load() -> Result<Self, AppError> {
        let settings_path = config::settings_file_path();
        let settings =
            Settings::load_from(&settings_path).map_err(|e| AppError::Config(e.to_string()))?;
        tracing::info!(path = %settings_path.display(), "Loaded settings");
        Ok(Self::new(settings, settings_path))
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.settings
            .save_to(&self.settings_path)
            .map_err(|e| AppError::Io(e.to_string()))
    }

    /// Build an acquirer talking to the configured portal.
    pub fn acquirer(&self) -> Result<PackageAcquirer<PortalClient, TcpProbe>, AppError> {
        self.settings
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let portal_config = self.settings.portal_config();
        let probe = TcpProbe::for_url(&portal_config.portal_url, portal_config.probe_timeout)
            .ok_or_else(|| AppError::Config(format!("'{}' has no host", portal_config.portal_url)))?;
        let client = PortalClient::new(portal_config).map_err(|e| AppError::Config(e.to_string()))?;

        Ok(PackageAcquirer::new(client, probe, self.settings_path.clone()))
    }
}
