use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::AcquireError;

/// Portal item describing the downloadable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub id: String,
    pub title: String,
    pub modified: DateTime<Utc>,
    pub size: Option<u64>,
}

/// The local copy of the package and when it was last downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPackage {
    pub path: PathBuf,
    pub last_download: Option<DateTime<Utc>>,
}

impl LocalPackage {
    pub fn new(path: impl Into<PathBuf>, last_download: Option<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            last_download,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// A refresh is needed when there is no file, nothing was ever recorded,
    /// or the portal copy is strictly newer than the recorded download.
    pub fn needs_refresh(&self, remote: &ItemDescriptor) -> bool {
        if !self.exists() {
            return true;
        }

        match self.last_download {
            Some(recorded) => remote.modified > recorded,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePhase {
    CheckingNetwork,
    ConnectingToPortal,
    Downloading,
    Finalizing,
}

impl AcquirePhase {
    pub fn status_text(self) -> &'static str {
        match self {
            AcquirePhase::CheckingNetwork => "Checking network connection ...",
            AcquirePhase::ConnectingToPortal => "Connecting to Portal ...",
            AcquirePhase::Downloading => "Downloading map ...",
            AcquirePhase::Finalizing => "Finalizing download ...",
        }
    }
}

/// Result of one acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// A fresh copy was downloaded and moved into place.
    Refreshed {
        modified: DateTime<Utc>,
        bytes: u64,
    },
    /// The local copy is current, or the network is down and the local copy is used.
    UsedExisting { offline: bool },
    /// A refresh was attempted and failed; the previous local copy is kept.
    UsedExistingAfterFailedRefresh { error: AcquireError },
    /// Nothing could be acquired and there is nothing to fall back on.
    NoLocalCopy { error: AcquireError },
}

impl AcquisitionOutcome {
    /// True when the host has no package to open.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionOutcome::NoLocalCopy { .. })
    }

    pub fn status_text(&self) -> String {
        match self {
            AcquisitionOutcome::Refreshed { modified, .. } => {
                format!("Map downloaded (portal version {})", modified.format("%Y-%m-%d %H:%M UTC"))
            }
            AcquisitionOutcome::UsedExisting { offline: false } => "Map is up to date".to_string(),
            AcquisitionOutcome::UsedExisting { offline: true } => format!(
                "{}. Using previously downloaded map.",
                AcquireError::NetworkUnreachable
            ),
            AcquisitionOutcome::UsedExistingAfterFailedRefresh { error } => {
                format!("{}. Using previously downloaded map.", error)
            }
            AcquisitionOutcome::NoLocalCopy { error } => {
                format!("{}. No previously downloaded map is available.", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn descriptor(modified: DateTime<Utc>) -> ItemDescriptor {
        ItemDescriptor {
            id: "abc".to_string(),
            title: "Mapbook".to_string(),
            modified,
            size: None,
        }
    }

    #[test]
    fn test_missing_file_needs_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let recorded = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let local = LocalPackage::new(dir.path().join("missing.mmpk"), Some(recorded));

        let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(local.needs_refresh(&descriptor(old)));
    }

    #[test]
    fn test_newer_remote_needs_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.mmpk");
        std::fs::write(&path, b"pkg").unwrap();

        let recorded = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let local = LocalPackage::new(&path, Some(recorded));

        assert!(local.needs_refresh(&descriptor(recorded + chrono::Duration::seconds(1))));
        assert!(!local.needs_refresh(&descriptor(recorded)));
        assert!(!local.needs_refresh(&descriptor(recorded - chrono::Duration::days(3))));
    }

    #[test]
    fn test_unrecorded_download_needs_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.mmpk");
        std::fs::write(&path, b"pkg").unwrap();

        let local = LocalPackage::new(&path, None);
        let remote = descriptor(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
        assert!(local.needs_refresh(&remote));
    }

    #[test]
    fn test_only_no_local_copy_is_terminal() {
        let error = AcquireError::NetworkUnreachable;
        assert!(AcquisitionOutcome::NoLocalCopy {
            error: error.clone()
        }
        .is_terminal());
        assert!(!AcquisitionOutcome::UsedExistingAfterFailedRefresh { error }.is_terminal());
        assert!(!AcquisitionOutcome::UsedExisting { offline: true }.is_terminal());
    }
}
