use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::{channel::mpsc, stream::BoxStream, FutureExt, StreamExt};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::{
    api::{Connectivity, ItemContent, PortalSource},
    config::Settings,
    domain::{AcquireError, AcquirePhase, AcquisitionOutcome, ItemDescriptor, LocalPackage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireEvent {
    Phase(AcquirePhase),
    Progress { downloaded: u64, total: Option<u64> },
}

/// Callback invoked for every status change during an acquisition.
pub type EventCallback = Box<dyn Fn(AcquireEvent) + Send + Sync>;

/// What an acquisition run leaves behind: its outcome and the settings it updated.
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub outcome: AcquisitionOutcome,
    pub settings: Settings,
}

#[derive(Debug, Clone)]
pub enum AcquireUpdate {
    Event(AcquireEvent),
    Finished(AcquisitionReport),
}

/// Keeps the local package current with its portal item.
///
/// One call to [`PackageAcquirer::ensure_current_package`] is one sequential
/// attempt: no retries, no parallel requests.
pub struct PackageAcquirer<P, C> {
    portal: P,
    connectivity: C,
    settings_path: PathBuf,
    on_event: Option<EventCallback>,
}

impl<P: PortalSource, C: Connectivity> PackageAcquirer<P, C> {
    pub fn new(portal: P, connectivity: C, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            portal,
            connectivity,
            settings_path: settings_path.into(),
            on_event: None,
        }
    }

    pub fn with_events(mut self, on_event: EventCallback) -> Self {
        self.on_event = Some(on_event);
        self
    }

    fn emit(&self, event: AcquireEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    /// Make sure a usable package exists at `settings.package_path()`,
    /// downloading a fresh copy when the portal has a newer one.
    ///
    /// `settings.last_download` is updated (and saved) only together with a
    /// successful replacement of the package file.
    pub async fn ensure_current_package(&self, settings: &mut Settings) -> AcquisitionOutcome {
        let local = settings.local_package();

        self.emit(AcquireEvent::Phase(AcquirePhase::CheckingNetwork));
        if !self.connectivity.is_reachable().await {
            tracing::warn!("Portal is unreachable, skipping update check");
            return fall_back(&local, AcquireError::NetworkUnreachable);
        }

        self.emit(AcquireEvent::Phase(AcquirePhase::ConnectingToPortal));
        let item = match self.portal.fetch_item().await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Failed to fetch portal item: {}", e);
                return fall_back(&local, AcquireError::RemoteService(e.to_string()));
            }
        };

        if !local.needs_refresh(&item) {
            tracing::info!(
                path = %local.path().display(),
                modified = %item.modified,
                "Local package is up to date"
            );
            return AcquisitionOutcome::UsedExisting { offline: false };
        }

        tracing::info!(
            item = %item.id,
            title = %item.title,
            modified = %item.modified,
            "Downloading package"
        );
        match self.refresh(settings, &item).await {
            Ok(bytes) => {
                tracing::info!(bytes, path = %local.path().display(), "Package refreshed");
                AcquisitionOutcome::Refreshed {
                    modified: item.modified,
                    bytes,
                }
            }
            Err(e) => {
                tracing::warn!("Package refresh failed: {}", e);
                fall_back(&local, e)
            }
        }
    }

    async fn refresh(
        &self,
        settings: &mut Settings,
        item: &ItemDescriptor,
    ) -> Result<u64, AcquireError> {
        let target = settings.package_path();
        tokio::fs::create_dir_all(&settings.download_dir)
            .await
            .map_err(|e| AcquireError::Transfer(format!("Failed to create download folder: {}", e)))?;

        self.emit(AcquireEvent::Phase(AcquirePhase::Downloading));
        let content = self
            .portal
            .fetch_content()
            .await
            .map_err(|e| AcquireError::RemoteService(e.to_string()))?;

        // Staged next to the target so the final rename never crosses filesystems.
        // Dropping `staged` on any error below removes it.
        let staged = tempfile::Builder::new()
            .prefix(".mmpk-")
            .suffix(".part")
            .tempfile_in(&settings.download_dir)
            .map_err(|e| AcquireError::Transfer(format!("Failed to create temporary file: {}", e)))?;

        let bytes = self.stream_to_file(content, item.size, &staged).await?;

        self.emit(AcquireEvent::Phase(AcquirePhase::Finalizing));
        // Both steps are blocking filesystem calls.
        let mut record = settings.clone();
        let settings_path = self.settings_path.clone();
        let modified = item.modified;
        let (record, committed) = tokio::task::spawn_blocking(move || {
            let committed = commit(&mut record, staged, &target, modified, &settings_path);
            (record, committed)
        })
        .await
        .map_err(|e| AcquireError::Transfer(format!("Commit task failed: {}", e)))?;

        *settings = record;
        committed?;
        Ok(bytes)
    }

    /// Copy the content into `staged`; `size_hint` only feeds progress events.
    async fn stream_to_file(
        &self,
        content: ItemContent,
        size_hint: Option<u64>,
        staged: &NamedTempFile,
    ) -> Result<u64, AcquireError> {
        let io_error = |e: std::io::Error| AcquireError::Transfer(format!("Write error: {}", e));

        let handle = staged.as_file().try_clone().map_err(io_error)?;
        let mut file = tokio::fs::File::from_std(handle);
        let ItemContent { length, mut stream } = content;
        let total = length.or(size_hint);

        let mut downloaded = 0u64;
        self.emit(AcquireEvent::Progress { downloaded, total });

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AcquireError::Transfer(e.to_string()))?;
            file.write_all(&chunk).await.map_err(io_error)?;
            downloaded += chunk.len() as u64;
            self.emit(AcquireEvent::Progress { downloaded, total });
        }

        if let Some(expected) = length {
            if downloaded != expected {
                return Err(AcquireError::Transfer(format!(
                    "Expected {} bytes, received {}",
                    expected, downloaded
                )));
            }
        }

        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        Ok(downloaded)
    }
}

impl<P, C> PackageAcquirer<P, C>
where
    P: PortalSource + 'static,
    C: Connectivity + 'static,
{
    /// Run one acquisition, yielding its events and ending with the report.
    pub fn into_update_stream(self, mut settings: Settings) -> BoxStream<'static, AcquireUpdate> {
        let (tx, rx) = mpsc::unbounded();
        let events = tx.clone();
        let acquirer = self.with_events(Box::new(move |event| {
            let _ = events.unbounded_send(AcquireUpdate::Event(event));
        }));

        // The channel closes once the run (and the acquirer holding a sender) is done
        let run = async move {
            let outcome = acquirer.ensure_current_package(&mut settings).await;
            let _ = tx.unbounded_send(AcquireUpdate::Finished(AcquisitionReport { outcome, settings }));
        };

        futures::stream::select(
            rx,
            run.into_stream()
                .filter_map(|_| futures::future::ready(None::<AcquireUpdate>)),
        )
        .boxed()
    }
}

/// Record the download, then move the staged file over the package.
/// Restores the previous record if the move fails.
fn commit(
    settings: &mut Settings,
    staged: NamedTempFile,
    target: &Path,
    modified: DateTime<Utc>,
    settings_path: &Path,
) -> Result<(), AcquireError> {
    let previous = settings.last_download;

    settings.last_download = Some(modified);
    if let Err(e) = settings.save_to(settings_path) {
        settings.last_download = previous;
        return Err(AcquireError::Settings(e.to_string()));
    }

    if let Err(e) = staged.persist(target) {
        settings.last_download = previous;
        if let Err(restore) = settings.save_to(settings_path) {
            tracing::error!("Failed to restore previous download record: {}", restore);
        }
        return Err(AcquireError::Transfer(format!(
            "Failed to move package into place: {}",
            e.error
        )));
    }

    Ok(())
}

fn fall_back(local: &LocalPackage, error: AcquireError) -> AcquisitionOutcome {
    if !local.exists() {
        tracing::error!(path = %local.path().display(), "No local package to fall back on");
        return AcquisitionOutcome::NoLocalCopy { error };
    }

    match error {
        AcquireError::NetworkUnreachable => AcquisitionOutcome::UsedExisting { offline: true },
        error => AcquisitionOutcome::UsedExistingAfterFailedRefresh { error },
    }
}
