use crate::application::{AcquireEvent, AcquireUpdate, AppContext};
use crate::domain::AcquirePhase;
use crate::ui::{StatusMessage, StatusView};
use crate::utils::{progress_fraction, progress_text};
use futures::StreamExt;
use iced::Task;
use std::path::PathBuf;

pub struct MapbookApp {
    view: StatusView,
    // None when the settings could not be loaded
    context: Option<AppContext>,
    // Folder changed while a run was busy; run again once it finishes
    rerun_pending: bool,
}

impl MapbookApp {
    /// Load settings and kick off the first acquisition.
    pub fn new() -> (Self, Task<Message>) {
        let mut app = match AppContext::load() {
            Ok(context) => Self::with_context(context),
            Err(e) => {
                tracing::error!("{}", e);
                let mut view = StatusView::default();
                view.status_message = e.to_string();
                Self {
                    view,
                    context: None,
                    rerun_pending: false,
                }
            }
        };

        let task = app.start_acquisition();
        (app, task)
    }

    pub fn with_context(context: AppContext) -> Self {
        let mut app = Self {
            view: StatusView::default(),
            context: Some(context),
            rerun_pending: false,
        };
        app.refresh_details();
        app
    }

    fn refresh_details(&mut self) {
        if let Some(context) = &self.context {
            self.view.package_path = context.settings.package_path().display().to_string();
            self.view.last_download = context
                .settings
                .last_download
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
        }
    }

    fn start_acquisition(&mut self) -> Task<Message> {
        let Some(context) = &self.context else {
            return Task::none();
        };
        if self.view.is_busy {
            return Task::none();
        }

        match context.acquirer() {
            Ok(acquirer) => {
                self.view.is_busy = true;
                self.view.no_map_available = false;
                Task::stream(
                    acquirer
                        .into_update_stream(context.settings.clone())
                        .map(Message::Acquisition),
                )
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.view.status_message = e.to_string();
                Task::none()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(StatusMessage),
    /// Event or final report from the running acquisition
    Acquisition(AcquireUpdate),
    /// Folder picked in the native dialog
    FolderSelected(Option<PathBuf>),
}

pub fn update(app: &mut MapbookApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(StatusMessage::RefreshPressed) => {
            return app.start_acquisition();
        }
        Message::UiMessage(StatusMessage::ChooseFolderPressed) => {
            let current = app
                .context
                .as_ref()
                .map(|c| c.settings.download_dir.clone());

            return Task::perform(
                async move {
                    let mut dialog = rfd::AsyncFileDialog::new().set_title("Choose download folder");
                    if let Some(dir) = current {
                        dialog = dialog.set_directory(dir);
                    }
                    dialog
                        .pick_folder()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                Message::FolderSelected,
            );
        }
        Message::UiMessage(StatusMessage::QuitPressed) => {
            return iced::exit();
        }
        Message::FolderSelected(Some(dir)) => {
            if let Some(context) = app.context.as_mut() {
                if context.settings.download_dir != dir {
                    tracing::info!(dir = %dir.display(), "Download folder changed");
                    context.settings.download_dir = dir;
                    if let Err(e) = context.save() {
                        tracing::error!("{}", e);
                        app.view.status_message = e.to_string();
                        return Task::none();
                    }
                    app.refresh_details();
                    if app.view.is_busy {
                        app.rerun_pending = true;
                        return Task::none();
                    }
                    return app.start_acquisition();
                }
            }
        }
        Message::FolderSelected(None) => {}
        Message::Acquisition(AcquireUpdate::Event(event)) => match event {
            AcquireEvent::Phase(phase) => {
                if phase != AcquirePhase::Downloading {
                    app.view.download_progress = None;
                }
                app.view.status_message = phase.status_text().to_string();
            }
            AcquireEvent::Progress { downloaded, total } => {
                app.view.download_progress = Some(progress_fraction(downloaded, total));
                app.view.status_message = progress_text(downloaded, total);
            }
        },
        Message::Acquisition(AcquireUpdate::Finished(report)) => {
            tracing::info!(outcome = ?report.outcome, "Acquisition finished");
            app.view.show_outcome(&report.outcome);
            // The report carries the settings as they were when the run started;
            // only the download record is newer than what the shell holds.
            if let Some(context) = app.context.as_mut() {
                context.settings.last_download = report.settings.last_download;
                if app.rerun_pending {
                    // The run may have written its stale folder back to disk
                    if let Err(e) = context.save() {
                        tracing::error!("{}", e);
                        app.view.status_message = e.to_string();
                    }
                }
            }
            app.refresh_details();
            if std::mem::take(&mut app.rerun_pending) {
                return app.start_acquisition();
            }
        }
    }
    Task::none()
}

pub fn view(app: &MapbookApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::acquisition::AcquisitionReport;
    use crate::config::Settings;
    use crate::domain::{AcquireError, AcquisitionOutcome};
    use chrono::{TimeZone, Utc};

    fn app() -> MapbookApp {
        let settings = Settings {
            download_dir: PathBuf::from("/maps"),
            item_id: "abc".to_string(),
            ..Settings::default()
        };
        MapbookApp::with_context(AppContext::new(settings, "settings.json"))
    }

    #[test]
    fn test_progress_event_updates_status() {
        let mut app = app();
        let _ = update(
            &mut app,
            Message::Acquisition(AcquireUpdate::Event(AcquireEvent::Progress {
                downloaded: 512,
                total: Some(1024),
            })),
        );

        assert_eq!(app.view.download_progress, Some(0.5));
        assert!(app.view.status_message.starts_with("Downloading map"));
    }

    #[test]
    fn test_report_updates_context() {
        let mut app = app();
        app.view.is_busy = true;

        let modified = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let mut settings = app.context.as_ref().unwrap().settings.clone();
        settings.last_download = Some(modified);

        let _ = update(
            &mut app,
            Message::Acquisition(AcquireUpdate::Finished(AcquisitionReport {
                outcome: AcquisitionOutcome::Refreshed { modified, bytes: 10 },
                settings,
            })),
        );

        assert!(!app.view.is_busy);
        assert_eq!(app.view.last_download, "2024-06-01 10:00 UTC");
        assert_eq!(
            app.context.as_ref().unwrap().settings.last_download,
            Some(modified)
        );
    }

    #[test]
    fn test_folder_change_during_run_survives_report() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        let old = Settings {
            download_dir: PathBuf::from("/old"),
            item_id: "abc".to_string(),
            ..Settings::default()
        };
        let mut app = MapbookApp::with_context(AppContext::new(old.clone(), settings_path.clone()));
        app.view.is_busy = true;

        let _ = update(&mut app, Message::FolderSelected(Some(PathBuf::from("/new"))));
        assert!(app.rerun_pending);
        assert_eq!(
            Settings::load_from(&settings_path).unwrap().download_dir,
            PathBuf::from("/new")
        );

        // The finishing run records its download against the snapshot it started with
        let modified = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let mut snapshot = old;
        snapshot.last_download = Some(modified);
        snapshot.save_to(&settings_path).unwrap();

        let _ = update(
            &mut app,
            Message::Acquisition(AcquireUpdate::Finished(AcquisitionReport {
                outcome: AcquisitionOutcome::Refreshed { modified, bytes: 10 },
                settings: snapshot,
            })),
        );

        let context = app.context.as_ref().unwrap();
        assert_eq!(context.settings.download_dir, PathBuf::from("/new"));
        assert_eq!(context.settings.last_download, Some(modified));
        let on_disk = Settings::load_from(&settings_path).unwrap();
        assert_eq!(on_disk.download_dir, PathBuf::from("/new"));
        assert_eq!(on_disk.last_download, Some(modified));
        assert!(!app.rerun_pending);
        assert!(app.view.is_busy);
    }

    #[test]
    fn test_terminal_report_marks_no_map() {
        let mut app = app();
        let settings = app.context.as_ref().unwrap().settings.clone();

        let _ = update(
            &mut app,
            Message::Acquisition(AcquireUpdate::Finished(AcquisitionReport {
                outcome: AcquisitionOutcome::NoLocalCopy {
                    error: AcquireError::NetworkUnreachable,
                },
                settings,
            })),
        );

        assert!(app.view.no_map_available);
    }

    #[test]
    fn test_refresh_ignored_while_busy() {
        let mut app = app();
        app.view.is_busy = true;
        app.view.status_message = "Downloading map ...".to_string();

        let _ = update(&mut app, Message::UiMessage(StatusMessage::RefreshPressed));
        assert_eq!(app.view.status_message, "Downloading map ...");
    }
}
