use iced::{
    widget::{button, column, progress_bar, row, text, Space},
    Element, Length,
};

use crate::domain::AcquisitionOutcome;

/// Main view state
pub struct StatusView {
    pub status_message: String,
    pub package_path: String,
    pub last_download: String,
    pub download_progress: Option<f32>,
    pub is_busy: bool,
    pub no_map_available: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            status_message: "Starting ...".to_string(),
            package_path: String::new(),
            last_download: "never".to_string(),
            download_progress: None,
            is_busy: false,
            no_map_available: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusMessage {
    ChooseFolderPressed,
    RefreshPressed,
    QuitPressed,
}

impl StatusView {
    pub fn show_outcome(&mut self, outcome: &AcquisitionOutcome) {
        self.is_busy = false;
        self.download_progress = None;
        self.no_map_available = outcome.is_terminal();
        self.status_message = outcome.status_text();
    }

    pub fn view(&self) -> Element<'_, StatusMessage> {
        let idle = |message: StatusMessage| (!self.is_busy).then_some(message);

        let mut content = column![
            text("Offline Mapbook").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text(format!("Map package: {}", self.package_path)).size(14),
            text(format!("Last downloaded: {}", self.last_download)).size(14),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(16),
        ]
        .padding(20)
        .spacing(10);

        if let Some(progress) = self.download_progress {
            content = content.push(progress_bar(0.0..=1.0, progress));
        }

        let mut actions = row![
            button("Choose folder...")
                .on_press_maybe(idle(StatusMessage::ChooseFolderPressed))
                .padding([10, 20]),
            button("Check for updates")
                .on_press_maybe(idle(StatusMessage::RefreshPressed))
                .padding([10, 20]),
        ]
        .spacing(10);

        if self.no_map_available {
            actions = actions.push(
                button("Quit")
                    .on_press(StatusMessage::QuitPressed)
                    .padding([10, 20]),
            );
        }

        content
            .push(Space::new().height(Length::Fixed(20.0)))
            .push(actions)
            .into()
    }
}
