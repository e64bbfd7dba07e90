mod api;
mod app;
mod application;
mod config;
mod domain;
mod logging;
mod ui;
mod utils;

use iced::window;

fn main() -> iced::Result {
    logging::init_logging();
    tracing::info!("Starting Offline Mapbook");

    iced::application(app::MapbookApp::new, app::update, app::view)
        .title("Offline Mapbook")
        .window(window::Settings {
            size: iced::Size::new(640.0, 360.0),
            ..Default::default()
        })
        .run()
}
