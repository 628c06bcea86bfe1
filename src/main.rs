mod api;
mod app;
mod application;
mod config;
mod domain;
mod downloader;
mod drag;
mod logging;
mod paths;
mod ui;
mod utils;

use iced::{window, Size};
use tracing::error;

fn main() -> iced::Result {
    logging::init();

    let config = match config::DiggerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "could not load configuration");
            std::process::exit(2);
        }
    };

    iced::application(
        move || app::DownloadApp::new(config.clone()),
        app::update,
        app::view,
    )
    .title("CrateDigger")
    .window(window::Settings {
        size: Size::new(1000.0, 700.0),
        ..Default::default()
    })
    .run()
}
