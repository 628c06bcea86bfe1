use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use iced::Task;
use tracing::{error, info, warn};

use crate::api::{PageClient, SurfaceOptions};
use crate::application::{DownloadCoordinator, Effect, Session, TitleRules};
use crate::config::DiggerConfig;
use crate::domain::{AppError, DownloadEvent, DragPayload};
use crate::downloader::{ChildProcessRunner, DownloadWorker, Downloader};
use crate::drag::{begin_export, platform_drag_host, DragHost};
use crate::paths::{BundledBinaries, SessionPaths};
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    view: DownloadView,
    session: Session,
    // None when the page surface could not be created.
    coordinator: Option<DownloadCoordinator>,
    drag_host: Arc<dyn DragHost>,
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// (Requested URL, navigation result)
    SurfaceReady(String, Result<(), String>),
    TitleEvaluated(Result<String, AppError>),
    Download(DownloadEvent),
    /// Where the exported copy landed, if the user picked a place
    DragExported(Result<Option<PathBuf>, AppError>),
    DragResetElapsed,
}

impl DownloadApp {
    pub fn new(config: DiggerConfig) -> (Self, Task<Message>) {
        let session = Session::new(
            TitleRules {
                site_name: config.site_name.clone(),
                loading_marker: config.loading_marker.clone(),
                search_prefix: config.search_prefix.clone(),
            },
            config.drag_reset_delay(),
        );
        let mut app = Self {
            view: DownloadView::new(&config.start_url),
            session,
            coordinator: None,
            drag_host: platform_drag_host(),
        };

        match build_coordinator(&config) {
            Ok(coordinator) => {
                let url = coordinator.start_url().to_string();
                let boot = load_page(&coordinator, url);
                app.coordinator = Some(coordinator);
                (app, boot)
            }
            Err(e) => {
                error!(error = %e, "page surface creation failed");
                app.session.surface_failed(e.to_string());
                (app, Task::none())
            }
        }
    }
}

fn build_coordinator(config: &DiggerConfig) -> Result<DownloadCoordinator, AppError> {
    let surface = PageClient::new(SurfaceOptions::default())
        .map_err(|e| AppError::Surface(e.to_string()))?;

    let temp_root = std::env::temp_dir();
    let paths = if config.shared_temp_namespace {
        SessionPaths::in_dir(temp_root, &config.audio_format)
    } else {
        SessionPaths::scoped(&temp_root, &config.audio_format)
    };
    info!(dir = %paths.dir().display(), "sample output directory");

    let downloader = Downloader::new(
        config,
        Arc::new(BundledBinaries::discover(config.binaries_dir.clone())),
        Arc::new(ChildProcessRunner::new(config.process_timeout())),
        paths,
    );
    let worker = DownloadWorker::new(downloader, config.shutdown_wait());

    Ok(DownloadCoordinator::new(config, Arc::new(surface), worker))
}

fn load_page(coordinator: &DownloadCoordinator, url: String) -> Task<Message> {
    info!(%url, "navigating page surface");
    let requested = url.clone();
    Task::perform(coordinator.load_page(url), move |result| {
        Message::SurfaceReady(requested, result)
    })
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            let drag_started = app.view.update(&ui_msg);
            if drag_started {
                let effect = app.session.drag_gesture();
                return run_effect(app, effect);
            }

            match ui_msg {
                DownloadMessage::DownloadPressed => match app.session.trigger() {
                    Ok(effect) => return run_effect(app, effect),
                    Err(e) => warn!(error = %e, "trigger rejected"),
                },
                DownloadMessage::GoPressed => {
                    let downloading = app
                        .coordinator
                        .as_ref()
                        .is_some_and(|c| c.is_downloading());
                    if app.session.is_busy() || downloading {
                        warn!("navigation ignored while a download is in progress");
                    } else if let Some(coordinator) = app.coordinator.clone() {
                        if app.session.surface_reloading() {
                            return load_page(&coordinator, app.view.page_url.trim().to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        Message::SurfaceReady(url, result) => {
            match &result {
                Ok(()) => {
                    info!(%url, "page surface ready");
                    app.view.loaded_url = Some(url);
                }
                Err(e) => error!(%url, error = %e, "page surface failed to load"),
            }
            app.session.surface_ready(result);
        }
        Message::TitleEvaluated(result) => {
            if let Ok(title) = &result {
                app.view.last_title = Some(title.clone());
            }
            let effect = app.session.title_received(result);
            return run_effect(app, effect);
        }
        Message::Download(event) => {
            let effect = app.session.download_event(event);
            return run_effect(app, effect);
        }
        Message::DragExported(result) => match result {
            Ok(Some(path)) => info!(path = %path.display(), "sample handed off"),
            Ok(None) => info!("export dismissed"),
            Err(e) => warn!(error = %e, "export failed"),
        },
        Message::DragResetElapsed => {
            app.session.reset_elapsed();
        }
    }
    Task::none()
}

fn run_effect(app: &mut DownloadApp, effect: Effect) -> Task<Message> {
    let Some(coordinator) = app.coordinator.clone() else {
        return Task::none();
    };

    match effect {
        Effect::None => Task::none(),
        Effect::QueryTitle => Task::perform(coordinator.read_title(), Message::TitleEvaluated),
        Effect::Dispatch(request) => {
            let id = request.id;
            match coordinator.start_download(request) {
                Ok(events) => Task::stream(events.map(Message::Download)),
                Err(e) => {
                    error!(request = id, error = %e, "could not dispatch download");
                    app.session.dispatch_failed(id, e);
                    Task::none()
                }
            }
        }
        Effect::Export(payload) => {
            let (export, reset) = start_export(app, &payload);
            let export = export.unwrap_or_else(Task::none);
            Task::batch([export, run_effect(app, reset)])
        }
        Effect::ScheduleReset(delay) => {
            Task::perform(async move { tokio::time::sleep(delay).await }, |_| {
                Message::DragResetElapsed
            })
        }
    }
}

/// Hands the payload to the drag host and reports the drag as started. The
/// export task is `None` when the file has gone missing.
fn start_export(app: &mut DownloadApp, payload: &DragPayload) -> (Option<Task<Message>>, Effect) {
    let export = begin_export(app.drag_host.as_ref(), payload)
        .map(|task| task.map(Message::DragExported));
    (export, app.session.drag_started())
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view(&app.session).map(Message::UiMessage)
}
