//! The single source of truth for what the plugin is doing.
//!
//! [`Session`] takes user input and worker events, moves between
//! [`UiState`]s and tells the caller which side effect to run next. It does
//! no I/O itself apart from checking that a drag payload still exists.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{AppError, DownloadEvent, DownloadOutcome, DownloadRequest, DragPayload};
use crate::utils::extract_query;

pub const DEFAULT_TRIGGER_LABEL: &str = "⬇ Download This Sample";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiState {
    /// Page surface still initialising; trigger disabled.
    SurfaceLoading,
    /// The surface could not be created; nothing is actionable.
    SurfaceFailed(String),
    Idle,
    /// Idle with the last failure shown on the trigger.
    Error(AppError),
    AwaitingTitle,
    Searching(DownloadRequest),
    Downloading(DownloadRequest),
    ReadyToDrag(DragPayload),
    /// Drag used; waiting out the reset delay.
    DragArmed(DragPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    QueryTitle,
    Dispatch(DownloadRequest),
    Export(DragPayload),
    ScheduleReset(Duration),
}

#[derive(Debug, Clone)]
pub struct TitleRules {
    pub site_name: String,
    pub loading_marker: String,
    pub search_prefix: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: UiState,
    rules: TitleRules,
    reset_delay: Duration,
    next_request: u64,
}

impl Session {
    pub fn new(rules: TitleRules, reset_delay: Duration) -> Self {
        Self {
            state: UiState::SurfaceLoading,
            rules,
            reset_delay,
            next_request: 1,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    fn transition(&mut self, next: UiState) {
        debug!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    /// Readiness signal from the page surface. Only acted on while the
    /// surface is still loading. A failed navigation leaves the surface
    /// usable, so the trigger comes back with the error on it.
    pub fn surface_ready(&mut self, result: Result<(), String>) {
        if self.state != UiState::SurfaceLoading {
            return;
        }
        match result {
            Ok(()) => self.transition(UiState::Idle),
            Err(reason) => {
                warn!(%reason, "page navigation failed");
                self.transition(UiState::Error(AppError::Navigation(reason)));
            }
        }
    }

    /// The surface itself could not be created. Nothing is actionable
    /// after this.
    pub fn surface_failed(&mut self, reason: String) {
        warn!(%reason, "page surface failed to initialise");
        self.transition(UiState::SurfaceFailed(reason));
    }

    /// The surface is navigating again; gate the trigger until it reports
    /// back. Ignored mid-download.
    pub fn surface_reloading(&mut self) -> bool {
        match self.state {
            UiState::Idle | UiState::Error(_) => {
                self.transition(UiState::SurfaceLoading);
                true
            }
            _ => false,
        }
    }

    /// The user pressed the trigger.
    pub fn trigger(&mut self) -> Result<Effect, AppError> {
        match self.state {
            UiState::Idle | UiState::Error(_) => {
                self.transition(UiState::AwaitingTitle);
                Ok(Effect::QueryTitle)
            }
            UiState::SurfaceLoading | UiState::SurfaceFailed(_) => {
                warn!("download attempted but page surface not ready");
                Err(AppError::SurfaceNotReady)
            }
            _ => Err(AppError::Busy),
        }
    }

    /// Result of evaluating the page title.
    pub fn title_received(&mut self, result: Result<String, AppError>) -> Effect {
        if self.state != UiState::AwaitingTitle {
            return Effect::None;
        }

        let title = match result {
            Ok(title) => title,
            Err(e) => {
                warn!(error = %e, "could not read page title");
                self.transition(UiState::Error(e));
                return Effect::None;
            }
        };
        info!(%title, "raw page title");

        match extract_query(&title, &self.rules.site_name, &self.rules.loading_marker) {
            Ok(query) => {
                let request = DownloadRequest::new(self.next_request, query, &self.rules.search_prefix);
                self.next_request += 1;
                info!(request = request.id, query = %request.query, "search query accepted");
                self.transition(UiState::Searching(request.clone()));
                Effect::Dispatch(request)
            }
            Err(rejection) => {
                warn!(%title, %rejection, "page title does not look like a song yet");
                self.transition(UiState::Error(AppError::TitleRejected(rejection)));
                Effect::None
            }
        }
    }

    /// The worker refused the request before running it.
    pub fn dispatch_failed(&mut self, request: u64, error: AppError) {
        if self.in_flight() == Some(request) {
            self.transition(UiState::Error(error));
        }
    }

    /// Worker report. Anything not about the request in flight is stale and
    /// dropped.
    pub fn download_event(&mut self, event: DownloadEvent) -> Effect {
        let Some(current) = self.in_flight_request().cloned() else {
            debug!(?event, "ignoring download event, nothing in flight");
            return Effect::None;
        };
        if event.request_id() != current.id {
            debug!(?event, current = current.id, "ignoring stale download event");
            return Effect::None;
        }

        match event {
            DownloadEvent::Launched { .. } => {
                self.transition(UiState::Downloading(current));
            }
            DownloadEvent::Finished { outcome, .. } => match outcome {
                DownloadOutcome::Ready(file) => {
                    self.transition(UiState::ReadyToDrag(DragPayload::new(file, current.query)));
                }
                DownloadOutcome::Failed(e) => {
                    self.transition(UiState::Error(e));
                }
            },
        }
        Effect::None
    }

    /// A drag gesture crossed the threshold on the drag tile.
    pub fn drag_gesture(&mut self) -> Effect {
        let UiState::ReadyToDrag(payload) = &self.state else {
            return Effect::None;
        };
        if !payload.is_available() {
            warn!(file = %payload.path().display(), "drag payload vanished");
            return Effect::None;
        }
        let payload = payload.clone();
        self.transition(UiState::DragArmed(payload.clone()));
        Effect::Export(payload)
    }

    /// Called once the host drag primitive has been invoked.
    pub fn drag_started(&mut self) -> Effect {
        match self.state {
            UiState::DragArmed(_) => Effect::ScheduleReset(self.reset_delay),
            _ => Effect::None,
        }
    }

    pub fn reset_elapsed(&mut self) {
        if matches!(self.state, UiState::DragArmed(_)) {
            self.transition(UiState::Idle);
        }
    }

    fn in_flight_request(&self) -> Option<&DownloadRequest> {
        match &self.state {
            UiState::Searching(request) | UiState::Downloading(request) => Some(request),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight_request().map(|r| r.id)
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            UiState::AwaitingTitle | UiState::Searching(_) | UiState::Downloading(_)
        )
    }

    pub fn is_surface_ready(&self) -> bool {
        !matches!(
            self.state,
            UiState::SurfaceLoading | UiState::SurfaceFailed(_)
        )
    }

    pub fn trigger_enabled(&self) -> bool {
        matches!(self.state, UiState::Idle | UiState::Error(_))
    }

    pub fn trigger_visible(&self) -> bool {
        !matches!(
            self.state,
            UiState::SurfaceFailed(_) | UiState::ReadyToDrag(_) | UiState::DragArmed(_)
        )
    }

    pub fn drag_visible(&self) -> bool {
        matches!(self.state, UiState::ReadyToDrag(_) | UiState::DragArmed(_))
    }

    pub fn trigger_label(&self) -> String {
        match &self.state {
            UiState::SurfaceLoading | UiState::SurfaceFailed(_) | UiState::Idle => {
                DEFAULT_TRIGGER_LABEL.to_string()
            }
            UiState::ReadyToDrag(_) | UiState::DragArmed(_) => DEFAULT_TRIGGER_LABEL.to_string(),
            UiState::Error(e) => e.trigger_label(),
            UiState::AwaitingTitle => "Reading Page Title...".to_string(),
            UiState::Searching(request) => format!("Searching: {}...", request.short_query()),
            UiState::Downloading(request) => format!("Downloading: {}...", request.short_query()),
        }
    }

    /// Full-window message covering the page, if any.
    pub fn overlay_message(&self) -> Option<String> {
        match &self.state {
            UiState::SurfaceLoading => Some("Loading CrateDigger...".to_string()),
            UiState::SurfaceFailed(reason) => Some(format!("Failed to load page: {}", reason)),
            _ => None,
        }
    }
}
