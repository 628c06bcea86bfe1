//! Handing the finished sample to the host with a file drag.
//!
//! On Windows and macOS the tile starts a real OS drag, so the sample can be
//! dropped straight onto a DAW track. Elsewhere the drop target is stood in
//! for by a save dialog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use iced::{Point, Task};
use tracing::{info, warn};

use crate::domain::{AppError, DragPayload};
use crate::utils::sanitize_filename;

/// Pointer travel (in logical pixels) before a press counts as a drag.
const DRAG_THRESHOLD: f32 = 4.0;

/// The host side of an external file drag.
pub trait DragHost: Send + Sync {
    /// Hand `files` over to the host. `allow_move` false means the host must
    /// copy them. `display_name` is what the user knows the sample as.
    /// Resolves with where the files ended up, when the host can tell.
    fn perform_external_drag(
        &self,
        files: Vec<PathBuf>,
        allow_move: bool,
        display_name: &str,
    ) -> Task<Result<Option<PathBuf>, AppError>>;
}

/// The drag host for the platform the app was built for.
pub fn platform_drag_host() -> Arc<dyn DragHost> {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        Arc::new(native::NativeDragHost)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Arc::new(SaveDialogDragHost)
    }
}

/// Press/move/release tracking for the drag tile. Fires at most once per
/// gesture.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DragGesture {
    pressed: bool,
    origin: Option<Point>,
    fired: bool,
}

impl DragGesture {
    pub fn moved(&mut self, position: Point) -> bool {
        if !self.pressed || self.fired {
            return false;
        }
        // Press without a known position: the first move is the anchor.
        let Some(origin) = self.origin else {
            self.origin = Some(position);
            return false;
        };
        if origin.distance(position) < DRAG_THRESHOLD {
            return false;
        }
        self.fired = true;
        true
    }

    /// The tile reports presses without a position.
    pub fn pressed(&mut self) {
        self.pressed = true;
        self.origin = None;
        self.fired = false;
    }

    pub fn released(&mut self) {
        *self = Self::default();
    }
}

/// Start the external drag for `payload`, or `None` if the file is gone.
pub fn begin_export(
    host: &dyn DragHost,
    payload: &DragPayload,
) -> Option<Task<Result<Option<PathBuf>, AppError>>> {
    if !payload.is_available() {
        warn!(file = %payload.path().display(), "drag ignored, file no longer exists");
        return None;
    }
    info!(file = %payload.path().display(), "starting external drag");
    Some(host.perform_external_drag(vec![payload.file.clone()], false, &payload.name))
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
mod native {
    use std::path::PathBuf;

    use iced::{window, Task};
    use raw_window_handle::HasWindowHandle;
    use tracing::{debug, info, warn};

    use super::{DragHost, SaveDialogDragHost};
    use crate::domain::AppError;

    const PREVIEW_ICON: &[u8] = include_bytes!("../assets/drag_preview.png");

    /// OS drag-and-drop from the app window. Hosts decide copy vs move on
    /// drop; the file stays in the temp dir either way so the tile can be
    /// dragged again. Falls back to the save dialog if the OS refuses.
    pub struct NativeDragHost;

    impl DragHost for NativeDragHost {
        fn perform_external_drag(
            &self,
            files: Vec<PathBuf>,
            allow_move: bool,
            display_name: &str,
        ) -> Task<Result<Option<PathBuf>, AppError>> {
            debug!(name = display_name, allow_move, "native drag requested");
            let name = display_name.to_string();
            let dragged = files.clone();
            window::oldest()
                .then(move |id| match id {
                    Some(id) => {
                        let files = dragged.clone();
                        window::run(id, move |window| start_drag(window, files))
                    }
                    None => Task::done(Err(AppError::Export("no window to drag from".to_string()))),
                })
                .then(move |result| match result {
                    Err(e) => {
                        warn!(error = %e, "native drag unavailable, asking for a destination");
                        SaveDialogDragHost.perform_external_drag(files.clone(), allow_move, &name)
                    }
                    done => Task::done(done),
                })
        }
    }

    fn start_drag<W>(window: &W, files: Vec<PathBuf>) -> Result<Option<PathBuf>, AppError>
    where
        W: HasWindowHandle + ?Sized,
    {
        let handle = window
            .window_handle()
            .map_err(|e| AppError::Export(e.to_string()))?;
        drag::start_drag(
            &handle,
            drag::DragItem::Files(files),
            drag::Image::Raw(PREVIEW_ICON.to_vec()),
            |result, _cursor| info!(?result, "native drag finished"),
            drag::Options::default(),
        )
        .map_err(|e| AppError::Export(e.to_string()))?;
        Ok(None)
    }
}

/// Stand-in for a host drop target where there is no native drag source:
/// the user picks where the sample lands and it is copied there.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveDialogDragHost;

impl DragHost for SaveDialogDragHost {
    fn perform_external_drag(
        &self,
        files: Vec<PathBuf>,
        allow_move: bool,
        display_name: &str,
    ) -> Task<Result<Option<PathBuf>, AppError>> {
        let Some(source) = files.into_iter().next() else {
            return Task::done(Ok(None));
        };
        let suggested = suggested_name(&source, display_name);
        Task::perform(save_via_dialog(source, suggested, allow_move), |r| r)
    }
}

async fn save_via_dialog(
    source: PathBuf,
    suggested: Option<String>,
    allow_move: bool,
) -> Result<Option<PathBuf>, AppError> {
    let mut dialog = rfd::AsyncFileDialog::new();
    if let Some(name) =
        suggested.or_else(|| source.file_name().map(|n| n.to_string_lossy().to_string()))
    {
        dialog = dialog.set_file_name(name);
    }
    let picked = dialog.save_file().await;
    let Some(destination) = picked.map(|handle| handle.path().to_path_buf()) else {
        return Ok(None);
    };

    transfer(&source, &destination, allow_move).await?;
    info!(to = %destination.display(), "sample exported");
    Ok(Some(destination))
}

/// `display_name` made filesystem-safe, keeping the file's extension.
fn suggested_name(file: &Path, display_name: &str) -> Option<String> {
    let extension = file
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = sanitize_filename(display_name);
    let stem = stem.trim_matches(|c| c == '.' || c == ' ');
    if stem.is_empty() {
        None
    } else if extension.is_empty() {
        Some(stem.to_string())
    } else {
        Some(format!("{}.{}", stem, extension))
    }
}

async fn transfer(source: &Path, destination: &Path, allow_move: bool) -> Result<(), AppError> {
    if allow_move && tokio::fs::rename(source, destination).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(source, destination)
        .await
        .map(|_| ())
        .map_err(|e| AppError::Export(e.to_string()))
}
