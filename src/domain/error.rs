use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("{tool} binary is missing")]
    ToolMissing { tool: String },

    #[error("failed to start {tool}: {reason}")]
    ProcessStart { tool: String, reason: String },

    #[error("no usable audio at {}", path.display())]
    Transcription { path: PathBuf, size: Option<u64> },

    #[error("page title rejected: {0}")]
    TitleRejected(TitleRejection),

    #[error("page surface is not ready")]
    SurfaceNotReady,

    #[error("page surface error: {0}")]
    Surface(String),

    #[error("page failed to load: {0}")]
    Navigation(String),

    #[error("a download is already running")]
    Busy,

    #[error("downloader timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("download cancelled")]
    Cancelled,

    #[error("export failed: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

/// Why a page title could not be turned into a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleRejection {
    Empty,
    Generic,
    Loading,
}

impl fmt::Display for TitleRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TitleRejection::Empty => "title is empty",
            TitleRejection::Generic => "title is the site default",
            TitleRejection::Loading => "page is still loading",
        };
        f.write_str(reason)
    }
}

impl AppError {
    /// Short text shown on the trigger button after a failure.
    pub fn trigger_label(&self) -> String {
        match self {
            AppError::ToolMissing { tool } => format!("Error: {} missing", tool),
            AppError::ProcessStart { .. } => "Error: could not start downloader".to_string(),
            AppError::Transcription { .. } => "Error: download failed".to_string(),
            AppError::TitleRejected(_) => "Error: Title is generic".to_string(),
            AppError::SurfaceNotReady => "Page not ready".to_string(),
            AppError::Surface(_) => "JS Error".to_string(),
            AppError::Navigation(_) => "Error: page failed to load".to_string(),
            AppError::Busy => "Download already running".to_string(),
            AppError::TimedOut { .. } => "Error: download timed out".to_string(),
            AppError::Cancelled => "Download cancelled".to_string(),
            AppError::Export(_) => "Error: export failed".to_string(),
            AppError::Io(_) | AppError::Config(_) => "Error: see log".to_string(),
        }
    }
}
