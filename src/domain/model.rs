use std::path::{Path, PathBuf};

use super::AppError;

/// A single accepted search, consumed once by the download worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub id: u64,
    pub query: String,
    pub directive: String,
}

impl DownloadRequest {
    pub fn new(id: u64, query: impl Into<String>, search_prefix: &str) -> Self {
        let query = query.into();
        let directive = format!("{}{}", search_prefix, query);
        Self {
            id,
            query,
            directive,
        }
    }

    /// First few characters of the query, for button labels.
    pub fn short_query(&self) -> String {
        self.query.chars().take(15).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Ready(PathBuf),
    Failed(AppError),
}

impl From<Result<PathBuf, AppError>> for DownloadOutcome {
    fn from(result: Result<PathBuf, AppError>) -> Self {
        match result {
            Ok(path) => DownloadOutcome::Ready(path),
            Err(e) => DownloadOutcome::Failed(e),
        }
    }
}

/// Messages posted by the background worker to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// Pre-flight passed; the external process is starting.
    Launched { request: u64 },
    /// Posted exactly once per request, success or not.
    Finished {
        request: u64,
        outcome: DownloadOutcome,
    },
}

impl DownloadEvent {
    pub fn request_id(&self) -> u64 {
        match self {
            DownloadEvent::Launched { request } | DownloadEvent::Finished { request, .. } => {
                *request
            }
        }
    }
}

/// The most recent ready file, handed to the drag primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub file: PathBuf,
    /// Query the file was found with; used to name exported copies.
    pub name: String,
}

impl DragPayload {
    pub fn new(file: PathBuf, name: impl Into<String>) -> Self {
        Self {
            file,
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn is_available(&self) -> bool {
        self.file.is_file()
    }
}
