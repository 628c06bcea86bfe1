pub mod error;
pub mod model;

pub use error::{AppError, TitleRejection};
pub use model::{DownloadEvent, DownloadOutcome, DownloadRequest, DragPayload};
