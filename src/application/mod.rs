pub mod download_coordinator;
pub mod state_machine;

pub use download_coordinator::DownloadCoordinator;
pub use state_machine::{Effect, Session, TitleRules, UiState};
