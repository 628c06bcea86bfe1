//! Runtime configuration.
//!
//! Defaults match the bundled layout; a JSON file named by
//! `CRATE_DIGGER_CONFIG` may override any subset of fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::AppError;

pub const CONFIG_ENV: &str = "CRATE_DIGGER_CONFIG";
pub const BINARIES_ENV: &str = "CRATE_DIGGER_BINARIES";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiggerConfig {
    /// Page the surface opens on startup.
    pub start_url: String,
    /// Default page title of the site, also used as the title decoration.
    pub site_name: String,
    /// Substring marking a title that has not settled yet.
    pub loading_marker: String,
    pub search_prefix: String,
    pub audio_format: String,
    pub min_output_bytes: u64,
    pub drag_reset_ms: u64,
    /// Zero disables the timeout.
    pub process_timeout_secs: u64,
    pub shutdown_wait_ms: u64,
    pub binaries_dir: Option<PathBuf>,
    /// Use the fixed paths directly under the temp dir instead of a
    /// per-instance directory.
    pub shared_temp_namespace: bool,
}

impl Default for DiggerConfig {
    fn default() -> Self {
        Self {
            start_url: "https://samplette.io".to_string(),
            site_name: "Samplette".to_string(),
            loading_marker: "Loading".to_string(),
            search_prefix: "ytsearch1:".to_string(),
            audio_format: "wav".to_string(),
            min_output_bytes: 1024,
            drag_reset_ms: 2000,
            process_timeout_secs: 600,
            shutdown_wait_ms: 4000,
            binaries_dir: None,
            shared_temp_namespace: false,
        }
    }
}

impl DiggerConfig {
    /// Load from the environment: the optional config file first, then the
    /// binaries override.
    pub fn load() -> Result<Self, AppError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(BINARIES_ENV) {
            config.binaries_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw).map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.site_name.is_empty() {
            return Err(AppError::Config("site_name must not be empty".to_string()));
        }
        if self.audio_format.is_empty() || self.audio_format.contains(['/', '\\', '.']) {
            return Err(AppError::Config(format!(
                "invalid audio_format: {:?}",
                self.audio_format
            )));
        }
        url::Url::parse(&self.start_url)
            .map_err(|e| AppError::Config(format!("start_url: {}", e)))?;
        Ok(())
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        match self.process_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn drag_reset_delay(&self) -> Duration {
        Duration::from_millis(self.drag_reset_ms)
    }

    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }
}
