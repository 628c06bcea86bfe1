use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "crate_digger=info";

pub fn debug_log_path() -> PathBuf {
    std::env::temp_dir().join("cratedigger_debug.log")
}

/// Install the global subscriber: stderr plus an append-only debug log in
/// the temp dir. Falls back to stderr alone if the log file can't be opened.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let log_path = debug_log_path();
    let file_layer = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        ),
        Err(e) => {
            eprintln!("could not open {}: {}", log_path.display(), e);
            None
        }
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if result.is_ok() {
        tracing::info!(log = %log_path.display(), "logging initialised");
    }
}
