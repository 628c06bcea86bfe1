use std::time::Duration;

/// Configuration for the page client
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("CrateDigger/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(20),
        }
    }
}
