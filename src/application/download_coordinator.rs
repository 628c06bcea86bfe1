use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::FutureExt;

use crate::{
    api::PageSurface,
    config::DiggerConfig,
    domain::{AppError, DownloadEvent, DownloadRequest},
    downloader::DownloadWorker,
};

/// Owns the collaborators the UI talks to: the page surface and the
/// download worker.
#[derive(Clone)]
pub struct DownloadCoordinator {
    surface: Arc<dyn PageSurface>,
    worker: Arc<DownloadWorker>,
    start_url: String,
}

impl DownloadCoordinator {
    pub fn new(config: &DiggerConfig, surface: Arc<dyn PageSurface>, worker: DownloadWorker) -> Self {
        Self {
            surface,
            worker: Arc::new(worker),
            start_url: config.start_url.clone(),
        }
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Navigate the surface; the error is flattened to text for display.
    pub fn load_page(&self, url: String) -> BoxFuture<'static, Result<(), String>> {
        self.surface
            .load(url)
            .map(|result| result.map_err(|e| e.to_string()))
            .boxed()
    }

    pub fn read_title(&self) -> BoxFuture<'static, Result<String, AppError>> {
        self.surface
            .evaluate_title()
            .map(|result| result.map_err(|e| AppError::Surface(e.to_string())))
            .boxed()
    }

    pub fn start_download(
        &self,
        request: DownloadRequest,
    ) -> Result<BoxStream<'static, DownloadEvent>, AppError> {
        self.worker.start(request)
    }

    /// True while the worker thread still owns the download slot.
    pub fn is_downloading(&self) -> bool {
        self.worker.is_busy()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::SurfaceError;
    use crate::downloader::tests::{fixture, FakeRunner};
    use futures::StreamExt;
    use std::time::Duration;

    pub struct FixedSurface {
        pub title: Option<String>,
    }

    impl PageSurface for FixedSurface {
        fn load(&self, _url: String) -> BoxFuture<'static, Result<(), SurfaceError>> {
            futures::future::ready(Ok(())).boxed()
        }

        fn evaluate_title(&self) -> BoxFuture<'static, Result<String, SurfaceError>> {
            let result = self.title.clone().ok_or(SurfaceError::NoTitle);
            futures::future::ready(result).boxed()
        }
    }

    #[tokio::test]
    async fn test_title_errors_become_surface_errors() {
        let dir = tempfile::tempdir().unwrap();
        let worker = DownloadWorker::new(
            fixture(dir.path(), true, true, Arc::new(FakeRunner::writing(None, 0))),
            Duration::from_secs(1),
        );
        let coordinator = DownloadCoordinator::new(
            &DiggerConfig::default(),
            Arc::new(FixedSurface { title: None }),
            worker,
        );

        let err = coordinator.read_title().await.unwrap_err();
        assert_eq!(err, AppError::Surface("page has no title".to_string()));
        assert!(coordinator.load_page("https://samplette.io".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_download_runs_through_worker() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("session").join("crate_sample.wav");
        let runner = Arc::new(FakeRunner::writing(Some(expected.clone()), 4096));
        let worker = DownloadWorker::new(fixture(dir.path(), true, true, runner), Duration::from_secs(1));
        let coordinator = DownloadCoordinator::new(
            &DiggerConfig::default(),
            Arc::new(FixedSurface {
                title: Some("x".to_string()),
            }),
            worker,
        );

        let request = DownloadRequest::new(1, "Song", "ytsearch1:");
        let events: Vec<_> = coordinator.start_download(request).unwrap().collect().await;
        assert_eq!(events.len(), 2);
    }
}
