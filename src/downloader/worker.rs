use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{info, warn};

use super::Downloader;
use crate::domain::{AppError, DownloadEvent, DownloadOutcome, DownloadRequest};

/// Runs one download at a time on its own thread and reports back through
/// a stream of [`DownloadEvent`]s.
pub struct DownloadWorker {
    downloader: Arc<Downloader>,
    busy: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_wait: Duration,
}

impl DownloadWorker {
    pub fn new(downloader: Downloader, shutdown_wait: Duration) -> Self {
        Self {
            downloader: Arc::new(downloader),
            busy: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
            shutdown_wait,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Dispatch `request`. Fails with [`AppError::Busy`] while another
    /// download is still running.
    pub fn start(
        &self,
        request: DownloadRequest,
    ) -> Result<BoxStream<'static, DownloadEvent>, AppError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(request = request.id, "download requested while another is running");
            return Err(AppError::Busy);
        }

        let (tx, rx) = mpsc::unbounded();
        let downloader = self.downloader.clone();
        let busy = self.busy.clone();
        let cancel = self.cancel.clone();

        let spawned = std::thread::Builder::new()
            .name("yt-dlp-worker".to_string())
            .spawn(move || {
                let id = request.id;
                let launch_tx = tx.clone();
                let result = downloader.run(&request, &cancel, move || {
                    let _ = launch_tx.unbounded_send(DownloadEvent::Launched { request: id });
                });

                let outcome = DownloadOutcome::from(result);
                if let DownloadOutcome::Failed(e) = &outcome {
                    warn!(request = id, error = %e, "download failed");
                }

                // Free the slot before the UI can observe the outcome.
                busy.store(false, Ordering::SeqCst);
                let _ = tx.unbounded_send(DownloadEvent::Finished {
                    request: id,
                    outcome,
                });
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut slot) = self.handle.lock() {
                    // Any previous thread has already posted its outcome.
                    *slot = Some(handle);
                }
                Ok(rx.boxed())
            }
            Err(e) => {
                self.busy.store(false, Ordering::SeqCst);
                Err(AppError::Io(format!("failed to spawn worker: {}", e)))
            }
        }
    }

    /// Cancel the running download and wait up to `wait` for the thread to
    /// exit. Returns false if it was still running when the wait ran out.
    pub fn shutdown(&self, wait: Duration) -> bool {
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(handle) = handle else {
            return true;
        };

        self.cancel.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + wait;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("download worker still running after {:?}, detaching", wait);
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let _ = handle.join();
        info!("download worker stopped");
        true
    }
}

impl Drop for DownloadWorker {
    fn drop(&mut self) {
        self.shutdown(self.shutdown_wait);
    }
}
