//! External downloader invocation.
//!
//! Builds the yt-dlp command line, runs it through a [`CommandRunner`] and
//! decides success purely from what landed on disk.

pub mod process;
pub mod worker;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::DiggerConfig;
use crate::domain::{AppError, DownloadRequest};
use crate::paths::{BinaryResolver, SessionPaths};

pub use process::{ChildProcessRunner, CommandRunner, Invocation, ProcessReport};
pub use worker::DownloadWorker;

pub const DOWNLOADER_TOOL: &str = "yt-dlp";
pub const TRANSCODER_TOOL: &str = "ffmpeg";

pub struct Downloader {
    resolver: Arc<dyn BinaryResolver>,
    runner: Arc<dyn CommandRunner>,
    paths: SessionPaths,
    audio_format: String,
    min_output_bytes: u64,
}

impl Downloader {
    pub fn new(
        config: &DiggerConfig,
        resolver: Arc<dyn BinaryResolver>,
        runner: Arc<dyn CommandRunner>,
        paths: SessionPaths,
    ) -> Self {
        Self {
            resolver,
            runner,
            paths,
            audio_format: config.audio_format.clone(),
            min_output_bytes: config.min_output_bytes,
        }
    }

    /// Produce an audio file for `request`. Blocks for the whole external
    /// run; call from a worker thread only. `on_launch` fires once pre-flight
    /// has passed, right before the process starts.
    pub fn run(
        &self,
        request: &DownloadRequest,
        cancel: &AtomicBool,
        on_launch: impl FnOnce(),
    ) -> Result<PathBuf, AppError> {
        let downloader = self.resolver.resolve(DOWNLOADER_TOOL);
        if !downloader.exists() {
            error!(path = %downloader.display(), "{} binary missing", DOWNLOADER_TOOL);
            return Err(AppError::ToolMissing {
                tool: DOWNLOADER_TOOL.to_string(),
            });
        }

        let transcoder = Some(self.resolver.resolve(TRANSCODER_TOOL)).filter(|p| p.exists());
        if transcoder.is_none() {
            warn!("{} not found, relying on the downloader's own lookup", TRANSCODER_TOOL);
        }

        self.clear_stale_outputs()?;

        let invocation = self.build_invocation(downloader, transcoder.as_deref(), &request.directive);
        info!(request = request.id, command = %invocation, "executing downloader");

        on_launch();
        let report = self.runner.run(&invocation, cancel)?;
        debug!(status = ?report.status, "downloader output:\n{}", report.output);

        let file = verify_output(&self.paths.expected(), self.min_output_bytes)?;
        info!(request = request.id, file = %file.display(), "sample ready");
        Ok(file)
    }

    pub fn build_invocation(
        &self,
        program: PathBuf,
        transcoder: Option<&Path>,
        directive: &str,
    ) -> Invocation {
        let mut args: Vec<OsString> = Vec::new();

        if let Some(dir) = transcoder.and_then(Path::parent) {
            args.push("--ffmpeg-location".into());
            args.push(dir.as_os_str().to_owned());
        }

        args.push("--verbose".into());
        args.push("--force-overwrites".into());
        args.push("-x".into());
        args.push("--audio-format".into());
        args.push(self.audio_format.as_str().into());
        args.push("-o".into());
        args.push(self.paths.intermediate().into_os_string());
        args.push(directive.into());

        Invocation {
            program,
            args,
            capture: self.paths.capture_log(),
        }
    }

    /// Remove anything a previous run left behind so it can't pass for a
    /// fresh result.
    fn clear_stale_outputs(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(self.paths.dir())?;

        for stale in [self.paths.intermediate(), self.paths.expected()] {
            match std::fs::remove_file(&stale) {
                Ok(()) => debug!(path = %stale.display(), "removed stale output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Success is "exists and is larger than `min_bytes`"; nothing else counts.
pub fn verify_output(path: &Path, min_bytes: u64) -> Result<PathBuf, AppError> {
    let size = std::fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len());

    match size {
        Some(len) if len > min_bytes => Ok(path.to_path_buf()),
        _ => {
            error!(path = %path.display(), size = ?size, "file not created or too small");
            Err(AppError::Transcription {
                path: path.to_path_buf(),
                size,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct StaticBinaries(pub HashMap<String, PathBuf>);

    impl BinaryResolver for StaticBinaries {
        fn resolve(&self, name: &str) -> PathBuf {
            self.0
                .get(name)
                .cloned()
                .unwrap_or_else(|| PathBuf::from("/nonexistent").join(name))
        }
    }

    /// Pretends to be yt-dlp: writes `bytes` bytes to `target` (if set).
    pub struct FakeRunner {
        pub target: Option<PathBuf>,
        pub bytes: usize,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<Invocation>>,
        pub saw_stale: Mutex<bool>,
    }

    impl FakeRunner {
        pub fn writing(target: Option<PathBuf>, bytes: usize) -> Self {
            Self {
                target,
                bytes,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                saw_stale: Mutex::new(false),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, invocation: &Invocation, _cancel: &AtomicBool) -> Result<ProcessReport, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(invocation.clone());
            if let Some(target) = &self.target {
                if target.exists() {
                    *self.saw_stale.lock().unwrap() = true;
                }
                std::fs::write(target, vec![0u8; self.bytes]).unwrap();
            }
            Ok(ProcessReport {
                output: "[download] 100%".to_string(),
                status: None,
            })
        }
    }

    pub fn fixture(
        dir: &Path,
        with_downloader: bool,
        with_transcoder: bool,
        runner: Arc<FakeRunner>,
    ) -> Downloader {
        let bins = dir.join("bins");
        std::fs::create_dir_all(&bins).unwrap();
        let mut tools = HashMap::new();
        if with_downloader {
            let path = bins.join(DOWNLOADER_TOOL);
            std::fs::write(&path, b"#!/bin/sh\n").unwrap();
            tools.insert(DOWNLOADER_TOOL.to_string(), path);
        }
        if with_transcoder {
            let path = bins.join(TRANSCODER_TOOL);
            std::fs::write(&path, b"").unwrap();
            tools.insert(TRANSCODER_TOOL.to_string(), path);
        }

        Downloader::new(
            &DiggerConfig::default(),
            Arc::new(StaticBinaries(tools)),
            runner,
            SessionPaths::in_dir(dir.join("session"), "wav"),
        )
    }

    fn request() -> DownloadRequest {
        DownloadRequest::new(1, "Daft Punk - One More Time", "ytsearch1:")
    }

    #[test]
    fn test_missing_downloader_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::writing(None, 0));
        let downloader = fixture(dir.path(), false, true, runner.clone());

        let mut launched = false;
        let err = downloader
            .run(&request(), &AtomicBool::new(false), || launched = true)
            .unwrap_err();

        assert_eq!(
            err,
            AppError::ToolMissing {
                tool: "yt-dlp".to_string()
            }
        );
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert!(!launched);
    }

    #[test]
    fn test_argument_list() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::writing(None, 0));
        let downloader = fixture(dir.path(), true, true, runner);
        let program = dir.path().join("bins").join("yt-dlp");
        let transcoder = dir.path().join("bins").join("ffmpeg");

        let invocation =
            downloader.build_invocation(program.clone(), Some(&transcoder), "ytsearch1:Song");
        let expected: Vec<OsString> = vec![
            "--ffmpeg-location".into(),
            dir.path().join("bins").into_os_string(),
            "--verbose".into(),
            "--force-overwrites".into(),
            "-x".into(),
            "--audio-format".into(),
            "wav".into(),
            "-o".into(),
            dir.path().join("session").join("crate_sample").into_os_string(),
            "ytsearch1:Song".into(),
        ];
        assert_eq!(invocation.program, program);
        assert_eq!(invocation.args, expected);
    }

    #[test]
    fn test_absent_transcoder_only_drops_flag() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("session").join("crate_sample.wav");
        let runner = Arc::new(FakeRunner::writing(Some(expected.clone()), 4096));
        let downloader = fixture(dir.path(), true, false, runner.clone());

        let file = downloader
            .run(&request(), &AtomicBool::new(false), || {})
            .unwrap();

        assert_eq!(file, expected);
        let seen = runner.seen.lock().unwrap();
        assert!(!seen[0].args.iter().any(|a| a == "--ffmpeg-location"));
        assert_eq!(seen[0].args.last().unwrap(), "ytsearch1:Daft Punk - One More Time");
    }

    #[test]
    fn test_size_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.wav");
        let big = dir.path().join("big.wav");
        let exact = dir.path().join("exact.wav");
        std::fs::write(&small, vec![0u8; 1023]).unwrap();
        std::fs::write(&exact, vec![0u8; 1024]).unwrap();
        std::fs::write(&big, vec![0u8; 1025]).unwrap();

        assert!(matches!(
            verify_output(&small, 1024),
            Err(AppError::Transcription { size: Some(1023), .. })
        ));
        assert!(verify_output(&exact, 1024).is_err());
        assert_eq!(verify_output(&big, 1024).unwrap(), big);
        assert!(matches!(
            verify_output(&dir.path().join("missing.wav"), 1024),
            Err(AppError::Transcription { size: None, .. })
        ));
    }

    #[test]
    fn test_stale_outputs_removed_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join("crate_sample"), b"partial").unwrap();
        std::fs::write(session.join("crate_sample.wav"), vec![1u8; 8192]).unwrap();

        // The run produces nothing, so only a stale file could make it pass.
        let runner = Arc::new(FakeRunner::writing(None, 0));
        let downloader = fixture(dir.path(), true, true, runner.clone());
        let err = downloader
            .run(&request(), &AtomicBool::new(false), || {})
            .unwrap_err();

        assert!(matches!(err, AppError::Transcription { size: None, .. }));
        assert!(!session.join("crate_sample").exists());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_run_never_sees_first_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("session").join("crate_sample.wav");
        let runner = Arc::new(FakeRunner::writing(Some(expected.clone()), 2048));
        let downloader = fixture(dir.path(), true, true, runner.clone());

        downloader.run(&request(), &AtomicBool::new(false), || {}).unwrap();
        downloader.run(&request(), &AtomicBool::new(false), || {}).unwrap();

        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert!(!*runner.saw_stale.lock().unwrap());
    }
}
