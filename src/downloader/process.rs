use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, warn};

use crate::domain::AppError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A fully built command line plus the file that receives its combined
/// stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub capture: PathBuf,
}

impl Invocation {
    pub fn tool_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub output: String,
    pub status: Option<ExitStatus>,
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion, blocking the calling thread.
    fn run(&self, invocation: &Invocation, cancel: &AtomicBool) -> Result<ProcessReport, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct ChildProcessRunner {
    timeout: Option<Duration>,
}

impl ChildProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ChildProcessRunner {
    fn run(&self, invocation: &Invocation, cancel: &AtomicBool) -> Result<ProcessReport, AppError> {
        let tool = invocation.tool_name();
        let start_error = |e: std::io::Error| AppError::ProcessStart {
            tool: tool.clone(),
            reason: e.to_string(),
        };

        let capture = File::create(&invocation.capture).map_err(start_error)?;
        let capture_err = capture.try_clone().map_err(start_error)?;

        let child = background_command(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture))
            .stderr(Stdio::from(capture_err))
            .spawn()
            .map_err(start_error)?;

        let status = wait_for_exit(child, self.timeout, cancel)?;

        let output = std::fs::read(&invocation.capture)
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
            .unwrap_or_default();

        Ok(ProcessReport {
            output,
            status: Some(status),
        })
    }
}

fn wait_for_exit(
    mut child: Child,
    timeout: Option<Duration>,
    cancel: &AtomicBool,
) -> Result<ExitStatus, AppError> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if cancel.load(Ordering::SeqCst) {
            warn!("cancelling downloader process");
            kill_and_reap(&mut child);
            return Err(AppError::Cancelled);
        }

        if let (Some(deadline), Some(timeout)) = (deadline, timeout) {
            if Instant::now() >= deadline {
                error!("downloader timed out after {}s, killing", timeout.as_secs());
                kill_and_reap(&mut child);
                return Err(AppError::TimedOut {
                    seconds: timeout.as_secs(),
                });
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn background_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    // Keep the host window focused while the tool runs.
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(dir: &std::path::Path, script: &str) -> Invocation {
        Invocation {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), script.into()],
            capture: dir.join("capture.log"),
        }
    }

    #[test]
    fn test_combined_output_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = shell(dir.path(), "echo to-stdout; echo to-stderr 1>&2; exit 3");
        let report = ChildProcessRunner::default()
            .run(&invocation, &AtomicBool::new(false))
            .unwrap();

        assert!(report.output.contains("to-stdout"));
        assert!(report.output.contains("to-stderr"));
        assert_eq!(report.status.and_then(|s| s.code()), Some(3));
    }

    #[test]
    fn test_missing_program_is_start_failure() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation {
            program: dir.path().join("yt-dlp"),
            args: Vec::new(),
            capture: dir.path().join("capture.log"),
        };
        let err = ChildProcessRunner::default()
            .run(&invocation, &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, AppError::ProcessStart { ref tool, .. } if tool == "yt-dlp"));
    }

    #[test]
    fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = shell(dir.path(), "sleep 5");
        let started = Instant::now();
        let err = ChildProcessRunner::new(Some(Duration::from_millis(200)))
            .run(&invocation, &AtomicBool::new(false))
            .unwrap_err();

        assert!(matches!(err, AppError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancel_flag_stops_child() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = shell(dir.path(), "sleep 5");
        let err = ChildProcessRunner::default()
            .run(&invocation, &AtomicBool::new(true))
            .unwrap_err();
        assert_eq!(err, AppError::Cancelled);
    }

    #[test]
    fn test_display_joins_arguments() {
        let invocation = Invocation {
            program: PathBuf::from("/bins/yt-dlp"),
            args: vec!["-x".into(), "ytsearch1:Artist - Song".into()],
            capture: PathBuf::from("/tmp/c.log"),
        };
        assert_eq!(invocation.to_string(), "/bins/yt-dlp -x ytsearch1:Artist - Song");
    }
}
