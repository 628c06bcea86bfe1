use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

pub const BINARIES_FOLDER: &str = "CrateDigger_Binaries";
const SEARCH_DEPTH: usize = 5;
const SAMPLE_BASENAME: &str = "crate_sample";

/// Maps a logical tool name to an executable path. A path that does not
/// exist means "not available".
pub trait BinaryResolver: Send + Sync {
    fn resolve(&self, name: &str) -> PathBuf;
}

#[derive(Debug, Clone)]
pub struct BundledBinaries {
    folder: Option<PathBuf>,
}

impl BundledBinaries {
    pub fn new(folder: Option<PathBuf>) -> Self {
        Self { folder }
    }

    /// Use `override_dir` when given, otherwise search around the running
    /// executable.
    pub fn discover(override_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = override_dir {
            debug!(dir = %dir.display(), "using configured binaries folder");
            return Self::new(Some(dir));
        }

        let folder = std::env::current_exe()
            .ok()
            .and_then(|exe| locate_binaries_folder(&exe));

        if folder.is_none() {
            warn!("could not find {} near the executable", BINARIES_FOLDER);
        }
        Self::new(folder)
    }
}

impl BinaryResolver for BundledBinaries {
    fn resolve(&self, name: &str) -> PathBuf {
        let file_name = executable_name(name);
        match &self.folder {
            Some(folder) => folder.join(file_name),
            // Relative to nothing: guaranteed not to exist as an absolute lookup.
            None => PathBuf::from(BINARIES_FOLDER).join(file_name),
        }
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Look for the binaries folder beside `module`, then in up to five
/// ancestor directories.
pub fn locate_binaries_folder(module: &Path) -> Option<PathBuf> {
    let sibling = module.with_file_name(BINARIES_FOLDER);
    if sibling.is_dir() {
        return Some(sibling);
    }

    module
        .ancestors()
        .skip(1)
        .take(SEARCH_DEPTH)
        .map(|dir| dir.join(BINARIES_FOLDER))
        .find(|candidate| candidate.is_dir())
}

/// Fixed output locations for one plugin instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    dir: PathBuf,
    audio_format: String,
}

impl SessionPaths {
    /// Per-instance directory under `temp_root`, so two instances never
    /// share output files.
    pub fn scoped(temp_root: &Path, audio_format: &str) -> Self {
        let dir = temp_root.join(format!("crate-digger-{}", Uuid::new_v4().simple()));
        Self::in_dir(dir, audio_format)
    }

    pub fn in_dir(dir: PathBuf, audio_format: &str) -> Self {
        Self {
            dir,
            audio_format: audio_format.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output template handed to the downloader.
    pub fn intermediate(&self) -> PathBuf {
        self.dir.join(SAMPLE_BASENAME)
    }

    /// File the downloader produces after audio extraction.
    pub fn expected(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", SAMPLE_BASENAME, self.audio_format))
    }

    pub fn capture_log(&self) -> PathBuf {
        self.dir.join(format!("{}.log", SAMPLE_BASENAME))
    }
}
