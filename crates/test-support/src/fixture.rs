use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use filetime::FileTime;
use tempfile::TempDir;

/// Returns the instant `minutes` whole minutes after a fixed 2024 base.
///
/// Using whole minutes keeps fixtures clear of the minute-granularity
/// comparison boundary.
#[must_use]
pub fn minute(minutes: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_704_067_200 + minutes * 60)
}

/// A temporary local directory tree removed on drop.
#[derive(Debug)]
pub struct LocalTree {
    dir: TempDir,
}

impl LocalTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temporary directory"),
        }
    }

    /// Returns the tree root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolves a `/`-separated relative path inside the tree.
    #[must_use]
    pub fn join(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.dir.path().to_path_buf(), |path, segment| path.join(segment))
    }

    /// Creates a directory and any missing parents.
    pub fn dir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.join(relative)).expect("create directory");
        self
    }

    /// Writes a file, creating parents, and pins its modification time.
    pub fn file(&self, relative: &str, contents: &[u8], modified: SystemTime) -> &Self {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write file");
        filetime::set_file_mtime(&path, FileTime::from_system_time(modified))
            .expect("set modification time");
        self
    }

    /// Removes a file or a whole directory.
    pub fn remove(&self, relative: &str) -> &Self {
        let path = self.join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("remove directory");
        } else {
            fs::remove_file(path).expect("remove file");
        }
        self
    }
}

impl Default for LocalTree {
    fn default() -> Self {
        Self::new()
    }
}
