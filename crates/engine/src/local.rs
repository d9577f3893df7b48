//! Snapshot of the local source tree, read one directory at a time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{EngineError, EngineResult};

/// Kind-specific data of a [`LocalEntry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LocalKind {
    /// A regular file.
    File {
        /// Last modification time.
        modified: SystemTime,
        /// Size in bytes.
        len: u64,
    },
    /// A directory.
    Directory,
}

/// A local file or directory found while walking the source tree.
///
/// Entries are produced fresh by [`LocalEntry::children`]; nothing is cached
/// between calls. Symbolic links are followed, so a link to a directory is a
/// directory and a link to a file is a file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalEntry {
    name: String,
    relative_path: String,
    depth: usize,
    path: PathBuf,
    kind: LocalKind,
}

impl LocalEntry {
    /// Describes the synchronization root at `path`.
    ///
    /// The root has depth 0 and an empty relative path.
    ///
    /// # Errors
    ///
    /// Fails when `path` cannot be inspected or its final component is not
    /// valid UTF-8.
    pub fn root(path: &Path) -> EngineResult<Self> {
        let metadata =
            fs::metadata(path).map_err(|error| EngineError::local("inspect", path, error))?;
        let resolved = match path.file_name() {
            Some(_) => path.to_path_buf(),
            None => fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
        };
        let name = match resolved.file_name() {
            Some(name) => name
                .to_str()
                .ok_or_else(|| EngineError::non_utf8(path.to_path_buf()))?
                .to_owned(),
            None => String::new(),
        };
        Ok(Self {
            name,
            relative_path: String::new(),
            depth: 0,
            path: path.to_path_buf(),
            kind: kind_of(&metadata),
        })
    }

    /// Reads the immediate children of this directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Fails when the directory or a child cannot be read, or a child name is
    /// not valid UTF-8.
    pub fn children(&self) -> EngineResult<Vec<Self>> {
        let entries = fs::read_dir(&self.path)
            .map_err(|error| EngineError::local("read directory", &self.path, error))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|error| EngineError::local("read directory", &self.path, error))?;
            let path = entry.path();
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| EngineError::non_utf8(path.clone()))?;
            let metadata =
                fs::metadata(&path).map_err(|error| EngineError::local("inspect", &path, error))?;
            let relative_path = if self.relative_path.is_empty() {
                name.clone()
            } else {
                format!("{}/{name}", self.relative_path)
            };
            children.push(Self {
                name,
                relative_path,
                depth: self.depth + 1,
                path,
                kind: kind_of(&metadata),
            });
        }
        children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// Returns the final path component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `/`-separated path relative to the synchronization root.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Returns the nesting depth; the root is 0.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the path on the local file system.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the kind-specific data.
    #[must_use]
    pub const fn kind(&self) -> LocalKind {
        self.kind
    }

    /// Reports whether this entry is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, LocalKind::Directory)
    }

    /// Returns the modification time of a file.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        match self.kind {
            LocalKind::File { modified, .. } => Some(modified),
            LocalKind::Directory => None,
        }
    }
}

fn kind_of(metadata: &fs::Metadata) -> LocalKind {
    if metadata.is_dir() {
        LocalKind::Directory
    } else {
        LocalKind::File {
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            len: metadata.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use filetime::FileTime;

    use super::*;

    #[test]
    fn children_carry_relative_paths_and_depth() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("b/c")).unwrap();
        fs::write(temp.path().join("a.txt"), b"hello").unwrap();
        fs::write(temp.path().join("b/c/d.txt"), b"").unwrap();
        let stamp = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        filetime::set_file_mtime(temp.path().join("a.txt"), FileTime::from_system_time(stamp))
            .unwrap();

        let root = LocalEntry::root(temp.path()).unwrap();
        assert_eq!(root.depth(), 0);
        assert_eq!(root.relative_path(), "");
        assert!(root.is_directory());

        let children = root.children().unwrap();
        let names: Vec<_> = children.iter().map(LocalEntry::name).collect();
        assert_eq!(names, ["a.txt", "b"]);
        assert_eq!(
            children[0].kind(),
            LocalKind::File {
                modified: stamp,
                len: 5
            }
        );

        let c = &children[1].children().unwrap()[0];
        assert_eq!(c.relative_path(), "b/c");
        assert_eq!(c.depth(), 2);
        let d = &c.children().unwrap()[0];
        assert_eq!(d.relative_path(), "b/c/d.txt");
        assert_eq!(d.depth(), 3);
        assert!(d.modified().is_some());
    }

    #[test]
    fn file_root_has_its_own_name() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("index.html");
        fs::write(&file, b"<html/>").unwrap();

        let root = LocalEntry::root(&file).unwrap();
        assert_eq!(root.name(), "index.html");
        assert!(!root.is_directory());
    }

    #[test]
    fn missing_root_is_a_local_error() {
        let temp = tempfile::tempdir().unwrap();
        let error = LocalEntry::root(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(error.kind(), crate::EngineErrorKind::Local { .. }));
    }
}
