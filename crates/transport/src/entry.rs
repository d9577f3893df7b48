use std::time::SystemTime;

/// Kind of object a remote listing reports.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link; never followed.
    Link,
}

impl EntryKind {
    /// Returns a lowercase label suitable for log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Link => "link",
        }
    }
}

/// One object returned by a remote directory listing or lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteEntry {
    name: String,
    kind: EntryKind,
    modified: Option<SystemTime>,
    full_path: String,
}

impl RemoteEntry {
    /// Creates an entry.
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        modified: Option<SystemTime>,
        full_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            modified,
            full_path: full_path.into(),
        }
    }

    /// Returns the final path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Returns the modification time the server reported, if any.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Returns the absolute remote path.
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Shorthand for `kind() == EntryKind::Directory`.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Shorthand for `kind() == EntryKind::File`.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Shorthand for `kind() == EntryKind::Link`.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.kind == EntryKind::Link
    }
}
