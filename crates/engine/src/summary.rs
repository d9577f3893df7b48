use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ItemAction;

/// Totals for one synchronization run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SyncSummary {
    added: u64,
    replaced: u64,
    deleted: u64,
    skipped: u64,
    retained: u64,
    directories_created: u64,
    files_uploaded: u64,
    bytes_uploaded: u64,
}

impl SyncSummary {
    /// Entries created on the server.
    #[must_use]
    pub const fn added(&self) -> u64 {
        self.added
    }

    /// Remote entries overwritten.
    #[must_use]
    pub const fn replaced(&self) -> u64 {
        self.replaced
    }

    /// Remote files and directories removed.
    #[must_use]
    pub const fn deleted(&self) -> u64 {
        self.deleted
    }

    /// Entries left alone because they were excluded or already current.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Remote directories kept because excluded entries remain inside them.
    #[must_use]
    pub const fn retained(&self) -> u64 {
        self.retained
    }

    /// Remote directories created.
    #[must_use]
    pub const fn directories_created(&self) -> u64 {
        self.directories_created
    }

    /// Files uploaded.
    #[must_use]
    pub const fn files_uploaded(&self) -> u64 {
        self.files_uploaded
    }

    /// Bytes uploaded.
    #[must_use]
    pub const fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Number of add, replace and delete actions.
    #[must_use]
    pub const fn changes(&self) -> u64 {
        self.added + self.replaced + self.deleted
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} replaced, {} deleted, {} skipped",
            self.added, self.replaced, self.deleted, self.skipped
        )?;
        if self.retained > 0 {
            write!(f, ", {} retained", self.retained)?;
        }
        write!(
            f,
            "; {} files ({} bytes) uploaded",
            self.files_uploaded, self.bytes_uploaded
        )
    }
}

/// Counters shared between the traversal and the upload workers.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    added: AtomicU64,
    replaced: AtomicU64,
    deleted: AtomicU64,
    skipped: AtomicU64,
    retained: AtomicU64,
    directories_created: AtomicU64,
    files_uploaded: AtomicU64,
    bytes_uploaded: AtomicU64,
}

impl Tally {
    pub(crate) fn record(&self, action: ItemAction) {
        let counter = match action {
            ItemAction::Add => &self.added,
            ItemAction::Replace => &self.replaced,
            ItemAction::Skip => &self.skipped,
            ItemAction::Delete | ItemAction::Synchronize => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn retained(&self) {
        self.retained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn directory_created(&self) {
        self.directories_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn uploaded(&self, bytes: u64) {
        self.files_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SyncSummary {
        SyncSummary {
            added: self.added.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            retained: self.retained.load(Ordering::Relaxed),
            directories_created: self.directories_created.load(Ordering::Relaxed),
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_actions_not_synchronize() {
        let tally = Tally::default();
        tally.record(ItemAction::Add);
        tally.record(ItemAction::Add);
        tally.record(ItemAction::Synchronize);
        tally.record(ItemAction::Delete);
        tally.deleted();
        tally.uploaded(10);
        let summary = tally.snapshot();
        assert_eq!(summary.added(), 2);
        assert_eq!(summary.deleted(), 1);
        assert_eq!(summary.changes(), 3);
        assert_eq!(summary.bytes_uploaded(), 10);
    }

    #[test]
    fn display_mentions_retained_only_when_present() {
        let summary = SyncSummary {
            added: 1,
            files_uploaded: 1,
            bytes_uploaded: 4,
            ..SyncSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "1 added, 0 replaced, 0 deleted, 0 skipped; 1 files (4 bytes) uploaded"
        );
        let retained = SyncSummary {
            retained: 2,
            ..SyncSummary::default()
        };
        assert!(retained.to_string().contains("2 retained"));
    }
}
