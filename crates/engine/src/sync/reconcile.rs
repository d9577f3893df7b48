use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use transport::{EntryKind, RemoteEntry, Session};

use super::upload::{Batch, Upload};
use super::{Pass, excluded};
use crate::{EngineResult, ItemAction, LocalEntry, LocalKind, RemotePath, Reporter, SyncEvent};

/// One directory listing, indexed by case-folded name, with a record of
/// which entries have been claimed by a local counterpart or an exclusion.
struct Listing {
    entries: Vec<RemoteEntry>,
    by_name: HashMap<String, Vec<usize>>,
    found: Vec<bool>,
}

impl Listing {
    fn new(entries: Vec<RemoteEntry>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            by_name
                .entry(entry.name().to_lowercase())
                .or_default()
                .push(index);
        }
        let found = vec![false; entries.len()];
        Self {
            entries,
            by_name,
            found,
        }
    }

    /// Finds the entry for `name`, preferring an exact-case match.
    fn find(&self, name: &str) -> Option<usize> {
        let candidates = self.by_name.get(&name.to_lowercase())?;
        candidates
            .iter()
            .copied()
            .find(|&index| self.entries[index].name() == name)
            .or_else(|| candidates.first().copied())
    }

    fn claim(&mut self, index: usize) -> &RemoteEntry {
        self.found[index] = true;
        &self.entries[index]
    }

    fn unclaimed(&self) -> impl Iterator<Item = &RemoteEntry> {
        self.entries
            .iter()
            .zip(&self.found)
            .filter(|(_, found)| !**found)
            .map(|(entry, _)| entry)
    }
}

/// Whole minutes since the Unix epoch, rounded down.
pub(crate) fn epoch_minute(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs() / 60).unwrap_or(i64::MAX),
        Err(before) => {
            let before = before.duration();
            let seconds = before.as_secs() + u64::from(before.subsec_nanos() > 0);
            -i64::try_from(seconds.div_ceil(60)).unwrap_or(i64::MAX)
        }
    }
}

/// Reports whether two timestamps fall in the same minute. An unknown remote
/// time never matches.
pub(crate) fn same_minute(remote: Option<SystemTime>, local: SystemTime) -> bool {
    remote.is_some_and(|remote| epoch_minute(remote) == epoch_minute(local))
}

impl<'t, S, R> Pass<'t, S, R>
where
    S: Session + 't,
    R: Reporter + ?Sized,
{
    /// Reconciles the local directory `local` with the existing remote
    /// directory `remote`, including the sweep of unmatched remote entries.
    pub(super) fn synchronize_directory(
        &mut self,
        local: &LocalEntry,
        remote: &RemotePath,
    ) -> EngineResult<()> {
        let children = local.children()?;
        self.reconcile(local.depth() + 1, children, remote, true)
    }

    /// Reconciles `children` (all at `depth`) against a single listing of
    /// `remote`. Uploads are joined before unmatched entries are swept.
    pub(super) fn reconcile(
        &mut self,
        depth: usize,
        children: Vec<LocalEntry>,
        remote: &RemotePath,
        sweep: bool,
    ) -> EngineResult<()> {
        let mut listing = Listing::new(self.list(remote)?);
        tracing::trace!(
            target: "ftpush::engine",
            remote = remote.absolute(),
            local = children.len(),
            listed = listing.entries.len(),
            "reconciling directory"
        );

        self.in_batch(|pass, batch| {
            for child in &children {
                pass.reconcile_child(batch, child, remote, &mut listing)?;
            }
            Ok(())
        })?;

        if sweep {
            for entry in listing.unclaimed() {
                let path = remote.child(entry.name());
                if let Some(rule) = self.exclusions.matches(path.relative()) {
                    self.emit(
                        SyncEvent::new(depth, ItemAction::Skip, entry.name())
                            .with_reason(excluded(rule)),
                    );
                    continue;
                }
                self.delete_any(remote, entry, depth)?;
            }
        }
        Ok(())
    }

    fn reconcile_child(
        &mut self,
        batch: &Batch<'_, 't, S>,
        child: &LocalEntry,
        remote: &RemotePath,
        listing: &mut Listing,
    ) -> EngineResult<()> {
        let depth = child.depth();
        let matched = listing.find(child.name());

        if let Some(rule) = self.exclusions.matches(child.relative_path()) {
            if let Some(index) = matched {
                listing.claim(index);
            }
            self.emit(
                SyncEvent::new(depth, ItemAction::Skip, child.name()).with_reason(excluded(rule)),
            );
            return Ok(());
        }

        let Some(index) = matched else {
            self.emit(SyncEvent::new(depth, ItemAction::Add, child.name()));
            return self.push_any(batch, child, remote);
        };
        let existing = listing.claim(index).clone();

        match (child.kind(), existing.kind()) {
            (LocalKind::Directory, EntryKind::Directory) => {
                self.emit(SyncEvent::new(depth, ItemAction::Synchronize, child.name()));
                self.synchronize_directory(child, &remote.child(existing.name()))
            }
            (LocalKind::Directory, EntryKind::File | EntryKind::Link) => {
                self.delete_file(remote, &existing, depth)?;
                self.emit(SyncEvent::new(depth, ItemAction::Add, child.name()));
                self.push_directory(child, &remote.child(child.name()))
            }
            (LocalKind::File { .. }, EntryKind::Directory) => {
                if self.delete_directory(remote, &existing, depth)? {
                    self.emit(SyncEvent::new(depth, ItemAction::Replace, child.name()));
                    batch.dispatch(Upload::new(child, remote.absolute(), child.name()));
                } else {
                    self.emit(
                        SyncEvent::new(depth, ItemAction::Skip, child.name())
                            .with_reason("remote directory retained"),
                    );
                }
                Ok(())
            }
            (LocalKind::File { .. }, EntryKind::Link) => {
                self.delete_file(remote, &existing, depth)?;
                self.emit(
                    SyncEvent::new(depth, ItemAction::Replace, child.name())
                        .with_reason("remote is a link"),
                );
                batch.dispatch(Upload::new(child, remote.absolute(), child.name()));
                Ok(())
            }
            (LocalKind::File { modified, .. }, EntryKind::File) => {
                if same_minute(existing.modified(), modified) {
                    self.emit(SyncEvent::new(depth, ItemAction::Skip, child.name()));
                } else {
                    self.emit(SyncEvent::new(depth, ItemAction::Replace, child.name()));
                    batch.dispatch(Upload::new(child, remote.absolute(), existing.name()));
                }
                Ok(())
            }
        }
    }

    /// Creates `child` under `parent`: directories synchronously, files by
    /// queueing an upload on `batch`.
    fn push_any(
        &mut self,
        batch: &Batch<'_, 't, S>,
        child: &LocalEntry,
        parent: &RemotePath,
    ) -> EngineResult<()> {
        if child.is_directory() {
            self.push_directory(child, &parent.child(child.name()))
        } else {
            batch.dispatch(Upload::new(child, parent.absolute(), child.name()));
            Ok(())
        }
    }

    /// Creates the remote directory `target` and pushes the whole local
    /// subtree into it.
    pub(super) fn push_directory(
        &mut self,
        local: &LocalEntry,
        target: &RemotePath,
    ) -> EngineResult<()> {
        self.create_directory(target)?;
        let children = local.children()?;
        self.in_batch(|pass, batch| {
            for child in &children {
                if let Some(rule) = pass.exclusions.matches(child.relative_path()) {
                    pass.emit(
                        SyncEvent::new(child.depth(), ItemAction::Skip, child.name())
                            .with_reason(excluded(rule)),
                    );
                    continue;
                }
                pass.emit(SyncEvent::new(child.depth(), ItemAction::Add, child.name()));
                pass.push_any(batch, child, target)?;
            }
            Ok(())
        })
    }
}
