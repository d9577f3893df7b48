use transport::{RemoteEntry, Session};

use super::{Pass, excluded};
use crate::{EngineError, EngineResult, ItemAction, RemotePath, Reporter, SyncEvent};

impl<'t, S, R> Pass<'t, S, R>
where
    S: Session + 't,
    R: Reporter + ?Sized,
{
    /// Removes `entry` from the directory `parent`, whatever its kind.
    ///
    /// Returns `false` when a directory had to be retained because excluded
    /// entries remain inside it.
    pub(super) fn delete_any(
        &mut self,
        parent: &RemotePath,
        entry: &RemoteEntry,
        depth: usize,
    ) -> EngineResult<bool> {
        if entry.is_directory() {
            self.delete_directory(parent, entry, depth)
        } else {
            self.delete_file(parent, entry, depth)?;
            Ok(true)
        }
    }

    /// Deletes a file or link. Links are removed, never followed.
    pub(super) fn delete_file(
        &mut self,
        parent: &RemotePath,
        entry: &RemoteEntry,
        depth: usize,
    ) -> EngineResult<()> {
        self.emit(SyncEvent::new(depth, ItemAction::Delete, entry.name()));
        self.enter(parent.absolute())?;
        let name = entry.name();
        self.main
            .call(|session| session.delete_file(name))
            .map_err(|error| {
                EngineError::remote("delete", parent.child(name).absolute(), error)
            })?;
        self.transfers.tally().deleted();
        Ok(())
    }

    /// Deletes a directory bottom-up.
    ///
    /// Excluded descendants are left in place together with every ancestor
    /// directory that still contains them. Returns `true` when the directory
    /// itself was removed.
    pub(super) fn delete_directory(
        &mut self,
        parent: &RemotePath,
        entry: &RemoteEntry,
        depth: usize,
    ) -> EngineResult<bool> {
        self.emit(SyncEvent::new(depth, ItemAction::Delete, entry.name()));
        let path = parent.child(entry.name());
        let children = self.list(&path)?;

        let mut remains = false;
        for child in &children {
            let child_path = path.child(child.name());
            if let Some(rule) = self.exclusions.matches(child_path.relative()) {
                self.emit(
                    SyncEvent::new(depth + 1, ItemAction::Skip, child.name())
                        .with_reason(excluded(rule)),
                );
                remains = true;
                continue;
            }
            if !self.delete_any(&path, child, depth + 1)? {
                remains = true;
            }
        }

        if remains {
            tracing::debug!(
                target: "ftpush::engine",
                remote = path.absolute(),
                "directory retained"
            );
            self.emit_retained(
                SyncEvent::new(depth, ItemAction::Skip, entry.name())
                    .with_reason("retained, excluded items remain"),
            );
            return Ok(false);
        }

        self.enter(parent.absolute())?;
        let name = entry.name();
        self.main
            .call(|session| session.remove_directory(name))
            .map_err(|error| EngineError::remote("remove directory", path.absolute(), error))?;
        self.transfers.tally().deleted();
        Ok(true)
    }
}
