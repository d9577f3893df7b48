use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rayon::Scope;
use transport::{ConnectionPool, Session};

use crate::summary::Tally;
use crate::{EngineError, EngineResult, LocalEntry};

/// Read buffer used when streaming a local file into `STOR`.
pub(crate) const UPLOAD_BUFFER_SIZE: usize = 256 * 1024;

/// One file to upload.
#[derive(Debug)]
pub(crate) struct Upload {
    local: PathBuf,
    relative: String,
    directory: String,
    name: String,
    modified: SystemTime,
}

impl Upload {
    /// Plans the upload of `local` as `name` inside the absolute remote
    /// `directory`.
    pub(crate) fn new(local: &LocalEntry, directory: &str, name: &str) -> Self {
        let relative = if local.relative_path().is_empty() {
            local.name()
        } else {
            local.relative_path()
        };
        Self {
            local: local.path().to_path_buf(),
            relative: relative.to_owned(),
            directory: directory.to_owned(),
            name: name.to_owned(),
            modified: local.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

/// The shared, thread-safe half of a run that upload workers use.
pub(crate) struct Transfers<'t, S> {
    pool: &'t ConnectionPool<S>,
    tally: &'t Tally,
    aborted: &'t AtomicBool,
}

impl<S> Clone for Transfers<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Transfers<'_, S> {}

impl<'t, S: Session> Transfers<'t, S> {
    pub(crate) const fn new(
        pool: &'t ConnectionPool<S>,
        tally: &'t Tally,
        aborted: &'t AtomicBool,
    ) -> Self {
        Self {
            pool,
            tally,
            aborted,
        }
    }

    pub(crate) const fn tally(&self) -> &'t Tally {
        self.tally
    }

    /// Stops workers from starting uploads that are still queued.
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Leases a connection, positions it, streams the file and stamps its
    /// modification time.
    fn upload(&self, job: &Upload) -> EngineResult<()> {
        let wrap = |source| EngineError::upload(&job.relative, source);

        let mut lease = self.pool.lease();
        let connection = lease.connection().map_err(wrap)?;
        connection.change_directory(&job.directory).map_err(wrap)?;
        let bytes = connection
            .call(|session| {
                let file = File::open(&job.local)?;
                let mut reader = BufReader::with_capacity(UPLOAD_BUFFER_SIZE, file);
                session.write_file(&job.name, &mut reader)
            })
            .map_err(wrap)?;
        connection
            .call(|session| session.set_modified_time(&job.name, job.modified))
            .map_err(wrap)?;
        lease.release();

        self.tally.uploaded(bytes);
        tracing::debug!(
            target: "ftpush::upload",
            path = %job.relative,
            directory = %job.directory,
            bytes,
            "uploaded"
        );
        Ok(())
    }
}

/// Uploads dispatched while reconciling one directory.
///
/// The owning [`Scope`] joins them; failures are collected for the caller to
/// report once the scope has ended.
pub(crate) struct Batch<'s, 't, S> {
    scope: &'s Scope<'t>,
    transfers: Transfers<'t, S>,
    failures: Arc<Mutex<Vec<EngineError>>>,
}

impl<'s, 't, S: Session + 't> Batch<'s, 't, S> {
    pub(crate) const fn new(
        scope: &'s Scope<'t>,
        transfers: Transfers<'t, S>,
        failures: Arc<Mutex<Vec<EngineError>>>,
    ) -> Self {
        Self {
            scope,
            transfers,
            failures,
        }
    }

    /// Queues `job` on the worker pool.
    pub(crate) fn dispatch(&self, job: Upload) {
        let transfers = self.transfers;
        let failures = Arc::clone(&self.failures);
        self.scope.spawn(move |_| {
            if transfers.is_aborted() {
                tracing::debug!(target: "ftpush::upload", path = %job.relative, "skipped after failure");
                return;
            }
            if let Err(error) = transfers.upload(&job) {
                transfers.abort();
                failures
                    .lock()
                    .expect("upload failure list mutex poisoned")
                    .push(error);
            }
        });
    }
}
