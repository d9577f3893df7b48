//! The recursive reconciliation pass.
//!
//! Directory traversal is single-threaded and runs on the control
//! connection. File uploads are handed to a rayon pool whose size matches the
//! connection pool, and each directory is a scope: its uploads are joined
//! before its unmatched remote entries are swept, so a delete can never race
//! an upload of the same name.

mod delete;
mod reconcile;
mod upload;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use filters::{ExclusionRule, ExclusionSet};
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use transport::{
    Capability, Connection, ConnectionPool, RemoteEntry, RetryPolicy, Session, SessionResult,
};

use crate::summary::Tally;
use crate::{
    EngineError, EngineResult, ItemAction, LocalEntry, RemotePath, Reporter, SyncEvent,
    SyncSummary,
};

use self::upload::{Batch, Transfers};

/// Inputs of one synchronization run.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    local_root: PathBuf,
    remote_root: String,
    exclusions: ExclusionSet,
    parallelism: NonZeroUsize,
    retry: RetryPolicy,
}

impl SyncSettings {
    /// Background connections used when none is configured.
    pub const DEFAULT_PARALLELISM: NonZeroUsize = NonZeroUsize::MIN.saturating_add(4);

    /// Creates settings mirroring `local_root` onto `remote_root`.
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            exclusions: ExclusionSet::default(),
            parallelism: Self::DEFAULT_PARALLELISM,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the exclusion rules.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Sets the number of background upload connections.
    #[must_use]
    pub const fn with_parallelism(mut self, parallelism: NonZeroUsize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the retry policy applied to every protocol call.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the local root.
    #[must_use]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Returns the remote root.
    #[must_use]
    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Returns the exclusion rules.
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Returns the number of background upload connections.
    #[must_use]
    pub const fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

/// Opens the sessions a run needs, runs it, and tears everything down.
///
/// `factory` must return connected sessions. It is called once for the
/// control session and lazily for each of the `parallelism` upload slots.
///
/// # Errors
///
/// Returns the first failure that aborted the run. When the run succeeds, a
/// failure to dispose of the upload pool is returned instead.
pub fn synchronize<S, F, R>(
    settings: &SyncSettings,
    factory: F,
    reporter: &R,
) -> EngineResult<SyncSummary>
where
    S: Session + 'static,
    F: Fn() -> SessionResult<S> + Send + Sync + 'static,
    R: Reporter + ?Sized,
{
    let workers = upload_workers(settings.parallelism)?;
    let factory = Arc::new(factory);
    let main = (*factory)().map_err(EngineError::connect)?;
    let pool = ConnectionPool::new(
        {
            let factory = Arc::clone(&factory);
            move || (*factory)()
        },
        settings.parallelism,
        settings.retry,
    );

    let mut engine = SyncEngine::assemble(
        Connection::new(main, settings.retry),
        &pool,
        settings.exclusions.clone(),
        workers,
    );
    let outcome = engine.run(&settings.local_root, &settings.remote_root, reporter);
    if let Err(error) = engine.into_connection().close() {
        tracing::debug!(target: "ftpush::engine", error = %error, "closing control session failed");
    }

    let disposed = pool.dispose();
    let summary = outcome?;
    disposed?;
    Ok(summary)
}

/// Mirrors a local tree onto the server through one control connection and
/// a pool of upload connections.
pub struct SyncEngine<'p, S: Session> {
    main: Connection<S>,
    pool: &'p ConnectionPool<S>,
    exclusions: ExclusionSet,
    workers: ThreadPool,
}

impl<'p, S: Session> SyncEngine<'p, S> {
    /// Creates an engine with one upload worker per pool slot.
    ///
    /// # Errors
    ///
    /// Fails when the worker threads cannot be spawned.
    pub fn new(
        main: Connection<S>,
        pool: &'p ConnectionPool<S>,
        exclusions: ExclusionSet,
    ) -> EngineResult<Self> {
        let capacity = NonZeroUsize::new(pool.capacity()).unwrap_or(NonZeroUsize::MIN);
        let workers = upload_workers(capacity)?;
        Ok(Self::assemble(main, pool, exclusions, workers))
    }

    const fn assemble(
        main: Connection<S>,
        pool: &'p ConnectionPool<S>,
        exclusions: ExclusionSet,
        workers: ThreadPool,
    ) -> Self {
        Self {
            main,
            pool,
            exclusions,
            workers,
        }
    }

    /// Mirrors `local_root` onto `remote_root`, reporting every decision.
    ///
    /// # Errors
    ///
    /// Aborts on the first failure that survives the retry policy. The
    /// server may be left partially synchronized; running again converges.
    pub fn run<R>(
        &mut self,
        local_root: &Path,
        remote_root: &str,
        reporter: &R,
    ) -> EngineResult<SyncSummary>
    where
        R: Reporter + ?Sized,
    {
        let tally = Tally::default();
        let aborted = AtomicBool::new(false);
        let mut pass = Pass {
            main: &mut self.main,
            exclusions: &self.exclusions,
            workers: &self.workers,
            transfers: Transfers::new(self.pool, &tally, &aborted),
            reporter,
        };
        tracing::info!(
            target: "ftpush::engine",
            local = %local_root.display(),
            remote = remote_root,
            "synchronization started"
        );
        pass.run(local_root, remote_root)?;
        let summary = tally.snapshot();
        tracing::info!(target: "ftpush::engine", %summary, "synchronization finished");
        Ok(summary)
    }

    /// Returns the control connection.
    pub fn into_connection(self) -> Connection<S> {
        self.main
    }
}

/// Spawns one upload worker per pool slot. Runs before any session is
/// opened so a spawn failure leaves nothing to tear down.
fn upload_workers(count: NonZeroUsize) -> EngineResult<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(count.get())
        .thread_name(|index| format!("ftpush-upload-{index}"))
        .build()?)
}

/// State of one run: the control connection, the rules, and the upload side.
struct Pass<'t, S: Session, R: Reporter + ?Sized> {
    main: &'t mut Connection<S>,
    exclusions: &'t ExclusionSet,
    workers: &'t ThreadPool,
    transfers: Transfers<'t, S>,
    reporter: &'t R,
}

impl<'t, S, R> Pass<'t, S, R>
where
    S: Session + 't,
    R: Reporter + ?Sized,
{
    fn run(&mut self, local_root: &Path, remote_root: &str) -> EngineResult<()> {
        let local = LocalEntry::root(local_root)?;
        let target = RemotePath::root(remote_root);
        let exists = self
            .main
            .try_change_directory(target.absolute())
            .map_err(|error| EngineError::remote("open directory", target.absolute(), error))?;
        tracing::debug!(
            target: "ftpush::engine",
            remote = target.absolute(),
            exists,
            "probed remote root"
        );

        match (local.is_directory(), exists) {
            (false, false) => self.push_root_file(&local, &target),
            (true, false) => self.push_root_directory(&local, &target),
            (false, true) => self.reconcile(0, vec![local], &target, false),
            (true, true) => {
                self.emit(SyncEvent::new(0, ItemAction::Synchronize, local.name()));
                self.synchronize_directory(&local, &target)
            }
        }
    }

    fn push_root_file(&mut self, local: &LocalEntry, target: &RemotePath) -> EngineResult<()> {
        self.emit(SyncEvent::new(0, ItemAction::Add, local.name()));
        let job = upload::Upload::new(local, target.parent_absolute(), target.name());
        self.in_batch(|_, batch| {
            batch.dispatch(job);
            Ok(())
        })
    }

    fn push_root_directory(&mut self, local: &LocalEntry, target: &RemotePath) -> EngineResult<()> {
        let path = target.absolute();
        let supported = self
            .main
            .call(|session| session.has_capability(Capability::ObjectInfo))
            .map_err(|error| EngineError::remote("query features of", path, error))?;
        if supported {
            let existing = self
                .main
                .call(|session| session.object_info(path))
                .map_err(|error| EngineError::remote("inspect", path, error))?;
            if let Some(existing) = existing.filter(|entry| !entry.is_directory()) {
                let parent = RemotePath::root(target.parent_absolute());
                self.delete_file(&parent, &existing, 0)?;
            }
        }
        self.emit(SyncEvent::new(0, ItemAction::Add, local.name()));
        self.push_directory(local, target)
    }

    /// Runs `body` with a fresh upload batch and joins every upload it
    /// dispatched before returning.
    fn in_batch<F>(&mut self, body: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Self, &Batch<'_, 't, S>) -> EngineResult<()>,
    {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let transfers = self.transfers;
        let workers = self.workers;
        let traversal = workers.in_place_scope(|scope: &Scope<'t>| {
            let batch = Batch::new(scope, transfers, Arc::clone(&failures));
            let result = body(self, &batch);
            if result.is_err() {
                transfers.abort();
            }
            result
        });
        traversal?;

        let first = failures
            .lock()
            .expect("upload failure list mutex poisoned")
            .drain(..)
            .next();
        first.map_or(Ok(()), Err)
    }

    fn emit(&self, event: SyncEvent) {
        self.transfers.tally().record(event.action);
        self.reporter.report(&event);
    }

    fn emit_retained(&self, event: SyncEvent) {
        self.transfers.tally().retained();
        self.reporter.report(&event);
    }

    fn enter(&mut self, directory: &str) -> EngineResult<()> {
        self.main
            .change_directory(directory)
            .map_err(|error| EngineError::remote("enter", directory, error))
    }

    fn list(&mut self, directory: &RemotePath) -> EngineResult<Vec<RemoteEntry>> {
        self.enter(directory.absolute())?;
        self.main
            .call(|session| session.list_directory(None))
            .map_err(|error| EngineError::remote("list", directory.absolute(), error))
    }

    fn create_directory(&mut self, target: &RemotePath) -> EngineResult<()> {
        self.enter(target.parent_absolute())?;
        let name = target.name();
        self.main
            .call(|session| session.create_directory(name))
            .map_err(|error| EngineError::remote("create directory", target.absolute(), error))?;
        self.transfers.tally().directory_created();
        Ok(())
    }
}

fn excluded(rule: &ExclusionRule) -> String {
    format!("excluded ({})", rule.pattern())
}
