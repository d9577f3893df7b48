use crate::error::status;
use crate::retry::ROOT;
use crate::{RetryPolicy, Session, SessionResult};

/// A session paired with the working directory it was last moved into.
///
/// The cache lets repeated operations in one directory skip redundant `CWD`
/// round trips. It is only trusted while the session reports itself
/// connected; a reconnect returns the server to its login directory, so an
/// unconnected session always gets an explicit directory change.
///
/// Every call goes through the connection's [`RetryPolicy`].
#[derive(Debug)]
pub struct Connection<S> {
    session: S,
    working_directory: Option<String>,
    retry: RetryPolicy,
}

impl<S: Session> Connection<S> {
    /// Wraps an established session.
    pub const fn new(session: S, retry: RetryPolicy) -> Self {
        Self {
            session,
            working_directory: None,
            retry,
        }
    }

    /// Moves the session into the absolute directory `path`.
    ///
    /// Nothing is sent when the cache already names `path` and the session is
    /// connected.
    ///
    /// # Errors
    ///
    /// Propagates the directory-change failure once the retry policy gives up.
    /// The cache is left empty on failure.
    pub fn change_directory(&mut self, path: &str) -> SessionResult<()> {
        if self.working_directory.as_deref() == Some(path) && self.session.is_connected() {
            return Ok(());
        }
        self.working_directory = None;
        self.retry
            .call(&mut self.session, ROOT, |session| session.change_working_directory(path))?;
        tracing::trace!(target: "ftpush::session", directory = path, "changed working directory");
        self.working_directory = Some(path.to_owned());
        Ok(())
    }

    /// Moves into `path` if it exists as a directory.
    ///
    /// A `550` reply means the directory does not exist and yields
    /// `Ok(false)` without retrying; the cache is then left empty.
    ///
    /// # Errors
    ///
    /// Propagates any other failure once the retry policy gives up.
    pub fn try_change_directory(&mut self, path: &str) -> SessionResult<bool> {
        if self.working_directory.as_deref() == Some(path) && self.session.is_connected() {
            return Ok(true);
        }
        self.working_directory = None;
        let entered = self.retry.call(&mut self.session, ROOT, |session| {
            match session.change_working_directory(path) {
                Ok(()) => Ok(true),
                Err(error) if error.has_code(status::FILE_UNAVAILABLE) => Ok(false),
                Err(error) => Err(error),
            }
        })?;
        if entered {
            self.working_directory = Some(path.to_owned());
        }
        Ok(entered)
    }

    /// Runs `operation` under the retry policy, restoring the cached working
    /// directory after any reconnect.
    ///
    /// # Errors
    ///
    /// Propagates the operation's failure once the retry policy gives up.
    pub fn call<T, F>(&mut self, operation: F) -> SessionResult<T>
    where
        F: FnMut(&mut S) -> SessionResult<T>,
    {
        let directory = self.working_directory.as_deref().unwrap_or(ROOT);
        self.retry.call(&mut self.session, directory, operation)
    }

    /// Returns the directory the session was last moved into.
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// Returns the retry policy applied to every call.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Borrows the underlying session.
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Logs out and closes the session.
    ///
    /// # Errors
    ///
    /// Returns the session's close failure.
    pub fn close(mut self) -> SessionResult<()> {
        self.session.close()
    }
}
