//! Error type returned by a synchronization run.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use transport::{PoolError, SessionError};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error produced when a synchronization run aborts.
///
/// Every variant keeps enough context (remote path, local path, or the file
/// being uploaded) to tell the operator where the run stopped.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct EngineError {
    kind: EngineErrorKind,
}

/// Classification of an [`EngineError`].
#[derive(Debug, Error)]
pub enum EngineErrorKind {
    /// The control session could not be opened.
    #[error("failed to open FTP session: {source}")]
    Connect {
        /// Underlying session failure.
        #[source]
        source: SessionError,
    },
    /// A protocol operation on the control session failed.
    #[error("failed to {action} '{path}': {source}")]
    Remote {
        /// Short description of the attempted operation.
        action: &'static str,
        /// Absolute remote path.
        path: String,
        /// Underlying session failure.
        #[source]
        source: SessionError,
    },
    /// A background upload failed.
    #[error("failed to upload '{path}': {source}")]
    Upload {
        /// Path of the file relative to the local root.
        path: String,
        /// Underlying session failure.
        #[source]
        source: SessionError,
    },
    /// Reading the local tree failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Local {
        /// Short description of the attempted operation.
        action: &'static str,
        /// Local path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A local name cannot be represented on the server.
    #[error("file name is not valid UTF-8: {}", path.display())]
    NonUtf8Name {
        /// Offending local path.
        path: PathBuf,
    },
    /// The upload worker pool could not be started.
    #[error("failed to start upload workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
    /// Tearing down the connection pool failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl EngineError {
    const fn new(kind: EngineErrorKind) -> Self {
        Self { kind }
    }

    pub(crate) const fn connect(source: SessionError) -> Self {
        Self::new(EngineErrorKind::Connect { source })
    }

    pub(crate) fn remote(action: &'static str, path: &str, source: SessionError) -> Self {
        Self::new(EngineErrorKind::Remote {
            action,
            path: path.to_owned(),
            source,
        })
    }

    pub(crate) fn upload(path: &str, source: SessionError) -> Self {
        Self::new(EngineErrorKind::Upload {
            path: path.to_owned(),
            source,
        })
    }

    pub(crate) fn local(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::new(EngineErrorKind::Local {
            action,
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn non_utf8(path: PathBuf) -> Self {
        Self::new(EngineErrorKind::NonUtf8Name { path })
    }

    /// Provides access to the underlying error kind.
    #[must_use]
    pub const fn kind(&self) -> &EngineErrorKind {
        &self.kind
    }

    /// Consumes the error and returns its kind.
    #[must_use]
    pub fn into_kind(self) -> EngineErrorKind {
        self.kind
    }

    /// Returns the session failure behind this error, if any.
    #[must_use]
    pub const fn session_error(&self) -> Option<&SessionError> {
        match &self.kind {
            EngineErrorKind::Connect { source }
            | EngineErrorKind::Remote { source, .. }
            | EngineErrorKind::Upload { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the FTP reply code that caused the failure, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u32> {
        self.session_error().and_then(SessionError::code)
    }
}

impl From<rayon::ThreadPoolBuildError> for EngineError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        Self::new(EngineErrorKind::Workers(error))
    }
}

impl From<PoolError> for EngineError {
    fn from(error: PoolError) -> Self {
        Self::new(EngineErrorKind::Pool(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_errors_name_the_relative_path_and_status() {
        let error = EngineError::upload("site/a.txt", SessionError::status(553, "denied"));
        assert_eq!(error.to_string(), "failed to upload 'site/a.txt': 553 denied");
        assert_eq!(error.status_code(), Some(553));
    }

    #[test]
    fn local_errors_carry_no_status() {
        let error = EngineError::local(
            "read directory",
            Path::new("/src"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(error.to_string().starts_with("failed to read directory /src"));
        assert_eq!(error.status_code(), None);
        assert!(matches!(error.kind(), EngineErrorKind::Local { .. }));
    }
}
