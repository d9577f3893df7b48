use std::fmt;
use std::io;

use thiserror::Error;

/// Result alias used by every [`Session`](crate::Session) operation.
pub type SessionResult<T> = Result<T, SessionError>;

/// Well-known FTP reply codes the retry policy and the engine react to.
pub mod status {
    /// `421` Service not available; the server is closing the control connection.
    pub const SERVICE_UNAVAILABLE: u32 = 421;
    /// `450` Requested file action not taken; file busy or unavailable.
    pub const FILE_BUSY: u32 = 450;
    /// `530` Not logged in.
    pub const NOT_LOGGED_IN: u32 = 530;
    /// `550` Requested action not taken; file unavailable or not found.
    pub const FILE_UNAVAILABLE: u32 = 550;
}

/// Optional server features a session may advertise.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Capability {
    /// `MLST`: machine-readable listings (`MLSD`) and single-object lookup.
    ObjectInfo,
    /// `MFMT`: explicit modification-time setter.
    ModifyTime,
}

impl Capability {
    /// Returns the keyword a server lists in its `FEAT` reply.
    #[must_use]
    pub const fn feature_name(self) -> &'static str {
        match self {
            Self::ObjectInfo => "MLST",
            Self::ModifyTime => "MFMT",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feature_name())
    }
}

/// Failure reported by a session.
///
/// Server rejections keep their numeric reply code so callers can tell a
/// missing path (`550`) from an expired login (`530`) without string
/// matching. Timeouts surface as [`SessionError::Io`] values whose kind is
/// [`io::ErrorKind::TimedOut`] or [`io::ErrorKind::WouldBlock`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server answered with a non-success reply.
    #[error("{code} {message}")]
    Status {
        /// Three-digit FTP reply code.
        code: u32,
        /// Reply text with the code stripped.
        message: String,
    },
    /// The control or data connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An operation was issued on a session that is not connected.
    #[error("session is not connected")]
    Disconnected,
    /// The operation needs a feature the server does not advertise.
    #[error("server does not support {0}")]
    MissingCapability(Capability),
    /// The server sent something that could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A pool lease was used after it had been released.
    #[error("connection lease was already released")]
    LeaseReleased,
}

impl SessionError {
    /// Builds a [`SessionError::Status`] value.
    pub fn status(code: u32, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Returns the FTP reply code when the server rejected the request.
    #[must_use]
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Reports whether the server answered with `code`.
    #[must_use]
    pub fn has_code(&self, code: u32) -> bool {
        self.code() == Some(code)
    }

    /// Reports whether the failure is a read or write timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(error)
                if matches!(error.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        )
    }

    /// Reports whether the server dropped the control connection, either by
    /// announcing `421` or by resetting the socket.
    #[must_use]
    pub fn is_connection_loss(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code == status::SERVICE_UNAVAILABLE,
            Self::Io(error) => matches!(
                error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_server_reply() {
        let error = SessionError::status(550, "No such file or directory");
        assert_eq!(error.to_string(), "550 No such file or directory");
        assert_eq!(error.code(), Some(550));
        assert!(error.has_code(status::FILE_UNAVAILABLE));
    }

    #[test]
    fn timeouts_are_recognised_by_kind() {
        let timed_out = SessionError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        let would_block = SessionError::from(io::Error::from(io::ErrorKind::WouldBlock));
        let reset = SessionError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(timed_out.is_timeout());
        assert!(would_block.is_timeout());
        assert!(!reset.is_timeout());
        assert_eq!(reset.code(), None);
    }

    #[test]
    fn dropped_connections_are_recognised() {
        assert!(SessionError::status(421, "Idle timeout").is_connection_loss());
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
        ] {
            assert!(SessionError::from(io::Error::from(kind)).is_connection_loss(), "{kind:?}");
        }
        assert!(!SessionError::from(io::Error::from(io::ErrorKind::TimedOut)).is_connection_loss());
        assert!(!SessionError::from(io::Error::from(io::ErrorKind::NotFound)).is_connection_loss());
        assert!(!SessionError::status(550, "missing").is_connection_loss());
    }

    #[test]
    fn capability_names_follow_feat_keywords() {
        assert_eq!(Capability::ObjectInfo.to_string(), "MLST");
        assert_eq!(
            SessionError::MissingCapability(Capability::ModifyTime).to_string(),
            "server does not support MFMT"
        );
    }
}
