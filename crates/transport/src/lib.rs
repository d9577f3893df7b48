#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `transport` is the protocol plumbing under the ftpush engine. It defines
//! the [`Session`] contract the engine drives, the [`RetryPolicy`] every
//! protocol call runs under, the per-session working-directory cache
//! ([`Connection`]), the bounded [`ConnectionPool`] used by upload workers,
//! and an [`FtpSession`] adapter over [`suppaftp`].
//!
//! # Design
//!
//! - [`Session`] is object-safe and `Send`. Sessions are stateful (they carry
//!   a working directory) and are driven by one thread at a time.
//! - [`classify`] maps each [`SessionError`] onto a closed [`Disposition`];
//!   [`RetryPolicy::call`] is the single loop that consumes it.
//! - [`Connection`] remembers the last directory it entered and re-issues the
//!   change whenever it cannot prove the session is still positioned there.
//! - [`ConnectionPool`] hands out [`ConnectionLease`] guards over lazily
//!   opened connections; leasing blocks once every slot is checked out.
//!
//! # Invariants
//!
//! - No more than `capacity` leases exist at once.
//! - A lease returns its slot exactly once.
//! - After a reconnect the session is moved back into the directory the
//!   interrupted operation required before the operation is retried.
//!
//! # Errors
//!
//! Protocol failures are [`SessionError`] values carrying the server's reply
//! code where one exists. Pool teardown reports [`PoolError`]. Returning more
//! slots than the pool holds is a programming error and panics.
//!
//! # Examples
//!
//! ```
//! use transport::{Disposition, SessionError, classify};
//!
//! assert_eq!(classify(&SessionError::status(530, "Not logged in")), Disposition::RetryReconnect);
//! assert_eq!(classify(&SessionError::status(550, "File busy")), Disposition::Retry);
//! assert_eq!(classify(&SessionError::status(553, "Bad name")), Disposition::Fatal);
//! ```

mod connection;
mod entry;
mod error;
mod ftp;
mod pool;
mod retry;
mod session;

pub use connection::Connection;
pub use entry::{EntryKind, RemoteEntry};
pub use error::{Capability, SessionError, SessionResult, status};
pub use ftp::{FtpSession, FtpSettings, TransferMode};
pub use pool::{ConnectionLease, ConnectionPool, PoolError};
pub use retry::{DEFAULT_MAX_ATTEMPTS, Disposition, ROOT, RetryPolicy, classify};
pub use session::Session;
