use std::io::Read;
use std::time::SystemTime;

use crate::{Capability, RemoteEntry, SessionResult};

/// A stateful, single-threaded conversation with one FTP server.
///
/// Implementations hold a working directory that relative names resolve
/// against. They are moved between worker threads through the
/// [`ConnectionPool`](crate::ConnectionPool) but are only ever driven by one
/// thread at a time, hence `Send` without `Sync`.
///
/// Every method maps a server rejection onto
/// [`SessionError::Status`](crate::SessionError::Status) so the
/// [`RetryPolicy`](crate::RetryPolicy) can classify it.
pub trait Session: Send {
    /// Opens (or reopens) the connection and logs in.
    ///
    /// A successful reconnect resets the working directory to the login
    /// directory.
    fn connect(&mut self) -> SessionResult<()>;

    /// Reports whether the control connection is believed to be alive.
    fn is_connected(&self) -> bool;

    /// Changes the working directory; `path` may be absolute or relative.
    fn change_working_directory(&mut self, path: &str) -> SessionResult<()>;

    /// Lists `path`, or the working directory when `path` is `None`.
    ///
    /// The `.` and `..` pseudo entries are never returned.
    fn list_directory(&mut self, path: Option<&str>) -> SessionResult<Vec<RemoteEntry>>;

    /// Creates the directory `name`.
    fn create_directory(&mut self, name: &str) -> SessionResult<()>;

    /// Removes the directory `name`, which must be empty.
    fn remove_directory(&mut self, name: &str) -> SessionResult<()>;

    /// Deletes the file or link `name`.
    fn delete_file(&mut self, name: &str) -> SessionResult<()>;

    /// Stores the bytes read from `source` as `name`, returning the byte count.
    fn write_file(&mut self, name: &str, source: &mut dyn Read) -> SessionResult<u64>;

    /// Sets the modification time of `name`.
    fn set_modified_time(&mut self, name: &str, modified: SystemTime) -> SessionResult<()>;

    /// Reports whether the server advertises `capability`.
    fn has_capability(&mut self, capability: Capability) -> SessionResult<bool>;

    /// Looks up a single object, returning `None` when nothing exists at `path`.
    ///
    /// Sessions without [`Capability::ObjectInfo`] fail with
    /// [`SessionError::MissingCapability`](crate::SessionError::MissingCapability).
    fn object_info(&mut self, path: &str) -> SessionResult<Option<RemoteEntry>>;

    /// Logs out and closes the connection.
    fn close(&mut self) -> SessionResult<()>;
}
