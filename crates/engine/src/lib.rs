#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `engine` mirrors a local file or directory tree onto an FTP server. It
//! walks the local side once, lists each remote directory once, and for every
//! entry decides whether to add, replace, skip or delete it, streaming each
//! decision to a [`Reporter`] as a [`SyncEvent`]. Extra remote entries are
//! removed unless an exclusion rule protects them.
//!
//! # Design
//!
//! - Traversal runs on a single control [`transport::Connection`]. File
//!   uploads are dispatched to a rayon pool with one worker per
//!   [`transport::ConnectionPool`] slot, so no worker ever waits on a lease
//!   held by the traversal.
//! - Each directory forms an upload scope. Its uploads finish before its
//!   unmatched remote entries are swept and before the traversal returns to
//!   the parent.
//! - Modification times are compared at whole-minute (UTC) granularity, the
//!   precision FTP listings reliably report. Uploaded files get their local
//!   time stamped back with `MFMT`, which is what makes a second run a no-op.
//! - Remote names are matched case-insensitively, preferring an exact-case
//!   match when both exist.
//!
//! # Invariants
//!
//! - Excluded paths are never uploaded and never deleted. A remote directory
//!   holding an excluded descendant survives, together with that descendant.
//! - No remote entry is deleted before every upload into its directory has
//!   finished.
//! - At most `parallelism` upload connections are open at once.
//!
//! # Errors
//!
//! The first failure that survives the retry policy aborts the run as an
//! [`EngineError`]. Uploads that have not started yet are abandoned; the
//! server may be left partially synchronized and running again converges.
//!
//! # Examples
//!
//! ```
//! use engine::{ItemAction, SyncEvent};
//!
//! let event = SyncEvent::new(2, ItemAction::Replace, "index.html");
//! assert_eq!(event.to_string(), "    * index.html");
//!
//! let skipped = SyncEvent::new(1, ItemAction::Skip, "cache").with_reason("excluded (cache)");
//! assert_eq!(skipped.to_string(), "  cache: excluded (cache)");
//! ```

mod error;
mod local;
mod remote_path;
mod report;
mod summary;
mod sync;

pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use local::{LocalEntry, LocalKind};
pub use remote_path::RemotePath;
pub use report::{ItemAction, NullReporter, Reporter, SyncEvent};
pub use summary::SyncSummary;
pub use sync::{SyncEngine, SyncSettings, synchronize};
