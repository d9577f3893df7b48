//! Bounded pool of lazily opened background connections.
//!
//! # Design
//!
//! The pool pre-fills a bounded [`crossbeam_channel`] with one slot per
//! permitted connection. A slot starts empty and gets its [`Connection`] the
//! first time a lease asks for the session, so a run that uploads nothing
//! never logs in more than once. Leasing receives a slot and blocks while all
//! of them are checked out; releasing sends it back. The channel capacity is
//! the pool capacity, which makes the lease count bounded by construction.
//!
//! # Invariants
//!
//! - At most `capacity` leases are outstanding at any time.
//! - A slot is returned exactly once per lease, whether through
//!   [`ConnectionLease::release`] or by dropping the lease.
//! - [`ConnectionPool::dispose`] refuses to tear down a pool while leases are
//!   outstanding.

use std::fmt;
use std::num::NonZeroUsize;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use thiserror::Error;

use crate::{Connection, RetryPolicy, Session, SessionError, SessionResult};

type Factory<S> = dyn Fn() -> SessionResult<S> + Send + Sync;

/// Errors returned when tearing down a [`ConnectionPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// Leases were still checked out at disposal.
    #[error("{outstanding} of {capacity} pooled connections were still leased at disposal")]
    LeasesOutstanding {
        /// Slots missing from the pool.
        outstanding: usize,
        /// Pool capacity.
        capacity: usize,
    },
    /// One or more opened connections failed to close.
    #[error("failed to close {} pooled connection(s); first error: {}", .0.len(), first_error(.0))]
    Close(Vec<SessionError>),
}

fn first_error(errors: &[SessionError]) -> String {
    errors
        .first()
        .map_or_else(String::new, ToString::to_string)
}

struct Slot<S> {
    index: usize,
    connection: Option<Connection<S>>,
}

/// A fixed-capacity set of sessions shared by upload workers.
pub struct ConnectionPool<S> {
    factory: Box<Factory<S>>,
    retry: RetryPolicy,
    capacity: usize,
    sender: Sender<Slot<S>>,
    receiver: Receiver<Slot<S>>,
}

impl<S> fmt::Debug for ConnectionPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("capacity", &self.capacity)
            .field("available", &self.receiver.len())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<S: Session> ConnectionPool<S> {
    /// Creates a pool of `capacity` slots whose sessions are produced by
    /// `factory` on first use.
    ///
    /// The factory must return a connected session.
    pub fn new<F>(factory: F, capacity: NonZeroUsize, retry: RetryPolicy) -> Self
    where
        F: Fn() -> SessionResult<S> + Send + Sync + 'static,
    {
        let capacity = capacity.get();
        let (sender, receiver) = bounded(capacity);
        for index in 0..capacity {
            sender
                .send(Slot {
                    index,
                    connection: None,
                })
                .expect("pool owns its receiver");
        }
        Self {
            factory: Box::new(factory),
            retry,
            capacity,
            sender,
            receiver,
        }
    }

    /// Checks out a slot, blocking until one is free.
    #[must_use]
    pub fn lease(&self) -> ConnectionLease<'_, S> {
        let slot = self.receiver.recv().expect("pool owns its sender");
        tracing::trace!(target: "ftpush::pool", slot = slot.index, "leased connection slot");
        ConnectionLease {
            pool: self,
            slot: Some(slot),
        }
    }

    /// Checks out a slot if one is free right now.
    #[must_use]
    pub fn try_lease(&self) -> Option<ConnectionLease<'_, S>> {
        self.receiver.try_recv().ok().map(|slot| ConnectionLease {
            pool: self,
            slot: Some(slot),
        })
    }

    /// Returns the maximum number of concurrent leases.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the number of slots currently leased.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.capacity - self.available()
    }

    fn give_back(&self, slot: Slot<S>) {
        let index = slot.index;
        match self.sender.try_send(slot) {
            Ok(()) => {
                tracing::trace!(target: "ftpush::pool", slot = index, "released connection slot");
            }
            Err(TrySendError::Full(_)) => {
                panic!("connection pool over-released: slot {index} returned to a full pool")
            }
            Err(TrySendError::Disconnected(_)) => unreachable!("pool owns its receiver"),
        }
    }

    /// Closes every opened session and tears the pool down.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::LeasesOutstanding`] without closing anything when
    /// a lease is still held, and [`PoolError::Close`] when any session fails
    /// to close; every session is attempted either way.
    pub fn dispose(self) -> Result<(), PoolError> {
        let slots: Vec<_> = self.receiver.try_iter().collect();
        if slots.len() != self.capacity {
            return Err(PoolError::LeasesOutstanding {
                outstanding: self.capacity - slots.len(),
                capacity: self.capacity,
            });
        }

        let errors: Vec<_> = slots
            .into_iter()
            .filter_map(|slot| slot.connection)
            .filter_map(|connection| connection.close().err())
            .collect();
        tracing::debug!(
            target: "ftpush::pool",
            capacity = self.capacity,
            failures = errors.len(),
            "disposed connection pool"
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PoolError::Close(errors))
        }
    }
}

/// Exclusive use of one pool slot.
///
/// The slot goes back to the pool on [`release`](Self::release) or drop,
/// whichever happens first; later releases are no-ops.
pub struct ConnectionLease<'p, S: Session> {
    pool: &'p ConnectionPool<S>,
    slot: Option<Slot<S>>,
}

impl<S: Session> ConnectionLease<'_, S> {
    /// Returns the leased connection, opening it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the factory failure when the session cannot be opened; the
    /// slot stays empty so a later lease can try again. Using a released
    /// lease yields [`SessionError::LeaseReleased`].
    pub fn connection(&mut self) -> SessionResult<&mut Connection<S>> {
        let pool = self.pool;
        let slot = self.slot.as_mut().ok_or(SessionError::LeaseReleased)?;
        let connection = match slot.connection.take() {
            Some(connection) => connection,
            None => {
                let session = (pool.factory)()?;
                tracing::debug!(target: "ftpush::pool", slot = slot.index, "opened pooled connection");
                Connection::new(session, pool.retry)
            }
        };
        Ok(slot.connection.insert(connection))
    }

    /// Returns the slot index while the lease is held.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot.as_ref().map(|slot| slot.index)
    }

    /// Reports whether the slot has been handed back.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.slot.is_none()
    }

    /// Hands the slot back to the pool.
    pub fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.give_back(slot);
        }
    }
}

impl<S: Session> Drop for ConnectionLease<'_, S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: Session> fmt::Debug for ConnectionLease<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLease")
            .field("slot", &self.slot())
            .finish_non_exhaustive()
    }
}
