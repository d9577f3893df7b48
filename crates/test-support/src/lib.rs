//! Shared fixtures for ftpush tests.
//!
//! [`MemoryServer`] is an in-process stand-in for an FTP server: a shared
//! tree that any number of [`MemorySession`]s can drive concurrently, with
//! fault injection and counters for asserting on retry and pool behaviour.
//! [`LocalTree`] builds temporary source trees with pinned modification
//! times.

#![allow(clippy::missing_panics_doc)]

mod fixture;
mod server;

pub use fixture::{LocalTree, minute};
pub use server::{Fault, MemoryServer, MemorySession, Operation, Recorded};
