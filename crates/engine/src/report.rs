//! Progress events emitted while a run reconciles the two trees.

use std::fmt;

/// What the engine decided to do with one entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ItemAction {
    /// Created on the server.
    Add,
    /// Left alone.
    Skip,
    /// Removed from the server.
    Delete,
    /// Uploaded over an existing remote entry.
    Replace,
    /// A directory present on both sides, about to be reconciled.
    Synchronize,
}

impl ItemAction {
    /// Returns the marker printed before the entry name.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Add => "+ ",
            Self::Delete => "- ",
            Self::Replace => "* ",
            Self::Skip | Self::Synchronize => "",
        }
    }
}

/// One reconciliation decision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncEvent {
    /// Nesting depth; entries directly under the root have depth 1.
    pub depth: usize,
    /// The decision.
    pub action: ItemAction,
    /// Entry name.
    pub name: String,
    /// Why the decision was taken, when it is not obvious from the action.
    pub reason: Option<String>,
}

impl SyncEvent {
    /// Creates an event without a reason.
    pub fn new(depth: usize, action: ItemAction, name: impl Into<String>) -> Self {
        Self {
            depth,
            action,
            name: name.into(),
            reason: None,
        }
    }

    /// Attaches a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for SyncEvent {
    /// Formats the event as an indented progress line, e.g. `  + a.txt`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:indent$}{}{}",
            "",
            self.action.prefix(),
            self.name,
            indent = self.depth * 2
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

/// Receiver of progress events.
///
/// Reporting is purely observational; the engine never inspects what the
/// reporter does with an event.
pub trait Reporter {
    /// Handles one event.
    fn report(&self, event: &SyncEvent);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, event: &SyncEvent) {
        (**self).report(event);
    }
}

/// A reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &SyncEvent) {}
}
