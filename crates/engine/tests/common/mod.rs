//! Helpers shared by the engine integration tests.

#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use engine::{EngineResult, ItemAction, Reporter, SyncEvent, SyncSettings, SyncSummary, synchronize};
use filters::ExclusionSet;
use test_support::MemoryServer;
use transport::RetryPolicy;

/// Collects every event in the order the engine emitted it.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events below the root, rendered the way the console shows them.
    pub fn lines(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter(|event| event.depth > 0)
            .map(ToString::to_string)
            .collect()
    }

    pub fn count(&self, action: ItemAction) -> usize {
        self.events()
            .iter()
            .filter(|event| event.action == action)
            .count()
    }

    /// Number of add, replace and delete events.
    pub fn changes(&self) -> usize {
        self.count(ItemAction::Add) + self.count(ItemAction::Replace) + self.count(ItemAction::Delete)
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts).with_delays(Duration::ZERO, Duration::ZERO)
}

pub fn settings(local: &Path, remote: &str) -> SyncSettings {
    SyncSettings::new(local, remote)
        .with_parallelism(NonZeroUsize::new(3).unwrap())
        .with_retry(fast_retry(3))
}

pub fn excluding(settings: SyncSettings, patterns: &[&str]) -> SyncSettings {
    settings.with_exclusions(ExclusionSet::compile(patterns.iter().copied()).unwrap())
}

pub fn run(server: &MemoryServer, settings: &SyncSettings) -> (EngineResult<SyncSummary>, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let outcome = synchronize(settings, server.factory(), &reporter);
    (outcome, reporter)
}
