//! Shared snapshot store: the single source of truth for miner state.
//!
//! All per-miner state lives behind one mutex. Pollers publish into it with
//! atomic replace-or-clear operations; the exposition layer takes a deep
//! copy in one short critical section and formats lock-free. Entries are
//! created empty at startup, mutated only by their own target's poller, and
//! live for the process lifetime.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::error::ErrorCategory;
use crate::types::{ChipRecord, MetricSet, PoolRecord, Target, VersionInfo};

/// Dynamic collections from one successful poll.
///
/// Grouped so the store's invariant holds by construction: metrics, pools
/// and chips are all present together or all absent together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Samples {
    pub metrics: MetricSet,
    pub pools: Vec<PoolRecord>,
    pub chips: Vec<ChipRecord>,
}

/// Per-category and total error counters for one miner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorCounters {
    pub total: u64,
    pub timeout: u64,
    pub connection_refused: u64,
    pub network: u64,
    pub parse: u64,
    pub other: u64,
}

impl ErrorCounters {
    fn bump(&mut self, category: ErrorCategory) {
        self.total += 1;
        match category {
            ErrorCategory::Timeout => self.timeout += 1,
            ErrorCategory::ConnectionRefused => self.connection_refused += 1,
            ErrorCategory::Network => self.network += 1,
            ErrorCategory::Parse => self.parse += 1,
            ErrorCategory::Other => self.other += 1,
        }
    }

    pub fn get(&self, category: ErrorCategory) -> u64 {
        match category {
            ErrorCategory::Timeout => self.timeout,
            ErrorCategory::ConnectionRefused => self.connection_refused,
            ErrorCategory::Network => self.network,
            ErrorCategory::Parse => self.parse,
            ErrorCategory::Other => self.other,
        }
    }
}

/// Up/down status-transition counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionCounters {
    pub changes: u64,
    pub ups: u64,
    pub downs: u64,
}

/// A liveness flip observed by a publish operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Up,
    Down,
}

/// Everything the store tracks for one miner.
#[derive(Clone, Debug, Default)]
pub struct TargetEntry {
    /// Dynamic collections; cleared as a unit on every failed poll.
    pub samples: Option<Samples>,
    /// Sticky identity: survives failed polls, never overwritten by an
    /// empty decode.
    pub version_info: Option<VersionInfo>,
    /// Liveness as of the most recent poll; None before the first poll.
    pub up: Option<bool>,
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub last_duration: Option<Duration>,
    pub errors: ErrorCounters,
    pub transitions: TransitionCounters,
}

/// Point-in-time copy of the whole store, safe to format without the lock.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub targets: BTreeMap<String, TargetEntry>,
    pub heartbeat: Option<SystemTime>,
}

#[derive(Default)]
struct Inner {
    targets: BTreeMap<String, TargetEntry>,
    heartbeat: Option<SystemTime>,
}

/// The store itself: one mutex around all shared mutable state.
#[derive(Default)]
pub struct SnapshotStore {
    inner: Mutex<Inner>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a successful poll: replace the dynamic collections, clear
    /// the error, stamp liveness. Identity is updated only when the decode
    /// produced a non-empty record. Returns the transition, if any.
    pub fn record_success(
        &self,
        target: &Target,
        samples: Samples,
        version: VersionInfo,
        duration: Duration,
    ) -> Option<Transition> {
        let mut inner = self.inner.lock();
        let entry = inner.targets.entry(target.host.clone()).or_default();

        entry.samples = Some(samples);
        entry.last_error = None;
        entry.last_success = Some(SystemTime::now());
        entry.last_duration = Some(duration);
        if !version.is_empty() {
            entry.version_info = Some(version);
        }

        let prev = entry.up.replace(true);
        if prev == Some(false) {
            entry.transitions.changes += 1;
            entry.transitions.ups += 1;
            Some(Transition::Up)
        } else {
            None
        }
    }

    /// Publish a failed poll: clear the dynamic collections so the
    /// exposition reports "no data" rather than stale numbers, count the
    /// error, stamp liveness. Identity is left untouched.
    pub fn record_failure(
        &self,
        target: &Target,
        category: ErrorCategory,
        message: String,
        duration: Duration,
    ) -> Option<Transition> {
        let mut inner = self.inner.lock();
        let entry = inner.targets.entry(target.host.clone()).or_default();

        entry.samples = None;
        entry.last_error = Some(message);
        entry.last_duration = Some(duration);
        entry.errors.bump(category);

        let prev = entry.up.replace(false);
        if prev == Some(true) {
            entry.transitions.changes += 1;
            entry.transitions.downs += 1;
            Some(Transition::Down)
        } else {
            None
        }
    }

    /// Record a scheduler heartbeat at the start of each poll cycle.
    pub fn beat(&self) {
        self.inner.lock().heartbeat = Some(SystemTime::now());
    }

    pub fn last_heartbeat(&self) -> Option<SystemTime> {
        self.inner.lock().heartbeat
    }

    /// Deep-copy everything in one lock hold.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        Snapshot {
            targets: inner.targets.clone(),
            heartbeat: inner.heartbeat,
        }
    }
}
