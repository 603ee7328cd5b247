//! Coalescing of bursts of filesystem events

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Collects path events and releases each path once it has been quiet
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    /// Record an event for `path` at `now`; later events push the deadline back
    pub fn record(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path, now);
    }

    /// Remove and return every path quiet since at least the debounce period
    pub fn drain_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let quiet = self.quiet;
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) >= quiet)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }

    /// Time until the earliest pending path becomes ready
    #[must_use]
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|last| (*last + self.quiet).saturating_duration_since(now))
            .min()
    }

    /// Number of paths waiting
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
