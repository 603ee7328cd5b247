//! Per-path cooldown and in-flight tracking
//!
//! Every write performed by the engine is recorded with [`AntiLoopGuard::mark_synced`].
//! The event path consults [`AntiLoopGuard::check_at`] before starting a
//! single-pair sync, so the engine's own writes never trigger another sync of
//! the same path. Leases give per-path mutual exclusion; different paths
//! never block each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct LockEntry {
    in_flight: bool,
    held_until: Option<Instant>,
}

impl LockEntry {
    fn cooling_at(&self, now: Instant) -> bool {
        self.held_until.is_some_and(|until| now < until)
    }
}

/// Whether an event for a path may start a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCheck {
    /// Nothing holds the path
    Ready,
    /// A sync touching the path is running; retry later
    InFlight,
    /// The engine wrote the path moments ago; drop the event
    CoolingDown,
}

/// Anti-loop guard shared by passes and the event path
#[derive(Debug)]
pub struct AntiLoopGuard {
    cooldown: Duration,
    entries: Mutex<HashMap<PathBuf, LockEntry>>,
}

impl AntiLoopGuard {
    /// Create a guard with the given cooldown window
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an event for `path` should start a sync now
    #[must_use]
    pub fn should_trigger(&self, path: &Path) -> bool {
        self.check_at(path, Instant::now()) == TriggerCheck::Ready
    }

    /// Classify an event for `path` observed at `now`
    #[must_use]
    pub fn check_at(&self, path: &Path, now: Instant) -> TriggerCheck {
        match self.entries().get(path) {
            Some(entry) if entry.in_flight => TriggerCheck::InFlight,
            Some(entry) if entry.cooling_at(now) => TriggerCheck::CoolingDown,
            _ => TriggerCheck::Ready,
        }
    }

    /// Whether `path` is inside its cooldown window
    #[must_use]
    pub fn is_cooling_down(&self, path: &Path) -> bool {
        self.entries()
            .get(path)
            .is_some_and(|entry| entry.cooling_at(Instant::now()))
    }

    /// Record that the engine just wrote `path`
    pub fn mark_synced(&self, path: &Path) {
        self.mark_synced_at(path, Instant::now());
    }

    /// Record a write to `path` at `now`
    pub fn mark_synced_at(&self, path: &Path, now: Instant) {
        self.entries().entry(path.to_path_buf()).or_default().held_until = Some(now + self.cooldown);
    }

    /// Mark every path in flight, or none if any already is
    ///
    /// The returned lease releases the paths when dropped.
    #[must_use]
    pub fn try_acquire(&self, paths: &[&Path]) -> Option<PathLease<'_>> {
        let mut entries = self.entries();
        if paths
            .iter()
            .any(|p| entries.get(*p).is_some_and(|e| e.in_flight))
        {
            return None;
        }

        let mut held = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.to_path_buf();
            entries.entry(path.clone()).or_default().in_flight = true;
            held.push(path);
        }
        drop(entries);

        Some(PathLease { guard: self, paths: held })
    }

    /// Forget entries whose cooldown expired and that are not in flight
    pub fn prune(&self, now: Instant) {
        self.entries()
            .retain(|_, entry| entry.in_flight || entry.cooling_at(now));
    }

    /// Number of tracked paths
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entries().len()
    }

    fn release(&self, paths: &[PathBuf]) {
        let mut entries = self.entries();
        for path in paths {
            if let Some(entry) = entries.get_mut(path) {
                entry.in_flight = false;
            }
        }
    }
}

/// In-flight claim on a set of paths
#[derive(Debug)]
pub struct PathLease<'a> {
    guard: &'a AntiLoopGuard,
    paths: Vec<PathBuf>,
}

impl Drop for PathLease<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.paths);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn guard() -> AntiLoopGuard {
        AntiLoopGuard::new(Duration::from_secs(3))
    }

    #[test]
    fn test_untracked_path_triggers() {
        assert!(guard().should_trigger(Path::new("/src/a/README.md")));
    }

    #[test]
    fn test_cooldown_window() {
        let guard = guard();
        let path = Path::new("/src/a/README.md");
        let t0 = Instant::now();
        guard.mark_synced_at(path, t0);

        assert_eq!(guard.check_at(path, t0), TriggerCheck::CoolingDown);
        assert_eq!(
            guard.check_at(path, t0 + Duration::from_millis(2_900)),
            TriggerCheck::CoolingDown
        );
        assert_eq!(
            guard.check_at(path, t0 + Duration::from_secs(3)),
            TriggerCheck::Ready
        );
    }

    #[test]
    fn test_cooldown_is_per_path() {
        let guard = guard();
        let t0 = Instant::now();
        guard.mark_synced_at(Path::new("/a.md"), t0);
        assert_eq!(guard.check_at(Path::new("/b.md"), t0), TriggerCheck::Ready);
    }

    #[test]
    fn test_lease_blocks_and_releases() {
        let guard = guard();
        let a = Path::new("/src/a/README.md");
        let b = Path::new("/t/a.md");

        let lease = guard.try_acquire(&[a, b]).unwrap();
        assert_eq!(guard.check_at(a, Instant::now()), TriggerCheck::InFlight);
        assert!(guard.try_acquire(&[b]).is_none());
        assert!(guard.try_acquire(&[Path::new("/other.md")]).is_some());

        drop(lease);
        assert!(guard.try_acquire(&[a, b]).is_some());
        assert!(guard.should_trigger(a));
    }

    #[test]
    fn test_failed_acquire_claims_nothing() {
        let guard = guard();
        let a = Path::new("/a.md");
        let b = Path::new("/b.md");
        let _held = guard.try_acquire(&[b]).unwrap();

        assert!(guard.try_acquire(&[a, b]).is_none());
        assert!(guard.try_acquire(&[a]).is_some());
    }

    #[test]
    fn test_prune_keeps_live_entries() {
        let guard = guard();
        let t0 = Instant::now();
        guard.mark_synced_at(Path::new("/old.md"), t0);
        guard.mark_synced_at(Path::new("/new.md"), t0 + Duration::from_secs(10));
        let _lease = guard.try_acquire(&[Path::new("/busy.md")]).unwrap();

        guard.prune(t0 + Duration::from_secs(5));
        assert_eq!(guard.tracked(), 2);
    }

    #[test]
    fn test_concurrent_acquire_is_exclusive() {
        let guard = Arc::new(guard());
        let winners = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let winners = Arc::clone(&winners);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if let Some(lease) = guard.try_acquire(&[Path::new("/shared.md")]) {
                        winners.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        drop(lease);
                    } else {
                        barrier.wait();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
