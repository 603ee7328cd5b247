//! Long-running host for timers and the file watcher
//!
//! The daemon runs these activities on their own threads:
//! - Periodic full sync every `auto_sync_interval` seconds
//! - Periodic cleanup every `cleanup_interval` seconds
//! - A heartbeat written to the mapping store
//! - A `notify` watcher feeding a bounded event queue
//! - A debounce worker turning quiet paths into single-pair syncs
//!
//! Shutdown is cooperative: the flag is checked between passes, so an
//! in-flight pass always finishes before its thread exits.

mod watcher;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

pub use watcher::{EVENT_QUEUE_CAPACITY, EventWorker, is_candidate};

use crate::error::Result;
use crate::sync::{META_DAEMON_HEARTBEAT, META_DAEMON_PID, SyncEngine};

/// Seconds between heartbeat writes
pub const HEARTBEAT_INTERVAL: u64 = 30;

const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Process-lifetime state of one daemon run
#[derive(Debug, Clone)]
pub struct DaemonContext {
    pid: u32,
    started_at: DateTime<Utc>,
    shutdown: Arc<AtomicBool>,
}

impl DaemonContext {
    /// Fresh context for the current process
    #[must_use]
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process id
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// When the daemon started
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Ask every daemon thread to stop after its current step
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Sleep up to `total`, returning `false` as soon as shutdown is requested
    #[must_use]
    pub fn wait(&self, total: Duration) -> bool {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.is_shutdown() {
                return false;
            }
            let step = remaining.min(SHUTDOWN_POLL);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
        !self.is_shutdown()
    }
}

impl Default for DaemonContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Background sync host
pub struct Daemon {
    engine: Arc<SyncEngine>,
    context: DaemonContext,
}

impl Daemon {
    /// Create a daemon around a shared engine
    #[must_use]
    pub const fn new(engine: Arc<SyncEngine>, context: DaemonContext) -> Self {
        Self { engine, context }
    }

    /// Run until shutdown is requested on the context
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable)
    /// if daemon health cannot be recorded. Failures inside passes are logged
    /// and retried on the next interval.
    pub fn run(self) -> Result<()> {
        let store = self.engine.store();
        store.set_meta(META_DAEMON_PID, &self.context.pid().to_string())?;
        store.set_meta(META_DAEMON_HEARTBEAT, &Utc::now().to_rfc3339())?;
        info!("Daemon started (pid {})", self.context.pid());

        run_logged("initial sync", || self.engine.run_full_sync().map(|r| r.pairs.len()));

        let config = self.engine.config();
        let mut handles = vec![
            self.spawn_timer("sync", config.auto_sync_interval, |engine| {
                run_logged("periodic sync", || engine.run_full_sync().map(|r| r.pairs.len()));
            }),
            self.spawn_timer("cleanup", config.cleanup_interval, |engine| {
                run_logged("cleanup", || {
                    engine
                        .run_cleanup()
                        .map(|r| r.pruned.len() + r.unlinked_moved.len())
                });
            }),
            self.spawn_timer("heartbeat", HEARTBEAT_INTERVAL, |engine| {
                if let Err(e) = engine
                    .store()
                    .set_meta(META_DAEMON_HEARTBEAT, &Utc::now().to_rfc3339())
                {
                    warn!("Failed to record heartbeat: {e}");
                }
            }),
        ];

        let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_CAPACITY);
        let mut roots = config.source_folders.clone();
        roots.push(config.target_folder.clone());
        let file_names = config.file_names.clone();
        let context = self.context.clone();
        handles.push(spawn_named("watcher", move || {
            watcher::watch_blocking(&roots, &file_names, &tx, &context);
        }));

        let worker = EventWorker::new(
            Arc::clone(&self.engine),
            Duration::from_secs(config.debounce_seconds),
        );
        let context = self.context.clone();
        handles.push(spawn_named("events", move || worker.run(&rx, &context)));

        while self.context.wait(Duration::from_secs(1)) {}
        info!("Shutdown requested; waiting for in-flight work");

        for handle in handles.into_iter().flatten() {
            if handle.join().is_err() {
                error!("A daemon thread panicked");
            }
        }

        if let Err(e) = store.delete_meta(META_DAEMON_PID) {
            warn!("Failed to clear daemon pid: {e}");
        }
        info!("Daemon stopped");
        Ok(())
    }

    fn spawn_timer(
        &self,
        name: &'static str,
        interval_secs: u64,
        job: impl Fn(&SyncEngine) + Send + 'static,
    ) -> Option<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let context = self.context.clone();
        let interval = Duration::from_secs(interval_secs.max(1));
        spawn_named(name, move || {
            while context.wait(interval) {
                debug!("Timer {name} fired");
                job(&engine);
            }
        })
    }
}

fn spawn_named(name: &str, f: impl FnOnce() + Send + 'static) -> Option<JoinHandle<()>> {
    match thread::Builder::new().name(format!("readmesync-{name}")).spawn(f) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to spawn {name} thread: {e}");
            None
        }
    }
}

fn run_logged(what: &str, pass: impl FnOnce() -> Result<usize>) {
    match pass() {
        Ok(count) => info!("{what} finished ({count} item(s))"),
        Err(e) => error!("{what} aborted: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_context_wait_returns_early_on_shutdown() {
        let context = DaemonContext::new();
        let remote = context.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.request_shutdown();
        });

        let started = Instant::now();
        assert!(!context.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
        stopper.join().unwrap();
    }

    #[test]
    fn test_context_wait_completes() {
        let context = DaemonContext::new();
        assert!(context.wait(Duration::from_millis(10)));
        assert_eq!(context.pid(), std::process::id());
    }
}
