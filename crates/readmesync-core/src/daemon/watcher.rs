//! Filesystem notifications and the debounced event worker

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use super::DaemonContext;
use crate::scanner::is_markdown;
use crate::sync::{Debouncer, SyncEngine, TriggerCheck};

/// Bounded capacity of the path event queue
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

const POLL: Duration = Duration::from_millis(500);

/// Whether an event path can belong to a mapping
///
/// Collection documents are Markdown; sources match a configured file name.
#[must_use]
pub fn is_candidate(path: &Path, file_names: &[String]) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    is_markdown(path) || file_names.iter().any(|wanted| wanted.eq_ignore_ascii_case(&name))
}

/// Watch `roots` until shutdown, forwarding candidate paths into `tx`
pub(super) fn watch_blocking(
    roots: &[PathBuf],
    file_names: &[String],
    tx: &SyncSender<PathBuf>,
    context: &DaemonContext,
) {
    let (tx_notify, rx_notify) = mpsc::channel();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx_notify.send(res);
    }) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create file watcher: {e}");
            return;
        }
    };

    for root in roots {
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => info!("Watching {}", root.display()),
            Err(e) => warn!("Failed to watch {}: {e}", root.display()),
        }
    }

    while !context.is_shutdown() {
        let event = match rx_notify.recv_timeout(POLL) {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                error!("Watch error: {e}");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Watcher channel closed");
                break;
            }
        };

        if matches!(event.kind, EventKind::Access(_) | EventKind::Other) {
            continue;
        }

        for path in event.paths {
            if !is_candidate(&path, file_names) {
                continue;
            }
            match tx.try_send(path) {
                Ok(()) => {}
                Err(TrySendError::Full(path)) => {
                    warn!("Event queue full; dropping {} until the next pass", path.display());
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Consumes path events, debounces them and runs single-pair syncs
pub struct EventWorker {
    engine: Arc<SyncEngine>,
    debouncer: Debouncer,
}

impl EventWorker {
    /// Create a worker with the given debounce window
    #[must_use]
    pub fn new(engine: Arc<SyncEngine>, debounce: Duration) -> Self {
        Self {
            engine,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Queue an event observed at `now`
    ///
    /// Events arriving inside the path's cooldown window were caused by the
    /// engine's own write and are dropped here, before the debounce delay can
    /// outlast the window. Returns whether the event was queued.
    pub fn record(&mut self, path: PathBuf, now: Instant) -> bool {
        if self.engine.guard().check_at(&path, now) == TriggerCheck::CoolingDown {
            debug!("Ignoring self-induced event for {}", path.display());
            return false;
        }
        self.debouncer.record(path, now);
        true
    }

    /// Sync every path that has been quiet long enough
    ///
    /// Paths in flight are queued again; paths the engine wrote since their
    /// event was queued are dropped. Returns the paths that were synced.
    pub fn process_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut synced = Vec::new();
        for path in self.debouncer.drain_ready(now) {
            match self.engine.guard().check_at(&path, now) {
                TriggerCheck::Ready => match self.engine.run_single_pair_sync(&path) {
                    Ok(report) => {
                        debug!("Event sync for {}: {} write(s)", path.display(), report.total_operations());
                        synced.push(path);
                    }
                    Err(e) => error!("Event sync for {} aborted: {e}", path.display()),
                },
                TriggerCheck::InFlight => self.debouncer.record(path, now),
                TriggerCheck::CoolingDown => {
                    debug!("{} was written while its event was pending", path.display());
                }
            }
        }
        self.engine.guard().prune(now);
        synced
    }

    /// Drain `rx` until shutdown or disconnect
    pub fn run(mut self, rx: &Receiver<PathBuf>, context: &DaemonContext) {
        while !context.is_shutdown() {
            let timeout = self.debouncer.next_deadline(Instant::now()).map_or(POLL, |d| d.min(POLL));
            match rx.recv_timeout(timeout) {
                Ok(path) => {
                    self.record(path, Instant::now());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while let Ok(path) = rx.try_recv() {
                self.record(path, Instant::now());
            }
            self.process_ready(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scanner::FsScanner;
    use crate::store::MappingStore;
    use std::fs;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> Arc<SyncEngine> {
        let config = Config {
            source_folders: vec![tmp.path().join("code")],
            target_folder: tmp.path().join("notes"),
            ..Config::default()
        };
        let scanner = FsScanner::from_config(&config).unwrap();
        Arc::new(SyncEngine::new(
            config,
            MappingStore::open_in_memory().unwrap(),
            Box::new(scanner),
        ))
    }

    #[test]
    fn test_is_candidate() {
        let names = vec!["README.md".to_string(), "GUIDE.rst".to_string()];
        assert!(is_candidate(Path::new("/code/a/README.md"), &names));
        assert!(is_candidate(Path::new("/code/a/guide.rst"), &names));
        assert!(is_candidate(Path::new("/notes/a-README.md"), &names));
        assert!(!is_candidate(Path::new("/notes/.a-README.md.readmesync-tmp"), &names));
        assert!(!is_candidate(Path::new("/code/a/main.rs"), &names));
    }

    #[test]
    fn test_event_for_new_source_syncs_after_debounce() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("code/alpha/README.md");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "hello").unwrap();

        let mut worker = EventWorker::new(engine(&tmp), Duration::from_secs(2));
        let t0 = Instant::now();
        worker.record(source.clone(), t0);

        assert!(worker.process_ready(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(worker.process_ready(t0 + Duration::from_secs(2)), vec![source]);
        assert!(tmp.path().join("notes/alpha-README.md").exists());
    }

    fn synced_target(tmp: &TempDir) -> (Arc<SyncEngine>, PathBuf) {
        let source = tmp.path().join("code/alpha/README.md");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "hello").unwrap();

        let engine = engine(tmp);
        engine.run_full_sync().unwrap();
        (engine, tmp.path().join("notes/alpha-README.md"))
    }

    #[test]
    fn test_event_after_engine_write_is_suppressed() {
        let tmp = TempDir::new().unwrap();
        let (engine, target) = synced_target(&tmp);

        let mut worker = EventWorker::new(Arc::clone(&engine), Duration::ZERO);
        let now = Instant::now();
        assert!(!worker.record(target, now));

        assert!(worker.process_ready(now).is_empty());
    }

    #[test]
    fn test_event_inside_cooldown_is_dropped_despite_debounce() {
        let tmp = TempDir::new().unwrap();
        let (engine, target) = synced_target(&tmp);

        let written = Instant::now();
        engine.guard().mark_synced_at(&target, written);

        let mut worker = EventWorker::new(Arc::clone(&engine), Duration::from_secs(2));
        assert!(!worker.record(target.clone(), written + Duration::from_millis(1_500)));
        assert!(worker.process_ready(written + Duration::from_millis(3_600)).is_empty());

        assert!(worker.record(target.clone(), written + Duration::from_millis(3_500)));
        assert_eq!(worker.process_ready(written + Duration::from_millis(5_500)), vec![target]);
    }

    #[test]
    fn test_in_flight_path_is_requeued() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let path = tmp.path().join("code/alpha/README.md");

        let mut worker = EventWorker::new(Arc::clone(&engine), Duration::ZERO);
        let lease = engine.guard().try_acquire(&[path.as_path()]).unwrap();
        let now = Instant::now();
        worker.record(path.clone(), now);

        assert!(worker.process_ready(now).is_empty());
        assert_eq!(worker.debouncer.len(), 1);
        drop(lease);
    }
}
