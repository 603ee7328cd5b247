//! Bidirectional synchronization engine
//!
//! A pass moves through scanning, reconciling, applying and persisting, then
//! repeats the apply/persist steps for decisions that write back to sources.
//! Per-mapping failures are recorded in the report; only a mapping store
//! failure aborts a pass.

mod actions;
mod cleanup;
mod debounce;
mod executor;
mod guard;
mod orchestrator;
mod queries;
mod reporting;


use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::comparison::{ConflictResolution, Direction, FileState, SkipReason, SyncDecision};
use crate::store::Mapping;

pub use debounce::Debouncer;
pub use executor::FileOperationExecutor;
pub use guard::{AntiLoopGuard, PathLease, TriggerCheck};
pub use orchestrator::SyncEngine;
pub use reporting::SyncReporter;

/// Store key holding the RFC 3339 time of the last cleanup
pub const META_LAST_CLEANUP: &str = "last_cleanup_at";

/// Store key holding the pid of the running daemon
pub const META_DAEMON_PID: &str = "daemon_pid";

/// Store key holding the RFC 3339 time of the daemon's last heartbeat
pub const META_DAEMON_HEARTBEAT: &str = "daemon_heartbeat";

/// Details of a detected conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Source state when the conflict was detected
    pub source: FileState,
    /// Target state when the conflict was detected
    pub target: FileState,
    /// Policy in effect
    pub resolution: ConflictResolution,
    /// Sibling file holding the content of the overwritten side
    pub conflict_copy: PathBuf,
    /// Push applied after the copy, if any
    pub pushed: Option<Direction>,
}

/// What happened to one pair during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// The missing side was created
    Created(Direction),
    /// One side was overwritten by the other
    Updated(Direction),
    /// No file was written
    Skipped(SkipReason),
    /// A conflict copy was written
    Conflict(Box<ConflictRecord>),
    /// A path was busy or cooling down; retried on a later pass
    Deferred(&'static str),
    /// Reading or writing failed; the mapping is left unchanged
    Failed(String),
}

/// Report line for one mapped pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReport {
    /// Source path
    pub source_path: PathBuf,
    /// Target path
    pub target_path: PathBuf,
    /// Decision computed for the pair, if states could be read
    pub decision: Option<SyncDecision>,
    /// Result
    pub outcome: PairOutcome,
}

/// Result of a full or single-pair pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// One entry per pair visited
    pub pairs: Vec<PairReport>,
    /// Scan errors; the affected roots were skipped
    pub scan_errors: Vec<String>,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&PairOutcome) -> bool) -> usize {
        self.pairs.iter().filter(|p| pred(&p.outcome)).count()
    }

    /// Pairs where a missing side was created
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Created(_)))
    }

    /// Pairs where one side overwrote the other
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Updated(_)))
    }

    /// Pairs left alone, including deferred ones
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Skipped(_) | PairOutcome::Deferred(_)))
    }

    /// Pairs that produced a conflict copy
    #[must_use]
    pub fn conflicts(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Conflict(_)))
    }

    /// Skip counts keyed by reason label
    #[must_use]
    pub fn skip_reasons(&self) -> HashMap<&'static str, usize> {
        let mut reasons = HashMap::new();
        for pair in &self.pairs {
            let label = match &pair.outcome {
                PairOutcome::Skipped(reason) => reason.label(),
                PairOutcome::Deferred(why) => *why,
                _ => continue,
            };
            *reasons.entry(label).or_insert(0) += 1;
        }
        reasons
    }

    /// Every error message: scan errors first, then failed pairs
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        let failed = self.pairs.iter().filter_map(|p| match &p.outcome {
            PairOutcome::Failed(msg) => Some(format!("{}: {msg}", p.source_path.display())),
            _ => None,
        });
        self.scan_errors.iter().cloned().chain(failed).collect()
    }

    /// Total file writes performed
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.created() + self.updated() + self.conflicts()
    }

    /// Whether the pass finished without errors
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.scan_errors.is_empty() && !self.pairs.iter().any(|p| matches!(p.outcome, PairOutcome::Failed(_)))
    }

    /// Outcome recorded for `source_path`, if it was visited
    #[must_use]
    pub fn outcome_for(&self, source_path: &std::path::Path) -> Option<&PairOutcome> {
        self.pairs
            .iter()
            .find(|p| p.source_path == source_path)
            .map(|p| &p.outcome)
    }
}

/// A mapping removed by cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedMapping {
    /// Source path of the removed mapping
    pub source_path: PathBuf,
    /// Where its target file was moved, if it existed
    pub relocated_to: Option<PathBuf>,
}

/// Result of one cleanup run
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Orphaned mappings removed
    pub pruned: Vec<PrunedMapping>,
    /// Unlinked collection files moved: (from, to)
    pub unlinked_moved: Vec<(PathBuf, PathBuf)>,
    /// Failures; affected mappings stay for the next run
    pub errors: Vec<String>,
}

impl CleanupReport {
    /// Whether cleanup finished without errors
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A mapping waiting for manual resolution, with its conflict copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    /// The mapping in `conflict` status
    pub mapping: Mapping,
    /// Conflict copies next to the target, oldest first
    pub copies: Vec<PathBuf>,
}

/// Snapshot of the mapping store and daemon health
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Mappings in `active` status
    pub active: usize,
    /// Mappings in `conflict` status
    pub conflict: usize,
    /// Mappings in `orphaned` status
    pub orphaned: usize,
    /// Time of the last cleanup
    pub last_cleanup_at: Option<String>,
    /// Pid recorded by the daemon
    pub daemon_pid: Option<u32>,
    /// Last daemon heartbeat
    pub daemon_heartbeat: Option<String>,
}

impl StatusReport {
    /// Total mappings
    #[must_use]
    pub const fn total(&self) -> usize {
        self.active + self.conflict + self.orphaned
    }

    /// Whether a daemon pid is recorded and its heartbeat is at most
    /// `max_age_secs` old at `now`
    #[must_use]
    pub fn daemon_alive(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        if self.daemon_pid.is_none() {
            return false;
        }
        self.daemon_heartbeat
            .as_deref()
            .and_then(|beat| DateTime::parse_from_rfc3339(beat).ok())
            .is_some_and(|beat| (now - beat.with_timezone(&Utc)).num_seconds() <= max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, outcome: PairOutcome) -> PairReport {
        PairReport {
            source_path: PathBuf::from(format!("/src/{name}/README.md")),
            target_path: PathBuf::from(format!("/t/{name}.md")),
            decision: None,
            outcome,
        }
    }

    #[test]
    fn test_report_counters() {
        let report = SyncReport {
            pairs: vec![
                pair("a", PairOutcome::Created(Direction::SourceToTarget)),
                pair("b", PairOutcome::Updated(Direction::TargetToSource)),
                pair("c", PairOutcome::Skipped(SkipReason::Identical)),
                pair("d", PairOutcome::Deferred("path busy")),
                pair("e", PairOutcome::Failed("permission denied".to_string())),
            ],
            scan_errors: Vec::new(),
        };

        assert_eq!(report.created(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.conflicts(), 0);
        assert_eq!(report.total_operations(), 2);
        assert!(!report.is_success());
        assert_eq!(report.errors(), vec!["/src/e/README.md: permission denied".to_string()]);
        assert_eq!(report.skip_reasons().get("path busy"), Some(&1));
    }

    #[test]
    fn test_daemon_alive_requires_fresh_heartbeat() {
        let now = DateTime::parse_from_rfc3339("2026-05-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let mut status = StatusReport {
            daemon_pid: Some(42),
            daemon_heartbeat: Some("2026-05-01T11:59:30Z".to_string()),
            ..StatusReport::default()
        };
        assert!(status.daemon_alive(now, 90));

        status.daemon_heartbeat = Some("2026-05-01T11:50:00Z".to_string());
        assert!(!status.daemon_alive(now, 90));

        status.daemon_pid = None;
        status.daemon_heartbeat = Some("2026-05-01T11:59:59Z".to_string());
        assert!(!status.daemon_alive(now, 90));
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(SyncReport::default().is_success());
        assert_eq!(StatusReport::default().total(), 0);
    }
}
