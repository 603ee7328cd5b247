//! Sync operation reporting and statistics

use std::fmt::Write;
use std::path::PathBuf;

use super::{CleanupReport, ConflictEntry, PairOutcome, StatusReport, SyncReport};
use crate::store::Mapping;

/// Sync operation reporter
pub struct SyncReporter;

impl SyncReporter {
    /// Generate a summary of a sync pass
    #[must_use]
    pub fn generate_summary(report: &SyncReport) -> String {
        let mut output = String::new();

        output.push_str("\n=== Sync Summary ===\n");
        let _ = writeln!(output, "Created:  {}", report.created());
        let _ = writeln!(output, "Updated:  {}", report.updated());

        let skip_reasons = report.skip_reasons();
        if report.skipped() > 0 && !skip_reasons.is_empty() {
            let _ = write!(output, "Skipped:  {}", report.skipped());
            let mut reasons: Vec<_> = skip_reasons.into_iter().collect();
            reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            for (reason, count) in reasons {
                let _ = write!(output, " ({reason}: {count})");
            }
            let _ = writeln!(output);
        } else {
            let _ = writeln!(output, "Skipped:  {}", report.skipped());
        }

        let _ = writeln!(output, "Conflicts: {}", report.conflicts());
        for pair in &report.pairs {
            if let PairOutcome::Conflict(record) = &pair.outcome {
                let _ = writeln!(
                    output,
                    "  - {} ({}) -> {}",
                    pair.source_path.display(),
                    record.resolution,
                    record.conflict_copy.display()
                );
            }
        }

        let errors = report.errors();
        if !errors.is_empty() {
            let _ = writeln!(output, "\nErrors ({}):", errors.len());
            for error in &errors {
                let _ = writeln!(output, "  - {error}");
            }
        }

        let _ = writeln!(output, "\nTotal operations: {}", report.total_operations());

        if report.is_success() {
            output.push_str("Status: ✓ Success\n");
        } else {
            output.push_str("Status: ✗ Completed with errors\n");
        }

        output
    }

    /// Generate a summary of a cleanup run
    #[must_use]
    pub fn generate_cleanup_summary(report: &CleanupReport) -> String {
        let mut output = String::new();

        output.push_str("\n=== Cleanup Summary ===\n");
        let _ = writeln!(output, "Orphaned mappings removed: {}", report.pruned.len());
        for pruned in &report.pruned {
            match &pruned.relocated_to {
                Some(dest) => {
                    let _ = writeln!(output, "  - {} (target moved to {})", pruned.source_path.display(), dest.display());
                }
                None => {
                    let _ = writeln!(output, "  - {}", pruned.source_path.display());
                }
            }
        }
        let _ = writeln!(output, "Unlinked files moved: {}", report.unlinked_moved.len());

        if !report.errors.is_empty() {
            let _ = writeln!(output, "\nErrors ({}):", report.errors.len());
            for error in &report.errors {
                let _ = writeln!(output, "  - {error}");
            }
        }

        if report.is_success() {
            output.push_str("Status: ✓ Success\n");
        } else {
            output.push_str("Status: ✗ Completed with errors\n");
        }

        output
    }

    /// Generate a status overview
    #[must_use]
    pub fn generate_status(status: &StatusReport, daemon_running: bool) -> String {
        let mut output = String::new();

        output.push_str("\n=== Status ===\n");
        let _ = writeln!(output, "Mappings: {}", status.total());
        let _ = writeln!(output, "  active:   {}", status.active);
        let _ = writeln!(output, "  conflict: {}", status.conflict);
        let _ = writeln!(output, "  orphaned: {}", status.orphaned);
        let _ = writeln!(
            output,
            "Last cleanup: {}",
            status.last_cleanup_at.as_deref().unwrap_or("never")
        );

        match (status.daemon_pid, daemon_running) {
            (Some(pid), true) => {
                let _ = writeln!(
                    output,
                    "Daemon: running (pid {pid}, heartbeat {})",
                    status.daemon_heartbeat.as_deref().unwrap_or("unknown")
                );
            }
            _ => output.push_str("Daemon: not running\n"),
        }

        output
    }

    /// Generate a listing of every mapping
    #[must_use]
    pub fn generate_mappings(mappings: &[Mapping]) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\n=== Mappings ({}) ===", mappings.len());
        for mapping in mappings {
            let _ = writeln!(
                output,
                "[{}] {} -> {}",
                mapping.status,
                mapping.source_path.display(),
                mapping.target_path.display()
            );
            if let Some(at) = mapping.last_synced_at {
                let _ = writeln!(output, "    last synced {}", at.to_rfc3339());
            }
        }
        if mappings.is_empty() {
            output.push_str("No mappings recorded\n");
        }

        output
    }

    /// Generate a preview of unlinked collection files
    #[must_use]
    pub fn generate_unlinked(files: &[PathBuf]) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\n=== Unlinked Files ({}) ===", files.len());
        for file in files {
            let _ = writeln!(output, "  - {}", file.display());
        }
        if files.is_empty() {
            output.push_str("Every collection file has a mapping\n");
        }

        output
    }

    /// Generate a listing of unresolved conflicts
    #[must_use]
    pub fn generate_conflicts(conflicts: &[ConflictEntry]) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\n=== Conflicts ({}) ===", conflicts.len());
        for entry in conflicts {
            let _ = writeln!(
                output,
                "{} <-> {}",
                entry.mapping.source_path.display(),
                entry.mapping.target_path.display()
            );
            for copy in &entry.copies {
                let _ = writeln!(output, "    copy: {}", copy.display());
            }
        }
        if conflicts.is_empty() {
            output.push_str("No unresolved conflicts\n");
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{Direction, SkipReason};
    use crate::sync::PairReport;
    use std::path::PathBuf;

    #[test]
    fn test_summary_lists_counts_and_reasons() {
        let report = SyncReport {
            pairs: vec![
                PairReport {
                    source_path: PathBuf::from("/s/a/README.md"),
                    target_path: PathBuf::from("/t/a.md"),
                    decision: None,
                    outcome: PairOutcome::Created(Direction::SourceToTarget),
                },
                PairReport {
                    source_path: PathBuf::from("/s/b/README.md"),
                    target_path: PathBuf::from("/t/b.md"),
                    decision: None,
                    outcome: PairOutcome::Skipped(SkipReason::Identical),
                },
            ],
            scan_errors: Vec::new(),
        };

        let summary = SyncReporter::generate_summary(&report);
        assert!(summary.contains("=== Sync Summary ==="));
        assert!(summary.contains("Created:  1"));
        assert!(summary.contains("Skipped:  1 (identical content: 1)"));
        assert!(summary.contains("Success"));
    }

    #[test]
    fn test_summary_shows_errors() {
        let report = SyncReport {
            pairs: Vec::new(),
            scan_errors: vec!["failed to scan /missing".to_string()],
        };
        let summary = SyncReporter::generate_summary(&report);
        assert!(summary.contains("Errors (1):"));
        assert!(summary.contains("Completed with errors"));
    }

    #[test]
    fn test_status_without_daemon() {
        let status = StatusReport {
            active: 2,
            ..StatusReport::default()
        };
        let text = SyncReporter::generate_status(&status, false);
        assert!(text.contains("Mappings: 2"));
        assert!(text.contains("Last cleanup: never"));
        assert!(text.contains("Daemon: not running"));
    }

    #[test]
    fn test_mappings_listing() {
        let mut conflicted = Mapping::new(PathBuf::from("/s/b/README.md"), PathBuf::from("/t/b.md"));
        conflicted.status = crate::store::MappingStatus::Conflict;
        let mappings = vec![
            Mapping::new(PathBuf::from("/s/a/README.md"), PathBuf::from("/t/a.md")),
            conflicted,
        ];

        let text = SyncReporter::generate_mappings(&mappings);
        assert!(text.contains("=== Mappings (2) ==="));
        assert!(text.contains("[active] /s/a/README.md -> /t/a.md"));
        assert!(text.contains("[conflict] /s/b/README.md -> /t/b.md"));
        assert!(SyncReporter::generate_mappings(&[]).contains("No mappings recorded"));
    }

    #[test]
    fn test_unlinked_and_conflict_listings() {
        let text = SyncReporter::generate_unlinked(&[PathBuf::from("/t/stray.md")]);
        assert!(text.contains("=== Unlinked Files (1) ==="));
        assert!(text.contains("  - /t/stray.md"));

        let entry = ConflictEntry {
            mapping: Mapping::new(PathBuf::from("/s/a/README.md"), PathBuf::from("/t/a.md")),
            copies: vec![PathBuf::from("/t/a.md.conflict-20260101-120000")],
        };
        let text = SyncReporter::generate_conflicts(&[entry]);
        assert!(text.contains("/s/a/README.md <-> /t/a.md"));
        assert!(text.contains("copy: /t/a.md.conflict-20260101-120000"));
        assert!(SyncReporter::generate_conflicts(&[]).contains("No unresolved conflicts"));
    }
}
