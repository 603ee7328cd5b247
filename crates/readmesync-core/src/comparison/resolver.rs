//! Pure per-pair decision function
//!
//! Given the recorded mapping and the two observed file states, decide which
//! side is authoritative. No I/O happens here.

use super::{ConflictResolution, Direction, FileState};
use crate::store::{Mapping, MappingStatus};

/// Why a pair needs no file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Neither file exists; the mapping is an orphan candidate
    NeitherExists,
    /// Source is gone and reverse sync is disabled
    SourceMissing,
    /// Content hashes are equal
    Identical,
    /// A conflict copy was already written and nothing changed since
    ConflictPending,
}

impl SkipReason {
    /// Short label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NeitherExists => "neither side exists",
            Self::SourceMissing => "source missing",
            Self::Identical => "identical content",
            Self::ConflictPending => "conflict pending",
        }
    }
}

/// Decision for one mapped pair in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDecision {
    /// Copy source to a target that does not exist yet
    CreateTarget,
    /// Copy target back to a source that no longer exists
    CreateSource,
    /// Overwrite target with source
    PushSourceToTarget,
    /// Overwrite source with target
    PushTargetToSource,
    /// Save the target's content as a conflict copy, then optionally push
    ForkConflict {
        /// Push applied after the copy is written; `None` leaves both files
        then: Option<Direction>,
    },
    /// No file operation
    Skip(SkipReason),
}

impl SyncDecision {
    /// Whether this decision writes to the source side
    #[must_use]
    pub const fn writes_source(self) -> bool {
        matches!(
            self,
            Self::CreateSource
                | Self::PushTargetToSource
                | Self::ForkConflict {
                    then: Some(Direction::TargetToSource)
                }
        )
    }

    /// Short label used in reports and logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreateTarget => "create-target",
            Self::CreateSource => "create-source",
            Self::PushSourceToTarget => "push-source-to-target",
            Self::PushTargetToSource => "push-target-to-source",
            Self::ForkConflict { .. } => "fork-conflict",
            Self::Skip(_) => "skip",
        }
    }
}

/// Settings the decision depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Configured conflict policy
    pub policy: ConflictResolution,
    /// Mtime window treated as a simultaneous edit
    pub tolerance_seconds: u64,
    /// Whether a missing source is recreated from its target
    pub reverse_sync: bool,
}

/// Conflict resolver
pub struct ConflictResolver;

impl ConflictResolver {
    /// Decide the action for one pair
    #[must_use]
    pub fn resolve(
        mapping: Option<&Mapping>,
        source: &FileState,
        target: &FileState,
        options: &ResolveOptions,
    ) -> SyncDecision {
        match (source.exists, target.exists) {
            (false, false) => return SyncDecision::Skip(SkipReason::NeitherExists),
            (true, false) => return SyncDecision::CreateTarget,
            (false, true) => {
                return if options.reverse_sync {
                    SyncDecision::CreateSource
                } else {
                    SyncDecision::Skip(SkipReason::SourceMissing)
                };
            }
            (true, true) => {}
        }

        if source.hash == target.hash {
            return SyncDecision::Skip(SkipReason::Identical);
        }

        if options.policy == ConflictResolution::Manual {
            return if Self::conflict_already_recorded(mapping, source, target) {
                SyncDecision::Skip(SkipReason::ConflictPending)
            } else {
                SyncDecision::ForkConflict { then: None }
            };
        }

        let source_mtime = source.mtime.unwrap_or_default();
        let target_mtime = target.mtime.unwrap_or_default();
        let simultaneous = source_mtime.abs_diff(target_mtime) <= options.tolerance_seconds;

        let winner = match options.policy {
            ConflictResolution::TargetPriority => Direction::TargetToSource,
            ConflictResolution::Latest if !simultaneous && target_mtime > source_mtime => {
                Direction::TargetToSource
            }
            _ => Direction::SourceToTarget,
        };

        match (simultaneous, winner) {
            (true, then) => SyncDecision::ForkConflict { then: Some(then) },
            (false, Direction::SourceToTarget) => SyncDecision::PushSourceToTarget,
            (false, Direction::TargetToSource) => SyncDecision::PushTargetToSource,
        }
    }

    fn conflict_already_recorded(
        mapping: Option<&Mapping>,
        source: &FileState,
        target: &FileState,
    ) -> bool {
        mapping.is_some_and(|m| {
            m.status == MappingStatus::Conflict
                && m.source_hash == source.hash
                && m.target_hash == target.hash
        })
    }
}
