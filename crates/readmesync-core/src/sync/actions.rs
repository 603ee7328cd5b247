//! Per-pair planning and mapping bookkeeping

use chrono::Utc;

use crate::comparison::{FileState, SkipReason, SyncDecision};
use crate::store::{Mapping, MappingStatus};

/// Pass phase in which a decision is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    /// Writes only collection files
    Forward,
    /// Writes source files; applied after forward changes are persisted
    Reverse,
    /// No file write
    Idle,
}

impl Phase {
    pub(super) const fn of(decision: SyncDecision) -> Self {
        if decision.writes_source() {
            Self::Reverse
        } else if matches!(decision, SyncDecision::Skip(_)) {
            Self::Idle
        } else {
            Self::Forward
        }
    }
}

/// A pair scheduled for the current pass
#[derive(Debug, Clone)]
pub(super) struct PlannedPair {
    /// Row as stored before the pass; `None` for a new source
    pub stored: Option<Mapping>,
    /// Mapping to act on, possibly with a relocated or adopted target
    pub working: Mapping,
}

impl PlannedPair {
    pub(super) const fn new_source(working: Mapping) -> Self {
        Self {
            stored: None,
            working,
        }
    }

    pub(super) fn existing(mapping: Mapping) -> Self {
        Self {
            stored: Some(mapping.clone()),
            working: mapping,
        }
    }

    /// Whether the target path differs from the stored one
    pub(super) fn relocated(&self) -> bool {
        self.stored
            .as_ref()
            .is_some_and(|m| m.target_path != self.working.target_path)
    }

    /// Mapping to persist when the decision wrote nothing
    pub(super) fn idle_update(
        &self,
        reason: SkipReason,
        source: &FileState,
        target: &FileState,
    ) -> Option<Mapping> {
        match reason {
            SkipReason::Identical => {
                let refreshed = with_states(&self.working, source, target, MappingStatus::Active);
                let unchanged = self.stored.as_ref().is_some_and(|m| {
                    m.source_hash == refreshed.source_hash
                        && m.target_hash == refreshed.target_hash
                        && m.source_mtime == refreshed.source_mtime
                        && m.target_mtime == refreshed.target_mtime
                        && m.target_path == refreshed.target_path
                        && m.status == MappingStatus::Active
                });
                (!unchanged).then_some(refreshed)
            }
            SkipReason::NeitherExists | SkipReason::SourceMissing | SkipReason::ConflictPending => {
                self.relocated().then(|| self.working.clone())
            }
        }
    }
}

/// Copy of `mapping` recording both observed states
pub(super) fn with_states(
    mapping: &Mapping,
    source: &FileState,
    target: &FileState,
    status: MappingStatus,
) -> Mapping {
    Mapping {
        source_hash: source.hash.clone(),
        target_hash: target.hash.clone(),
        source_mtime: source.mtime,
        target_mtime: target.mtime,
        status,
        ..mapping.clone()
    }
}

/// Mapping after a successful write
pub(super) fn after_write(
    mapping: &Mapping,
    source: &FileState,
    target: &FileState,
    status: MappingStatus,
) -> Mapping {
    Mapping {
        last_synced_at: Some(Utc::now()),
        ..with_states(mapping, source, target, status)
    }
}
