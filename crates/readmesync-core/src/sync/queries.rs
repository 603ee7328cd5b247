//! Read-only views over the mapping store and the collection

use std::fs;
use std::path::{Path, PathBuf};

use super::ConflictEntry;
use super::executor::CONFLICT_MARKER;
use super::orchestrator::SyncEngine;
use crate::error::Result;
use crate::store::{Mapping, MappingStatus};

impl SyncEngine {
    /// Every stored mapping, ordered by source path
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable)
    /// if the mapping store fails.
    pub fn mappings(&self) -> Result<Vec<Mapping>> {
        self.store.list_all()
    }

    /// Mappings in `conflict` status and the copies written for them
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable)
    /// if the mapping store fails.
    pub fn conflicts(&self) -> Result<Vec<ConflictEntry>> {
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .filter(|m| m.status == MappingStatus::Conflict)
            .map(|mapping| {
                let copies = conflict_copies(&mapping.target_path);
                ConflictEntry { mapping, copies }
            })
            .collect())
    }

    /// Collection files the next cleanup would move aside
    ///
    /// Nothing is moved and nothing is persisted; moved targets are followed
    /// in memory only.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable)
    /// if the mapping store fails.
    pub fn list_unlinked(&self) -> Result<Vec<PathBuf>> {
        let _pass = self.lock_pass();
        let mut remaining: Vec<Mapping> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|m| m.status != MappingStatus::Orphaned)
            .collect();
        let mut unlinked = self.unmapped_targets(remaining.iter());
        Self::detect_moved_targets(remaining.iter_mut(), &mut unlinked);
        Ok(unlinked)
    }
}

/// Siblings of `target` named `<target>.conflict-*`, sorted
fn conflict_copies(target: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(name)) = (target.parent(), target.file_name()) else {
        return Vec::new();
    };
    let prefix = format!("{}{CONFLICT_MARKER}", name.to_string_lossy());

    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut copies: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
        })
        .collect();
    copies.sort();
    copies
}
