//! Periodic cleanup of orphaned mappings and unlinked collection files

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tracing::{info, warn};

use super::executor::FileOperationExecutor;
use super::orchestrator::SyncEngine;
use super::{CleanupReport, META_LAST_CLEANUP, PrunedMapping};
use crate::error::Result;
use crate::store::{Mapping, MappingStatus, is_under_any};

impl SyncEngine {
    /// Prune orphaned mappings and move unlinked collection files aside
    ///
    /// Targets the user moved inside the collection are followed first, so
    /// they are never mistaken for unlinked files. Target files are never
    /// deleted; they are moved into the unlinked subfolder. Runs under the
    /// pass lock, so it never overlaps a sync pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable)
    /// if the mapping store fails. File errors are recorded in the report.
    pub fn run_cleanup(&self) -> Result<CleanupReport> {
        let _pass = self.lock_pass();
        let mut report = CleanupReport::default();
        let stamp = FileOperationExecutor::stamp(Local::now());
        let unlinked_dir = self.config.unlinked_dir();

        let orphans = self.store.list_orphaned(&self.config.source_folders)?;
        for mapping in orphans.iter().filter(|m| self.should_prune(m)) {
            self.store.set_status(&mapping.source_path, MappingStatus::Orphaned)?;

            let relocated_to = if mapping.target_path.is_file() {
                match self.relocate(&mapping.target_path, &unlinked_dir, &stamp) {
                    Ok(dest) => Some(dest),
                    Err(error) => {
                        warn!("Keeping orphaned mapping for retry: {error}");
                        report.errors.push(error.to_string());
                        continue;
                    }
                }
            } else {
                None
            };

            self.store.delete(&mapping.source_path)?;
            info!("Removed orphaned mapping for {}", mapping.source_path.display());
            report.pruned.push(PrunedMapping {
                source_path: mapping.source_path.clone(),
                relocated_to,
            });
        }

        let mut remaining: Vec<Mapping> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|m| m.status != MappingStatus::Orphaned)
            .collect();
        let mut unlinked = self.unmapped_targets(remaining.iter());
        let moved = Self::detect_moved_targets(remaining.iter_mut(), &mut unlinked);
        self.store.upsert_many(&moved)?;

        if self.config.move_unlinked_files {
            for file in unlinked {
                match self.relocate(&file, &unlinked_dir, &stamp) {
                    Ok(dest) => {
                        info!("Moved unlinked file {} -> {}", file.display(), dest.display());
                        report.unlinked_moved.push((file, dest));
                    }
                    Err(error) => {
                        warn!("{error}");
                        report.errors.push(error.to_string());
                    }
                }
            }
        }

        self.store.set_meta(META_LAST_CLEANUP, &Utc::now().to_rfc3339())?;
        Ok(report)
    }

    /// Whether an orphan candidate is removed now
    ///
    /// With reverse sync a vanished source under a configured root is
    /// restored by the next pass, so only out-of-root mappings and pairs with
    /// nothing left on either side are pruned.
    fn should_prune(&self, mapping: &Mapping) -> bool {
        if !is_under_any(&mapping.source_path, &self.config.source_folders) {
            return true;
        }
        !self.config.reverse_sync || !mapping.target_path.exists()
    }

    fn relocate(&self, file: &Path, dir: &Path, stamp: &str) -> Result<PathBuf> {
        let dest = FileOperationExecutor::relocate(file, dir, stamp)?;
        self.guard.mark_synced(file);
        self.guard.mark_synced(&dest);
        Ok(dest)
    }
}
