//! Source document discovery
//!
//! This module provides:
//! - The [`Scanner`] contract consumed by the sync engine
//! - [`FsScanner`], walking every configured source root with walkdir
//! - Target naming and per-pass name allocation
//! - Listing of the documents currently in the collection

mod disambiguate;
mod naming;


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

pub use disambiguate::NameAllocator;
pub use naming::{clean_project_name, project_name, target_file_name};

use crate::config::{Config, NamingRules, PatternMatcher};
use crate::error::{Result, SyncError};

/// A discovered source document with its proposed target name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSource {
    /// Absolute path of the source document
    pub source_path: PathBuf,
    /// Project name extracted from the path
    pub project_name: String,
    /// Proposed file name inside the collection, before disambiguation
    pub target_name: String,
}

/// Result of scanning every source root
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Discovered sources, unique and ordered by source path
    pub sources: Vec<ScannedSource>,
    /// Roots or entries that could not be read
    pub errors: Vec<SyncError>,
}

/// Produces candidate source documents
pub trait Scanner: Send + Sync {
    /// Walk every root and report the documents found
    fn scan(&self) -> ScanOutcome;

    /// Describe a single path as a source, if it qualifies as one
    fn propose(&self, path: &Path) -> Option<ScannedSource>;
}

/// Filesystem scanner driven by the configuration
pub struct FsScanner {
    roots: Vec<PathBuf>,
    target_root: PathBuf,
    matcher: PatternMatcher,
    file_names: Vec<String>,
    naming: NamingRules,
}

impl FsScanner {
    /// Build a scanner from a finalized configuration
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Pattern`] if an exclusion does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            roots: config.source_folders.clone(),
            target_root: config.target_folder.clone(),
            matcher: PatternMatcher::with_exclusions(&config.exclusions)?,
            file_names: config.file_names.iter().map(|n| n.to_lowercase()).collect(),
            naming: config.naming.clone(),
        })
    }

    fn matches_file_name(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| {
            let name = name.to_string_lossy().to_lowercase();
            self.file_names.iter().any(|wanted| *wanted == name)
        })
    }

    fn describe(&self, path: &Path) -> ScannedSource {
        let project = project_name(path);
        ScannedSource {
            source_path: path.to_path_buf(),
            target_name: target_file_name(&project, &self.naming),
            project_name: project,
        }
    }

    fn scan_root(
        &self,
        root: &Path,
        found: &mut BTreeMap<PathBuf, ScannedSource>,
        errors: &mut Vec<SyncError>,
    ) {
        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.path().starts_with(&self.target_root) {
                return false;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or_else(|_| entry.path());
            !self.matcher.is_excluded(rel, entry.file_type().is_dir())
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let at_root = source.depth() == 0;
                    warn!("Scan error under {}: {}", root.display(), source);
                    errors.push(SyncError::Scan {
                        root: root.to_path_buf(),
                        source,
                    });
                    if at_root {
                        return;
                    }
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches_file_name(entry.path()) {
                let path = entry.into_path();
                found.entry(path.clone()).or_insert_with(|| self.describe(&path));
            }
        }
    }
}

impl Scanner for FsScanner {
    fn scan(&self) -> ScanOutcome {
        let mut found = BTreeMap::new();
        let mut errors = Vec::new();

        for root in &self.roots {
            let before = found.len();
            self.scan_root(root, &mut found, &mut errors);
            debug!("Found {} source documents under {}", found.len() - before, root.display());
        }

        ScanOutcome {
            sources: found.into_values().collect(),
            errors,
        }
    }

    fn propose(&self, path: &Path) -> Option<ScannedSource> {
        if path.starts_with(&self.target_root) || !self.matches_file_name(path) {
            return None;
        }

        let root = self.roots.iter().find(|root| path.starts_with(root))?;
        let rel = path.strip_prefix(root).ok()?;
        if self.matcher.is_excluded_with_parents(rel) {
            return None;
        }

        Some(self.describe(path))
    }
}

/// List the Markdown documents in the collection, skipping the unlinked folder
///
/// Unreadable entries are logged and skipped. The result is sorted.
#[must_use]
pub fn scan_target_files(target_root: &Path, unlinked_subfolder: &str) -> Vec<PathBuf> {
    let unlinked = target_root.join(unlinked_subfolder);
    let mut files: Vec<PathBuf> = WalkDir::new(target_root)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(&unlinked))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                if e.depth() > 0 {
                    warn!("Skipping unreadable collection entry: {e}");
                }
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_markdown(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Whether the path has a `.md` extension, in any case
#[must_use]
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
