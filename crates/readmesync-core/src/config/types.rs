//! Configuration types and structures

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::comparison::ConflictResolution;

/// Letter case applied to generated target file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// Leave the project name as found
    #[default]
    Keep,
    /// Lowercase the whole file name
    Lower,
    /// Uppercase the whole file name
    Upper,
}

/// How target file names are derived from the project name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Pattern containing `{project_name}`
    pub pattern: String,
    /// Case transformation
    pub case_style: CaseStyle,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            pattern: "{project_name}-README".to_string(),
            case_style: CaseStyle::Keep,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Roots scanned for source documents
    pub source_folders: Vec<PathBuf>,

    /// Collection directory that mirrors every source document
    pub target_folder: PathBuf,

    /// Policy applied when both sides differ
    pub conflict_resolution: ConflictResolution,

    /// Mtime difference treated as a simultaneous edit
    pub tolerance_seconds: u64,

    /// Seconds between periodic full passes in the daemon
    pub auto_sync_interval: u64,

    /// Seconds a just-written path is ignored by the watcher
    pub sync_cooldown: u64,

    /// Quiet period before a burst of events for one path is processed
    pub debounce_seconds: u64,

    /// Seconds between cleanup runs (minimum 60)
    pub cleanup_interval: u64,

    /// Relocate target files without an active mapping
    pub move_unlinked_files: bool,

    /// Folder under the target root receiving unlinked files
    pub unlinked_subfolder: String,

    /// Recreate deleted sources from their target copy
    pub reverse_sync: bool,

    /// Gitignore-style patterns excluded from source scans
    pub exclusions: Vec<String>,

    /// Source file names to collect, matched case-insensitively
    pub file_names: Vec<String>,

    /// Target naming rules
    pub naming: NamingRules,

    /// Mapping store location (defaults next to the config file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folders: Vec::new(),
            target_folder: PathBuf::new(),
            conflict_resolution: ConflictResolution::Latest,
            tolerance_seconds: 5,
            auto_sync_interval: 300,
            sync_cooldown: 3,
            debounce_seconds: 2,
            cleanup_interval: 3600,
            move_unlinked_files: true,
            unlinked_subfolder: "unlinked".to_string(),
            reverse_sync: true,
            exclusions: [
                "node_modules",
                ".git",
                "venv",
                "__pycache__",
                ".DS_Store",
                "*.tmp",
                "*.log",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            file_names: vec!["README.md".to_string()],
            naming: NamingRules::default(),
            database_path: None,
        }
    }
}

impl Config {
    /// Directory receiving unlinked target files
    #[must_use]
    pub fn unlinked_dir(&self) -> PathBuf {
        self.target_folder.join(&self.unlinked_subfolder)
    }
}
