//! Configuration validation and error reporting

use std::path::Component;

use super::types::Config;
use crate::error::{Result, SyncError};

/// Shortest accepted cleanup interval in seconds
pub const MIN_CLEANUP_INTERVAL: u64 = 60;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] describing the first problem found.
    pub fn validate(config: &Config) -> Result<()> {
        if config.source_folders.is_empty() {
            return Err(SyncError::config("at least one source folder is required"));
        }

        if config.target_folder.as_os_str().is_empty() {
            return Err(SyncError::config("target_folder is required"));
        }

        if config
            .source_folders
            .iter()
            .any(|source| source == &config.target_folder)
        {
            return Err(SyncError::config(format!(
                "target folder {} is also listed as a source folder",
                config.target_folder.display()
            )));
        }

        if config.cleanup_interval < MIN_CLEANUP_INTERVAL {
            return Err(SyncError::config(format!(
                "cleanup_interval must be at least {MIN_CLEANUP_INTERVAL} seconds (got {})",
                config.cleanup_interval
            )));
        }

        let mut components = std::path::Path::new(&config.unlinked_subfolder).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal {
            return Err(SyncError::config(format!(
                "unlinked_subfolder must be a single folder name (got '{}')",
                config.unlinked_subfolder
            )));
        }

        for pattern in &config.exclusions {
            if pattern.trim().is_empty() {
                return Err(SyncError::config("exclusion pattern cannot be empty"));
            }
        }

        if config.file_names.iter().all(|name| name.trim().is_empty()) {
            return Err(SyncError::config("file_names must name at least one file"));
        }

        if !config.naming.pattern.contains("{project_name}") {
            return Err(SyncError::config(
                "naming.pattern must contain the {project_name} placeholder",
            ));
        }

        Ok(())
    }
}
