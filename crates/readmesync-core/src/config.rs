//! Configuration file parsing and management
//!
//! This module handles:
//! - Config file discovery (CLI flag, environment, per-user directory)
//! - YAML parsing with serde
//! - Path normalization (`~` expansion, canonical roots)
//! - Gitignore-style exclusion matching
//! - Validation and error reporting

mod discovery;
mod patterns;
mod types;
mod validation;

use std::fs;
use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_ENV_VAR, ConfigDiscovery};
pub use patterns::PatternMatcher;
pub use types::{CaseStyle, Config, NamingRules};
pub use validation::{ConfigValidator, MIN_CLEANUP_INTERVAL};

use crate::error::{Result, SyncError};

/// Mapping store file name used when `database_path` is not set
pub const DEFAULT_DATABASE_NAME: &str = "mappings.db";

/// Configuration manager that coordinates discovery, parsing and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load, normalize and validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if no config file is found, it cannot be
    /// read or parsed, or validation fails.
    pub fn load(cli_config_path: Option<&Path>) -> Result<Config> {
        let path = ConfigDiscovery::discover(cli_config_path).ok_or_else(|| {
            SyncError::config(
                "no configuration file found (use --config or set READMESYNC_CONFIG)",
            )
        })?;
        Self::load_from(&path)
    }

    /// Load a configuration from an explicit file
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::parse(&content)
            .map_err(|e| SyncError::config(format!("{}: {e}", path.display())))?;

        if config.database_path.is_none() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            config.database_path = Some(dir.join(DEFAULT_DATABASE_NAME));
        }

        Self::finalize(config)
    }

    /// Parse YAML text without normalizing or validating
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] on malformed YAML.
    pub fn parse(content: &str) -> Result<Config> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str(content).map_err(|e| SyncError::config(e.to_string()))
    }

    /// Normalize paths and validate an in-memory configuration
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if validation fails.
    pub fn finalize(mut config: Config) -> Result<Config> {
        config.source_folders = config
            .source_folders
            .iter()
            .map(PathBuf::as_path)
            .map(normalize_root)
            .collect();
        config.target_folder = normalize_root(&config.target_folder);
        config.database_path = config.database_path.as_deref().map(expand_home);

        ConfigValidator::validate(&config)?;
        PatternMatcher::with_exclusions(&config.exclusions)?;

        Ok(config)
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

/// Expand `~` and canonicalize roots that exist
fn normalize_root(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return PathBuf::new();
    }
    let expanded = expand_home(path);
    dunce::canonicalize(&expanded).unwrap_or(expanded)
}
