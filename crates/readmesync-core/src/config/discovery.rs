//! Configuration file discovery

use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "READMESYNC_CONFIG";

/// Config file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Config file discovery
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Locate the configuration file
    ///
    /// Precedence: explicit CLI path, then `$READMESYNC_CONFIG`, then the
    /// per-user config directory. An explicit path is returned even when it
    /// does not exist so the caller can report it.
    #[must_use]
    pub fn discover(cli_path: Option<&Path>) -> Option<PathBuf> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::discover_with(cli_path, env_path, Self::default_config_path())
    }

    fn discover_with(
        cli_path: Option<&Path>,
        env_path: Option<PathBuf>,
        default_path: Option<PathBuf>,
    ) -> Option<PathBuf> {
        if let Some(path) = cli_path {
            return Some(path.to_path_buf());
        }

        if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
            return Some(path);
        }

        default_path.filter(|p| p.is_file())
    }

    /// Per-user config file location, whether or not it exists
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("readmesync").join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_path_wins() {
        let tmp = TempDir::new().unwrap();
        let cli = tmp.path().join("cli.yaml");
        let env = tmp.path().join("env.yaml");

        let found = ConfigDiscovery::discover_with(Some(&cli), Some(env), None);
        assert_eq!(found, Some(cli));
    }

    #[test]
    fn test_env_path_before_default() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join("env.yaml");
        let default = tmp.path().join("default.yaml");
        fs::write(&default, "").unwrap();

        let found = ConfigDiscovery::discover_with(None, Some(env.clone()), Some(default));
        assert_eq!(found, Some(env));
    }

    #[test]
    fn test_missing_default_is_none() {
        let tmp = TempDir::new().unwrap();
        let default = tmp.path().join("missing.yaml");

        let found = ConfigDiscovery::discover_with(None, None, Some(default));
        assert!(found.is_none());
    }

    #[test]
    fn test_existing_default_is_found() {
        let tmp = TempDir::new().unwrap();
        let default = tmp.path().join("config.yaml");
        fs::write(&default, "target_folder: /notes").unwrap();

        let found = ConfigDiscovery::discover_with(None, None, Some(default.clone()));
        assert_eq!(found, Some(default));
    }
}
