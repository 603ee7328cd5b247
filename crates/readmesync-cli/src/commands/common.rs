use std::path::Path;

use anyhow::Context;
use readmesync_core::{ConfigManager, SyncEngine};
use tracing::debug;

/// Load configuration and open the engine
pub fn open_engine(config_path: Option<&Path>) -> anyhow::Result<SyncEngine> {
    let config = ConfigManager::load(config_path).context("Failed to load configuration")?;
    debug!(
        "Loaded configuration: {} source folder(s), target {}",
        config.source_folders.len(),
        config.target_folder.display()
    );
    SyncEngine::from_config(config).context("Failed to initialize sync engine")
}
