use std::path::Path;

use anyhow::Context;
use readmesync_core::SyncReporter;

use super::common::open_engine;

pub struct SyncFile;

impl SyncFile {
    pub fn execute(config_path: Option<&Path>, path: &Path) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let path = dunce::canonicalize(path)
            .unwrap_or_else(|_| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));

        let report = engine
            .run_single_pair_sync(&path)
            .with_context(|| format!("Sync of {} aborted", path.display()))?;

        if report.pairs.is_empty() {
            println!("{} is not a tracked document", path.display());
        } else {
            println!("{}", SyncReporter::generate_summary(&report));
        }
        Ok(())
    }
}
