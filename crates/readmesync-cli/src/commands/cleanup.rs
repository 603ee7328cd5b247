use std::path::Path;

use anyhow::Context;
use readmesync_core::SyncReporter;

use super::common::open_engine;

pub struct Cleanup;

impl Cleanup {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let report = engine.run_cleanup().context("Cleanup aborted")?;
        println!("{}", SyncReporter::generate_cleanup_summary(&report));
        Ok(())
    }
}
