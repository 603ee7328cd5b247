use std::path::Path;

use anyhow::Context;
use readmesync_core::SyncReporter;

use super::common::open_engine;

pub struct Sync;

impl Sync {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let report = engine.run_full_sync().context("Sync pass aborted")?;
        println!("{}", SyncReporter::generate_summary(&report));
        Ok(())
    }
}
