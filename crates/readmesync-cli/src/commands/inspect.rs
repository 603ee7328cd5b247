use std::path::Path;

use anyhow::Context;
use readmesync_core::SyncReporter;

use super::common::open_engine;

pub struct Mappings;

impl Mappings {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let mappings = engine.mappings().context("Failed to read mapping store")?;
        println!("{}", SyncReporter::generate_mappings(&mappings));
        Ok(())
    }
}

pub struct ListUnlinked;

impl ListUnlinked {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let files = engine.list_unlinked().context("Failed to read mapping store")?;
        println!("{}", SyncReporter::generate_unlinked(&files));
        Ok(())
    }
}

pub struct Conflicts;

impl Conflicts {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let conflicts = engine.conflicts().context("Failed to read mapping store")?;
        println!("{}", SyncReporter::generate_conflicts(&conflicts));
        Ok(())
    }
}
