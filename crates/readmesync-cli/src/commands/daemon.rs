use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use readmesync_core::DaemonContext;
use tracing::info;

use super::common::open_engine;

pub struct Daemon;

impl Daemon {
    pub fn execute(config_path: Option<&Path>, context: DaemonContext) -> anyhow::Result<()> {
        let engine = Arc::new(open_engine(config_path)?);
        info!("Press Ctrl+C to stop");
        readmesync_core::Daemon::new(engine, context)
            .run()
            .context("Daemon stopped with an error")
    }
}
