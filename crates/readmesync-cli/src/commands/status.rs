use std::path::Path;

use anyhow::Context;
use readmesync_core::SyncReporter;
use readmesync_core::daemon::HEARTBEAT_INTERVAL;

use super::common::open_engine;

/// Heartbeats older than this many intervals mean the daemon is gone
const STALE_HEARTBEATS: u64 = 3;

pub struct Status;

impl Status {
    pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
        let engine = open_engine(config_path)?;
        let status = engine.status().context("Failed to read mapping store")?;

        let max_age = i64::try_from(HEARTBEAT_INTERVAL * STALE_HEARTBEATS).unwrap_or(i64::MAX);
        let running = status.daemon_alive(chrono::Utc::now(), max_age);
        println!("{}", SyncReporter::generate_status(&status, running));
        Ok(())
    }
}
