//! Modification times at second resolution

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, SyncError};

/// Timestamp helper
pub struct TimestampComparator;

impl TimestampComparator {
    /// Modification time of a file in whole seconds since the Unix epoch
    ///
    /// # Errors
    ///
    /// Returns the raw I/O error so callers can treat `NotFound` specially.
    pub fn modified_secs(path: &Path) -> io::Result<i64> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(Self::to_secs(modified))
    }

    /// Convert a `SystemTime` to whole seconds, negative before the epoch
    #[must_use]
    pub fn to_secs(time: SystemTime) -> i64 {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Inverse of [`TimestampComparator::to_secs`]
    #[must_use]
    pub fn from_secs(secs: i64) -> SystemTime {
        if secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(secs.unsigned_abs())
        } else {
            UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
        }
    }

    /// Set a file's modification time
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the file cannot be opened or updated.
    pub fn set_modified(path: &Path, time: SystemTime) -> Result<()> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| SyncError::io(path, e))?;
        file.set_modified(time).map_err(|e| SyncError::io(path, e))
    }
}
