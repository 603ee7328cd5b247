//! File state capture and conflict resolution
//!
//! This module provides read-only analysis of one mapped pair:
//! - Content identity via SHA-256 hashing
//! - Modification times at second resolution
//! - The pure decision function choosing which side is authoritative

mod hash;
mod resolver;
mod timestamp;

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use hash::FileHasher;
pub use resolver::{ConflictResolver, ResolveOptions, SkipReason, SyncDecision};
pub use timestamp::TimestampComparator;

use crate::error::{Result, SyncError};

/// Conflict resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Later mtime wins; near-simultaneous edits fork a conflict copy
    #[default]
    Latest,
    /// Never overwrite; every difference forks a conflict copy
    Manual,
    /// Source always overwrites target
    SourcePriority,
    /// Target always overwrites source
    TargetPriority,
}

impl ConflictResolution {
    /// Name as written in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Manual => "manual",
            Self::SourcePriority => "source_priority",
            Self::TargetPriority => "target_priority",
        }
    }
}

impl std::fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy direction between the two sides of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Source file overwrites target file
    SourceToTarget,
    /// Target file overwrites source file
    TargetToSource,
}

/// Observed state of one side of a mapping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileState {
    /// Whether the file exists
    pub exists: bool,
    /// Hex SHA-256 of the content, when present
    pub hash: Option<String>,
    /// Modification time in seconds since the epoch, when present
    pub mtime: Option<i64>,
}

impl FileState {
    /// State of a file that does not exist
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            exists: false,
            hash: None,
            mtime: None,
        }
    }

    /// State of a present file with known hash and mtime
    #[must_use]
    pub fn present(hash: impl Into<String>, mtime: i64) -> Self {
        Self {
            exists: true,
            hash: Some(hash.into()),
            mtime: Some(mtime),
        }
    }

    /// Read the current state of `path`
    ///
    /// A missing file is not an error; it yields [`FileState::absent`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the file exists but cannot be
    /// inspected or hashed.
    pub fn read(path: &Path) -> Result<Self> {
        let mtime = match TimestampComparator::modified_secs(path) {
            Ok(mtime) => mtime,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::absent()),
            Err(e) => return Err(SyncError::io(path, e)),
        };

        if !path.is_file() {
            return Ok(Self::absent());
        }

        let hash = FileHasher::hash(path)?;
        Ok(Self::present(hash, mtime))
    }
}
