//! SHA-256 content digests

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, SyncError};

/// Content hashing for both sides of a mapping
pub struct FileHasher;

impl FileHasher {
    /// Lowercase hex SHA-256 of the file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the file cannot be opened or read.
    pub fn hash(path: &Path) -> Result<String> {
        let mut file = File::open(path).map_err(|e| SyncError::io(path, e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| SyncError::io(path, e))?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Lowercase hex SHA-256 of `bytes`
    #[must_use]
    pub fn hash_bytes(bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }
}
