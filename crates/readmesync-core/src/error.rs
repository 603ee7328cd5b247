use std::path::PathBuf;

/// Result type for readmesync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by the synchronization core
///
/// Only [`SyncError::StoreUnavailable`] aborts a pass. Scan and per-file
/// errors are collected into the pass report and the pass continues.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A source root could not be walked
    #[error("failed to scan {root}: {source}")]
    Scan {
        /// Root directory being walked
        root: PathBuf,
        /// Underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// Copying, hashing or moving one mapped file failed
    #[error("I/O error at {path}: {source}")]
    MappingIo {
        /// File being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The mapping store is unreachable or corrupt
    #[error("mapping store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// Configuration is missing or invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An exclusion pattern could not be compiled
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Underlying glob error
        #[source]
        source: ignore::Error,
    },
}

impl SyncError {
    /// Build a [`SyncError::MappingIo`] for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::MappingIo {
            path: path.into(),
            source,
        }
    }

    /// Build a [`SyncError::Config`] from any message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error must abort the current pass
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_errors_are_fatal() {
        let store = SyncError::StoreUnavailable(rusqlite::Error::InvalidQuery);
        let io = SyncError::io("/tmp/x", std::io::Error::other("boom"));
        let config = SyncError::config("bad");

        assert!(store.is_fatal());
        assert!(!io.is_fatal());
        assert!(!config.is_fatal());
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = SyncError::io("/docs/a.md", std::io::Error::other("denied"));
        let msg = err.to_string();
        assert!(msg.contains("/docs/a.md"));
        assert!(msg.contains("denied"));
    }
}
