//! # readmesync-core
//!
//! Core library for README collection synchronization.
//!
//! Documentation files scattered across many source directories are mirrored
//! into a single collection directory, and edits made inside the collection
//! flow back to their origin. A persistent mapping store records which
//! collection file belongs to which source file; every pass decides per pair
//! which side is authoritative from content hashes and modification times.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy for scan, file and store failures
pub mod error;

/// Configuration file discovery, parsing and validation
pub mod config;

/// File state capture and conflict resolution
pub mod comparison;

/// Persistent source/target mapping table
pub mod store;

/// Source discovery and target naming
pub mod scanner;

/// Synchronization passes, anti-loop guard and cleanup
pub mod sync;

/// Long-running host for timers and the file watcher
pub mod daemon;

pub use config::{Config, ConfigManager};
pub use error::{Result, SyncError};
pub use store::{Mapping, MappingStatus, MappingStore};
pub use daemon::{Daemon, DaemonContext};
pub use sync::{CleanupReport, ConflictEntry, StatusReport, SyncEngine, SyncReport, SyncReporter};
