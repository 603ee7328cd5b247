mod cleanup;
mod common;
mod daemon;
mod inspect;
mod status;
mod sync;
mod sync_file;

pub use cleanup::Cleanup;
pub use daemon::Daemon;
pub use inspect::{Conflicts, ListUnlinked, Mappings};
pub use status::Status;
pub use sync::Sync;
pub use sync_file::SyncFile;
