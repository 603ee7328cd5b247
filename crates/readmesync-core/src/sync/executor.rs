//! File operations performed by a pass
//!
//! Copies go through a temporary sibling and a rename so watchers never see
//! a half-written document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::comparison::TimestampComparator;
use crate::error::{Result, SyncError};

const TEMP_SUFFIX: &str = ".readmesync-tmp";

/// Suffix marker for conflict copies
pub const CONFLICT_MARKER: &str = ".conflict-";

/// Executes file operations
pub struct FileOperationExecutor;

impl FileOperationExecutor {
    /// Timestamp used in conflict and relocation file names
    #[must_use]
    pub fn stamp(now: DateTime<Local>) -> String {
        now.format("%Y%m%d-%H%M%S").to_string()
    }

    /// Copy `from` over `to`, keeping the source modification time
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if reading, writing or renaming fails.
    pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
        let modified = fs::metadata(from)
            .and_then(|m| m.modified())
            .map_err(|e| SyncError::io(from, e))?;

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }

        let temp = temp_sibling(to);
        let staged = fs::copy(from, &temp)
            .map_err(|e| SyncError::io(&temp, e))
            .and_then(|_| TimestampComparator::set_modified(&temp, modified))
            .and_then(|()| fs::rename(&temp, to).map_err(|e| SyncError::io(to, e)));

        if staged.is_err() {
            let _ = fs::remove_file(&temp);
        }
        staged?;

        debug!("Copied {} -> {}", from.display(), to.display());
        Ok(())
    }

    /// Save the current content of `losing` as a conflict copy next to `target`
    ///
    /// Returns the path of the copy. Neither original is modified.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the copy cannot be written.
    pub fn write_conflict_copy(target: &Path, losing: &Path, stamp: &str) -> Result<PathBuf> {
        let mut base = target.as_os_str().to_os_string();
        base.push(CONFLICT_MARKER);
        base.push(stamp);

        let mut candidate = PathBuf::from(&base);
        let mut n = 2;
        while candidate.exists() {
            let mut next = base.clone();
            next.push(format!("-{n}"));
            candidate = PathBuf::from(next);
            n += 1;
        }

        fs::copy(losing, &candidate).map_err(|e| SyncError::io(&candidate, e))?;
        Ok(candidate)
    }

    /// Move `file` into `dir`, never overwriting an existing file
    ///
    /// A name clash gets the timestamp appended to the stem.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MappingIo`] if the directory cannot be created or
    /// the file cannot be moved.
    pub fn relocate(file: &Path, dir: &Path, stamp: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
        let dest = free_destination(file, dir, stamp)?;

        if let Err(rename_err) = fs::rename(file, &dest) {
            // Cross-device moves fall back to copy and remove.
            fs::copy(file, &dest).map_err(|_| SyncError::io(file, rename_err))?;
            fs::remove_file(file).map_err(|e| SyncError::io(file, e))?;
        }

        debug!("Relocated {} -> {}", file.display(), dest.display());
        Ok(dest)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}{TEMP_SUFFIX}"))
}

fn free_destination(file: &Path, dir: &Path, stamp: &str) -> Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| {
        SyncError::io(
            file,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;

    let direct = dir.join(name);
    if !direct.exists() {
        return Ok(direct);
    }

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = dir.join(format!("{stem}-{stamp}{ext}"));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}-{stamp}-{n}{ext}"));
        n += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::TimestampComparator;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_parents_and_preserves_mtime() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("README.md");
        let to = tmp.path().join("notes/deep/a.md");
        fs::write(&from, "content").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        TimestampComparator::set_modified(&from, old).unwrap();

        FileOperationExecutor::copy_file(&from, &to).unwrap();

        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
        assert_eq!(TimestampComparator::modified_secs(&to).unwrap(), 1_700_000_000);
        assert!(!temp_sibling(&to).exists());
    }

    #[test]
    fn test_copy_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.md");
        let to = tmp.path().join("b.md");
        fs::write(&from, "new").unwrap();
        fs::write(&to, "old").unwrap();

        FileOperationExecutor::copy_file(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(&to).unwrap(), "new");
    }

    #[test]
    fn test_copy_missing_source_is_mapping_io() {
        let tmp = TempDir::new().unwrap();
        let err = FileOperationExecutor::copy_file(&tmp.path().join("nope.md"), &tmp.path().join("b.md"))
            .unwrap_err();
        assert!(matches!(err, SyncError::MappingIo { .. }));
    }

    #[test]
    fn test_conflict_copy_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a-README.md");
        fs::write(&target, "target side").unwrap();

        let first = FileOperationExecutor::write_conflict_copy(&target, &target, "20260101-120000").unwrap();
        let second = FileOperationExecutor::write_conflict_copy(&target, &target, "20260101-120000").unwrap();

        assert_eq!(first, tmp.path().join("a-README.md.conflict-20260101-120000"));
        assert_eq!(second, tmp.path().join("a-README.md.conflict-20260101-120000-2"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "target side");
        assert_eq!(fs::read_to_string(&target).unwrap(), "target side");
    }

    #[test]
    fn test_conflict_copy_can_hold_the_source_side() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("README.md");
        let target = tmp.path().join("a-README.md");
        fs::write(&source, "source side").unwrap();
        fs::write(&target, "target side").unwrap();

        let copy = FileOperationExecutor::write_conflict_copy(&target, &source, "20260101-120000").unwrap();

        assert_eq!(copy, tmp.path().join("a-README.md.conflict-20260101-120000"));
        assert_eq!(fs::read_to_string(&copy).unwrap(), "source side");
        assert_eq!(fs::read_to_string(&source).unwrap(), "source side");
    }

    #[test]
    fn test_relocate_avoids_clobbering() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("unlinked");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.md"), "older").unwrap();

        let file = tmp.path().join("a.md");
        fs::write(&file, "newer").unwrap();

        let dest = FileOperationExecutor::relocate(&file, &dir, "20260101-120000").unwrap();
        assert_eq!(dest, dir.join("a-20260101-120000.md"));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(dir.join("a.md")).unwrap(), "older");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "newer");
    }

    #[test]
    fn test_stamp_format() {
        let now = DateTime::parse_from_rfc3339("2026-03-04T05:06:07+00:00")
            .unwrap()
            .with_timezone(&Local);
        assert_eq!(FileOperationExecutor::stamp(now).len(), 15);
    }
}
