//! Builds one [`FileRecord`] from one filesystem path.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use filemeta_core::{DirCounts, FileRecord, FileTimes, ScanError, ScanWarning, UnixStat};
use tracing::warn;

use crate::acl::AclProvider;
use crate::hash::hash_file;

/// Produces records for individual paths.
///
/// Only a failure to read the path's own metadata is an error. Listing,
/// hashing and ACL failures are logged, recorded as warnings, and leave
/// the corresponding fields empty.
pub struct RecordBuilder<'a> {
    hash_limit: Option<u64>,
    acl_provider: Option<&'a dyn AclProvider>,
}

impl<'a> RecordBuilder<'a> {
    /// Create a builder. `hash_limit` is the largest file that is hashed;
    /// `None` disables hashing.
    pub fn new(hash_limit: Option<u64>, acl_provider: Option<&'a dyn AclProvider>) -> Self {
        Self {
            hash_limit,
            acl_provider,
        }
    }

    /// Build the record for `path`, following symbolic links.
    pub fn build(
        &self,
        path: &Path,
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<FileRecord, ScanError> {
        let metadata = fs::metadata(path).map_err(|e| ScanError::io(path, e))?;
        let is_directory = metadata.is_dir();

        let mut record = FileRecord::new(
            absolute_path(path),
            is_directory,
            metadata.len(),
            file_times(&metadata),
        );
        record.stat = unix_stat(&metadata);

        if is_directory {
            record.counts = match count_children(path) {
                Ok(counts) => Some(counts),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to list directory");
                    warnings.push(ScanWarning::listing_failed(path, &e));
                    None
                }
            };
        } else if metadata.is_file() && self.hash_limit.is_some_and(|l| metadata.len() <= l) {
            record.content_hash = match hash_file(path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to hash file");
                    warnings.push(ScanWarning::hash_failed(path, &e));
                    None
                }
            };
        }

        if let Some(provider) = self.acl_provider {
            record.acl = match provider.read_acl(path, &metadata) {
                Ok(acl) => Some(acl),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to read ACL data");
                    warnings.push(ScanWarning::acl_failed(path, &e));
                    None
                }
            };
        }

        Ok(record)
    }
}

/// Warning describing an entry whose record could not be built.
pub fn skipped_entry_warning(path: &Path, error: &ScanError) -> ScanWarning {
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    if is_link && matches!(error, ScanError::NotFound { .. }) {
        let target = fs::read_link(path).unwrap_or_default();
        ScanWarning::broken_symlink(path, &target)
    } else {
        ScanWarning::skipped(error)
    }
}

/// Immediate children, classified by following links.
fn count_children(path: &Path) -> std::io::Result<DirCounts> {
    let mut counts = DirCounts::default();
    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else { continue };
        if entry.path().is_dir() {
            counts.directories += 1;
        } else {
            counts.files += 1;
        }
    }
    Ok(counts)
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn file_times(metadata: &Metadata) -> FileTimes {
    FileTimes::new(metadata.atime(), metadata.mtime(), metadata.ctime())
}

#[cfg(not(unix))]
fn file_times(metadata: &Metadata) -> FileTimes {
    fn epoch_secs(time: std::io::Result<std::time::SystemTime>) -> i64 {
        time.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
    }

    FileTimes::new(
        epoch_secs(metadata.accessed()),
        epoch_secs(metadata.modified()),
        epoch_secs(metadata.created()),
    )
}

#[cfg(unix)]
fn unix_stat(metadata: &Metadata) -> Option<UnixStat> {
    Some(UnixStat {
        mode: metadata.mode(),
        ino: metadata.ino(),
        dev: metadata.dev(),
        nlink: metadata.nlink(),
        uid: metadata.uid(),
        gid: metadata.gid(),
    })
}

#[cfg(not(unix))]
fn unix_stat(_metadata: &Metadata) -> Option<UnixStat> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use filemeta_core::WarningKind;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "abc").unwrap();
        fs::write(root.join("b.txt"), "hello world").unwrap();
        fs::write(root.join("sub/c.txt"), "nested").unwrap();
        temp
    }

    #[test]
    fn test_directory_record_counts() {
        let temp = create_test_dir();
        let mut warnings = Vec::new();

        let record = RecordBuilder::new(None, None)
            .build(temp.path(), &mut warnings)
            .unwrap();

        assert!(record.is_directory);
        assert_eq!(record.counts, Some(DirCounts::new(2, 1)));
        assert!(record.recursive_counts.is_none());
        assert!(record.content_hash.is_none());
        assert!(record.path.is_absolute());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_file_record_hash_within_limit() {
        let temp = create_test_dir();
        let mut warnings = Vec::new();
        let builder = RecordBuilder::new(Some(5), None);

        let small = builder.build(&temp.path().join("a.txt"), &mut warnings).unwrap();
        assert_eq!(small.size, 3);
        assert_eq!(
            small.content_hash.map(|h| h.to_hex()).as_deref(),
            Some("23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7")
        );
        assert!(small.counts.is_none());

        let large = builder.build(&temp.path().join("b.txt"), &mut warnings).unwrap();
        assert!(large.content_hash.is_none());
    }

    #[test]
    fn test_missing_path_is_access_error() {
        let temp = TempDir::new().unwrap();
        let mut warnings = Vec::new();

        let err = RecordBuilder::new(None, None)
            .build(&temp.path().join("missing"), &mut warnings)
            .unwrap_err();
        assert!(err.is_access_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_timestamps_and_stat() {
        let temp = create_test_dir();
        let path = temp.path().join("a.txt");
        let metadata = fs::metadata(&path).unwrap();
        let mut warnings = Vec::new();

        let record = RecordBuilder::new(None, None).build(&path, &mut warnings).unwrap();
        assert_eq!(record.times.modified, metadata.mtime());
        assert_eq!(record.times.changed, metadata.ctime());
        let stat = record.stat.unwrap();
        assert_eq!(stat.ino, metadata.ino());
        assert_eq!(stat.nlink, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_warning() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), &link).unwrap();
        let mut warnings = Vec::new();

        let err = RecordBuilder::new(None, None)
            .build(&link, &mut warnings)
            .unwrap_err();
        let warning = skipped_entry_warning(&link, &err);
        assert_eq!(warning.kind, WarningKind::BrokenSymlink);
        assert!(warning.message.contains("nowhere"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_directory_keeps_record() {
        use std::os::unix::fs::PermissionsExt;

        if unsafe { libc::geteuid() } == 0 {
            // root lists through mode bits
            return;
        }

        let temp = create_test_dir();
        let locked = temp.path().join("sub");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let mut warnings = Vec::new();

        let record = RecordBuilder::new(None, None).build(&locked, &mut warnings);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let record = record.unwrap();
        assert!(record.is_directory);
        assert!(record.counts.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ListingError);
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_is_never_hashed() {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let fifo = temp.path().join("pipe");
        let c_path = CString::new(fifo.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);
        let mut warnings = Vec::new();

        let record = RecordBuilder::new(Some(u64::MAX), None)
            .build(&fifo, &mut warnings)
            .unwrap();
        assert!(!record.is_directory);
        assert!(record.content_hash.is_none());
        assert!(warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_counts_as_directory() {
        let temp = create_test_dir();
        std::os::unix::fs::symlink(temp.path().join("sub"), temp.path().join("link")).unwrap();
        let mut warnings = Vec::new();

        let record = RecordBuilder::new(None, None)
            .build(temp.path(), &mut warnings)
            .unwrap();
        assert_eq!(record.counts, Some(DirCounts::new(2, 2)));
    }
}
