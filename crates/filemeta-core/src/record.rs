//! Per-path metadata records.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::acl::AclRecord;

/// Length of a SHA-224 digest in bytes.
pub const DIGEST_LEN: usize = 28;

/// SHA-224 content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(pub [u8; DIGEST_LEN]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a lowercase or uppercase hex digest.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != DIGEST_LEN * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let mut bytes = [0u8; DIGEST_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid SHA-224 digest: {value}"))
    }
}

/// Filesystem timestamps in whole epoch seconds.
///
/// `changed` is the inode change time on Unix and the creation time on
/// Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    /// Last access time.
    pub accessed: i64,
    /// Last modification time.
    pub modified: i64,
    /// Status change (Unix) or creation (Windows) time.
    pub changed: i64,
}

impl FileTimes {
    /// Create timestamps from raw epoch seconds.
    pub fn new(accessed: i64, modified: i64, changed: i64) -> Self {
        Self {
            accessed,
            modified,
            changed,
        }
    }

    /// Latest of all three timestamps, access time included.
    pub fn latest(&self) -> i64 {
        self.accessed.max(self.modified).max(self.changed)
    }

    /// Latest timestamp that reflects a change to the entry.
    ///
    /// Access time is left out: reading a file is not a change.
    pub fn latest_change(&self) -> i64 {
        self.modified.max(self.changed)
    }
}

/// Render epoch seconds in the C `ctime` layout using local time,
/// e.g. `"Sun Oct 18 09:05:01 2026"`.
pub fn format_epoch(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string(),
        None => secs.to_string(),
    }
}

/// Raw stat fields available on Unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnixStat {
    /// Full mode word (type and permission bits).
    pub mode: u32,
    /// Inode number.
    pub ino: u64,
    /// Device id.
    pub dev: u64,
    /// Hard link count.
    pub nlink: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
}

/// File and sub-directory counts of a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCounts {
    /// Number of files.
    pub files: u64,
    /// Number of directories.
    pub directories: u64,
}

impl DirCounts {
    /// Create a new count pair.
    pub fn new(files: u64, directories: u64) -> Self {
        Self { files, directories }
    }
}

/// Metadata for one visited path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,

    /// Whether the path is a directory (links are followed).
    pub is_directory: bool,

    /// Size in bytes as reported by stat.
    pub size: u64,

    /// Filesystem timestamps.
    pub times: FileTimes,

    /// Raw stat fields (Unix only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<UnixStat>,

    /// SHA-224 of the content (files within the hashing limit only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,

    /// Immediate children (directories only, when listing succeeded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<DirCounts>,

    /// Totals across the visited subtree (scan root only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive_counts: Option<DirCounts>,

    /// Ownership and access-control data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AclRecord>,
}

impl FileRecord {
    /// Create a record with no optional data attached.
    pub fn new(path: impl Into<PathBuf>, is_directory: bool, size: u64, times: FileTimes) -> Self {
        Self {
            path: path.into(),
            is_directory,
            size,
            times,
            stat: None,
            content_hash: None,
            counts: None,
            recursive_counts: None,
            acl: None,
        }
    }

    /// Immediate file count (directories only).
    pub fn file_count(&self) -> Option<u64> {
        self.counts.map(|c| c.files)
    }

    /// Immediate sub-directory count (directories only).
    pub fn directory_count(&self) -> Option<u64> {
        self.counts.map(|c| c.directories)
    }

    /// Recursive file count (scan root only).
    pub fn file_count_recursive(&self) -> Option<u64> {
        self.recursive_counts.map(|c| c.files)
    }

    /// Recursive directory count (scan root only).
    pub fn directory_count_recursive(&self) -> Option<u64> {
        self.recursive_counts.map(|c| c.directories)
    }
}
