//! Error and warning types for metadata scanning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by filemeta.
///
/// Configuration variants are surfaced before a scan begins. Path variants
/// describe a single entry; the scanner recovers from them locally and
/// turns them into [`ScanWarning`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found (missing, vanished, or a dangling link).
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A data size string could not be parsed.
    #[error("The value '{value}' is not a valid size of data: {reason}")]
    InvalidSize { value: String, reason: String },

    /// A duration string could not be parsed.
    #[error("The value '{value}' is not a valid duration: {reason}")]
    InvalidDuration { value: String, reason: String },

    /// The name filter is not a valid wildcard pattern.
    #[error("Invalid name filter '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },

    /// ACL data could not be read.
    #[error("Unable to read ACL data for {path}: {message}")]
    Acl { path: PathBuf, message: String },

    /// Checkpoint could not be persisted.
    #[error("Unable to save checkpoint at {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure while writing output.
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error describes a single inaccessible entry.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::NotFound { .. } | Self::Io { .. }
        )
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Symbolic link target does not exist.
    BrokenSymlink,
    /// Error reading a directory during the walk.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Directory children could not be listed for counting.
    ListingError,
    /// Content hash could not be computed.
    HashError,
    /// Ownership or ACL data could not be read.
    AclError,
}

/// Non-fatal warning encountered during scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// The scan root could not be stat'ed; the scan produced nothing.
    pub fn root_unavailable(root: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(
            root,
            format!("Scan root unavailable: {error}"),
            WarningKind::MetadataError,
        )
    }

    /// The walker failed to descend into or read an entry.
    pub fn walk_failed(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self::new(path, error.to_string(), WarningKind::ReadError)
    }

    /// A directory was found but its children could not be listed.
    pub fn listing_failed(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(
            path,
            format!("Unable to list directory: {error}"),
            WarningKind::ListingError,
        )
    }

    /// A file qualified for hashing but its content could not be read.
    pub fn hash_failed(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(
            path,
            format!("Unable to hash file: {error}"),
            WarningKind::HashError,
        )
    }

    pub fn acl_failed(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        Self::new(path, error.to_string(), WarningKind::AclError)
    }

    /// Symlink whose target does not exist.
    pub fn broken_symlink(link: impl Into<PathBuf>, target: &Path) -> Self {
        let link = link.into();
        Self {
            message: format!("Broken symlink: {} -> {}", link.display(), target.display()),
            path: link,
            kind: WarningKind::BrokenSymlink,
        }
    }

    /// Warning for an entry skipped because its record could not be built.
    pub fn skipped(error: &ScanError) -> Self {
        let kind = match error {
            ScanError::PermissionDenied { .. } => WarningKind::PermissionDenied,
            ScanError::Acl { .. } => WarningKind::AclError,
            _ => WarningKind::MetadataError,
        };
        let path = match error {
            ScanError::PermissionDenied { path }
            | ScanError::NotFound { path }
            | ScanError::Io { path, .. }
            | ScanError::Acl { path, .. } => path.clone(),
            _ => PathBuf::new(),
        };
        Self::new(path, error.to_string(), kind)
    }
}
