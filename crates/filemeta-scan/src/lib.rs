//! Metadata scanning engine for filemeta.
//!
//! This crate walks a directory tree and produces one metadata record per
//! visited path, using jwalk for traversal.
//!
//! # Overview
//!
//! `filemeta-scan` is responsible for traversing directories and building
//! [`FileRecord`]s. Key features:
//!
//! - **Incremental scans** against a high-water mark
//! - **Recursive totals** on the root record
//! - **SHA-224 hashing** below a size limit
//! - **Ownership and ACL data** from the platform provider
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use filemeta_scan::{MetaScanner, ScanRequest};
//!
//! let request = ScanRequest::new("/path/to/scan");
//! let scanner = MetaScanner::new();
//! let result = scanner.scan(&request).unwrap();
//!
//! println!("Records: {}", result.records.len());
//! println!("High-water mark: {}", result.new_high_water_mark);
//! ```
//!
//! # Incremental scans
//!
//! Feed the previous mark back in to only see what changed since:
//!
//! ```rust,no_run
//! use filemeta_scan::{MetaScanner, ScanRequest};
//!
//! let scanner = MetaScanner::new();
//! let first = scanner.scan(&ScanRequest::new("/var/log")).unwrap();
//!
//! let request = ScanRequest::builder()
//!     .root("/var/log")
//!     .only_if_changed(true)
//!     .previous_high_water_mark(first.new_high_water_mark)
//!     .build()
//!     .unwrap();
//! let changed = scanner.scan(&request).unwrap();
//! ```

pub mod acl;
mod builder;
mod change;
mod hash;
mod progress;
mod scanner;

pub use acl::{AclPlatform, AclProvider, detect_provider};
pub use builder::{RecordBuilder, skipped_entry_warning};
pub use change::{ChangeTracker, evaluate};
pub use hash::{hash_file, hash_reader};
pub use progress::ScanProgress;
pub use scanner::{MetaScanner, ScanResult};

// Re-export core types for convenience
pub use filemeta_core::{
    AclRecord, ContentHash, DirCounts, FileRecord, FileTimes, ScanError, ScanRequest,
    ScanWarning, WarningKind,
};
