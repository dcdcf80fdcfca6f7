//! Core types and traits for filemeta.
//!
//! This crate provides the data structures shared by the scanner and the
//! command-line front end: scan requests, per-path records, ownership and
//! ACL data, checkpoints, and flattened output events.

pub mod acl;
mod checkpoint;
mod config;
mod error;
mod event;
mod record;
pub mod units;

pub use acl::{
    AceFlag, AceRecord, AceRendering, AceTarget, AceType, AclRecord, Permission, PosixAcl,
    WindowsAcl,
};
pub use checkpoint::{Checkpoint, CheckpointStore, JsonCheckpointStore};
pub use config::{
    DEFAULT_HASH_SIZE_LIMIT, NameFilter, ScanRequest, ScanRequestBuilder, ScanRequestBuilderError,
};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use event::{EventMetadata, EventSink, JsonLinesSink, ScanEvent, record_fields};
pub use record::{ContentHash, DIGEST_LEN, DirCounts, FileRecord, FileTimes, UnixStat, format_epoch};
pub use units::{parse_data_size, parse_duration};
