//! Flattened event output for downstream consumers.
//!
//! A [`ScanEvent`] is one [`FileRecord`] rendered as a flat, ordered field
//! map, stamped with the scan completion time and tagged with routing
//! metadata the scanner does not interpret.

use std::io::Write;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::acl::{AceRendering, AclRecord};
use crate::error::ScanError;
use crate::record::{FileRecord, format_epoch};

/// Routing metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Destination index.
    pub index: String,
    /// Event source, usually the input stanza.
    pub source: String,
    /// Event sourcetype.
    pub sourcetype: String,
    /// Originating host.
    pub host: Option<String>,
}

impl EventMetadata {
    /// Metadata with the default index and sourcetype.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            index: "default".to_string(),
            source: source.into(),
            sourcetype: "file_meta_data".to_string(),
            host: None,
        }
    }
}

/// One record ready for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScanEvent {
    fields: IndexMap<String, Value>,
}

impl ScanEvent {
    /// Flatten a record into an event.
    ///
    /// `completed_at` is the scan completion time in epoch seconds.
    pub fn from_record(
        record: &FileRecord,
        rendering: AceRendering,
        completed_at: i64,
        metadata: &EventMetadata,
    ) -> Self {
        let mut fields = record_fields(record, rendering);

        fields.insert("time".into(), json!(format_epoch(completed_at)));
        fields.insert("index".into(), json!(metadata.index));
        fields.insert("source".into(), json!(metadata.source));
        fields.insert("sourcetype".into(), json!(metadata.sourcetype));
        if let Some(host) = &metadata.host {
            fields.insert("host".into(), json!(host));
        }

        Self { fields }
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field names in output order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Render multi-valued names as an array or a space-joined string.
fn render_names(names: &[&'static str], rendering: AceRendering) -> Value {
    match rendering {
        AceRendering::Multi => json!(names),
        AceRendering::Joined => json!(names.iter().join(" ")),
    }
}

/// Flatten a record into ordered key/value pairs.
pub fn record_fields(record: &FileRecord, rendering: AceRendering) -> IndexMap<String, Value> {
    let mut fields = IndexMap::new();

    fields.insert("is_directory".into(), json!(u8::from(record.is_directory)));
    if let Some(counts) = record.counts {
        fields.insert("file_count".into(), json!(counts.files));
        fields.insert("directory_count".into(), json!(counts.directories));
    }
    fields.insert("path".into(), json!(record.path.to_string_lossy()));
    if let Some(hash) = &record.content_hash {
        fields.insert("sha224".into(), json!(hash.to_hex()));
    }

    let times = [
        ("atime", record.times.accessed),
        ("mtime", record.times.modified),
        ("ctime", record.times.changed),
    ];
    for (name, secs) in times {
        fields.insert(name.into(), json!(format_epoch(secs)));
        fields.insert(format!("{name}_epoch"), json!(secs));
    }

    fields.insert("size".into(), json!(record.size));
    if let Some(stat) = &record.stat {
        fields.insert("mode".into(), json!(stat.mode));
        fields.insert("ino".into(), json!(stat.ino));
        fields.insert("dev".into(), json!(stat.dev));
        fields.insert("nlink".into(), json!(stat.nlink));
        fields.insert("uid".into(), json!(stat.uid));
        fields.insert("gid".into(), json!(stat.gid));
    }

    match &record.acl {
        Some(AclRecord::Posix(acl)) => {
            if let Some(name) = &acl.owner_name {
                fields.insert("owner".into(), json!(name));
            }
            fields.insert("owner_uid".into(), json!(acl.owner_uid));
            fields.insert("group_gid".into(), json!(acl.group_gid));
            fields.insert("permission_mask".into(), json!(acl.permission_octal()));
        }
        Some(AclRecord::Windows(acl)) => {
            if let Some(owner) = &acl.owner {
                fields.insert("owner".into(), json!(owner));
            }
            fields.insert("owner_sid".into(), json!(acl.owner_sid));
            if let Some(group) = &acl.group {
                fields.insert("group".into(), json!(group));
            }
            fields.insert("group_sid".into(), json!(acl.group_sid));

            for (n, ace) in acl.entries.iter().enumerate() {
                let prefix = format!("ace_{n}");
                fields.insert(format!("{prefix}_type"), render_names(&ace.type_names(), rendering));
                fields.insert(format!("{prefix}_flags"), render_names(&ace.flag_names(), rendering));
                fields.insert(
                    format!("{prefix}_permissions"),
                    render_names(&ace.permission_names(), rendering),
                );
                fields.insert(format!("{prefix}_sid"), json!(ace.sid));
                if let Some(account) = &ace.account {
                    fields.insert(format!("{prefix}_account"), json!(account));
                }
            }
        }
        None => {}
    }

    if let Some(counts) = record.recursive_counts {
        fields.insert("file_count_recursive".into(), json!(counts.files));
        fields.insert("directory_count_recursive".into(), json!(counts.directories));
    }

    fields
}

/// Receives events produced by a scan.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&mut self, event: &ScanEvent) -> Result<(), ScanError>;

    /// Flush buffered events.
    fn flush(&mut self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink around a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of events written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &ScanEvent) -> Result<(), ScanError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| ScanError::io("<event output>", e))?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScanError> {
        self.writer
            .flush()
            .map_err(|e| ScanError::io("<event output>", e))
    }
}
