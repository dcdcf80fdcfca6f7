use std::path::PathBuf;
use std::time::Duration;

use filemeta_core::{
    AceRecord, AceRendering, AceTarget, AclRecord, Checkpoint, CheckpointStore, ContentHash,
    DirCounts, EventMetadata, EventSink, FileRecord, FileTimes, JsonCheckpointStore,
    JsonLinesSink, PosixAcl, ScanError, ScanEvent, ScanRequest, WindowsAcl, parse_data_size,
    parse_duration,
};
use serde_json::{Value, json};
use tempfile::TempDir;

#[test]
fn test_request_serde_defaults() {
    let request: ScanRequest = serde_json::from_value(json!({ "root": "/var/log" })).unwrap();

    assert_eq!(request.root, PathBuf::from("/var/log"));
    assert!(request.recurse);
    assert!(!request.only_if_changed);
    assert_eq!(request.hash_size_limit, 500 * 1024 * 1024);
    assert_eq!(request.ace_rendering, AceRendering::Multi);
}

#[test]
fn test_request_serde_is_validated() {
    let negative = json!({ "root": "/var/log", "previous_high_water_mark": -5 });
    assert!(serde_json::from_value::<ScanRequest>(negative).is_err());

    let bad_filter = json!({ "root": "/var/log", "name_filter": "[" });
    assert!(serde_json::from_value::<ScanRequest>(bad_filter).is_err());

    let missing_root = json!({ "recurse": false });
    assert!(serde_json::from_value::<ScanRequest>(missing_root).is_err());

    let request: ScanRequest =
        serde_json::from_value(json!({ "root": "/data", "name_filter": "*.log" })).unwrap();
    assert_eq!(request.name_filter.as_deref(), Some("*.log"));
}

#[test]
fn test_request_builder_error_converts() {
    let err: ScanError = ScanRequest::builder().build().unwrap_err().into();
    assert!(matches!(err, ScanError::InvalidConfig { .. }));
    assert!(!err.is_access_error());
}

#[test]
fn test_unit_parsing() {
    assert_eq!(parse_data_size("500mb").unwrap(), 500 * 1024 * 1024);
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert!(parse_data_size("5mbx1").is_err());
    assert!(parse_duration("soon").is_err());
}

#[test]
fn test_checkpoint_chain_through_store() {
    let temp = TempDir::new().unwrap();
    let store = JsonCheckpointStore::new(temp.path());
    let stanza = "file_meta_data:///srv/data";

    let previous = store.load(stanza);
    assert_eq!(Checkpoint::high_water_mark(previous.as_ref()), 0);

    let first = Checkpoint::advance(previous.as_ref(), 1_700_000_100, 1_700_000_000);
    store.save(stanza, &first).unwrap();

    let loaded = store.load(stanza).unwrap();
    assert_eq!(loaded, first);
    assert!(!loaded.is_due(Duration::from_secs(3600), 1_700_000_200));
    assert!(loaded.is_due(Duration::from_secs(60), 1_700_000_200));

    // A scan that saw nothing newer keeps the mark.
    let second = Checkpoint::advance(Some(&loaded), 1_700_000_300, 0);
    assert_eq!(second.latest_file_system_date, 1_700_000_000);
}

#[test]
fn test_checkpoint_file_is_json() {
    let temp = TempDir::new().unwrap();
    let store = JsonCheckpointStore::new(temp.path());
    store.save("input", &Checkpoint::new(5, 4)).unwrap();

    let raw = std::fs::read_to_string(store.path_for("input")).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["last_run"], json!(5));
    assert_eq!(value["latest_file_system_date"], json!(4));
}

#[test]
fn test_directory_event_shape() {
    let mut record = FileRecord::new("/srv/data", true, 4096, FileTimes::new(100, 200, 300));
    record.counts = Some(DirCounts::new(2, 1));
    record.recursive_counts = Some(DirCounts::new(3, 1));
    record.acl = Some(AclRecord::Posix(PosixAcl::new(0, Some("root".into()), 0, 0o40755)));

    let metadata = EventMetadata::new("file_meta_data:///srv/data");
    let event = ScanEvent::from_record(&record, AceRendering::Multi, 400, &metadata);

    assert_eq!(event.get("is_directory"), Some(&json!(1)));
    assert_eq!(event.get("file_count"), Some(&json!(2)));
    assert_eq!(event.get("directory_count_recursive"), Some(&json!(1)));
    assert_eq!(event.get("permission_mask"), Some(&json!("0755")));
    assert_eq!(event.get("ctime_epoch"), Some(&json!(300)));
    assert!(event.get("sha224").is_none());

    let keys: Vec<&str> = event.keys().collect();
    let time_pos = keys.iter().position(|k| *k == "time").unwrap();
    let recursive_pos = keys.iter().position(|k| *k == "file_count_recursive").unwrap();
    assert!(recursive_pos < time_pos);
    assert_eq!(keys.last(), Some(&"sourcetype"));
}

#[test]
fn test_file_event_with_hash_and_windows_acl() {
    let mut record = FileRecord::new("C:\\data\\a.txt", false, 3, FileTimes::new(1, 2, 3));
    record.content_hash = ContentHash::from_hex(
        "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7",
    );
    record.acl = Some(AclRecord::Windows(WindowsAcl {
        owner: Some("BUILTIN\\Administrators".into()),
        owner_sid: "S-1-5-32-544".into(),
        group: Some("NT AUTHORITY\\SYSTEM".into()),
        group_sid: "S-1-5-18".into(),
        entries: vec![
            AceRecord::decode(0, 0x10, 0x001F_01FF, AceTarget::File, "S-1-5-18".into(), None),
            AceRecord::decode(1, 0, 0x0001_0000, AceTarget::File, "S-1-1-0".into(), None),
        ],
    }));

    let metadata = EventMetadata::new("input");
    let event = ScanEvent::from_record(&record, AceRendering::Joined, 10, &metadata);

    assert_eq!(
        event.get("sha224"),
        Some(&json!("23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"))
    );
    assert_eq!(event.get("group"), Some(&json!("NT AUTHORITY\\SYSTEM")));
    assert_eq!(event.get("ace_0_type"), Some(&json!("ACCESS_ALLOWED")));
    assert_eq!(event.get("ace_0_flags"), Some(&json!("")));
    assert_eq!(event.get("ace_1_type"), Some(&json!("ACCESS_DENIED")));
    assert_eq!(event.get("ace_1_permissions"), Some(&json!("DELETE")));
    assert!(event.get("ace_1_account").is_none());
    assert!(event.get("file_count").is_none());
}

#[test]
fn test_json_lines_output() {
    let records = [
        FileRecord::new("/a", true, 0, FileTimes::new(1, 1, 1)),
        FileRecord::new("/a/b", false, 9, FileTimes::new(2, 2, 2)),
    ];
    let metadata = EventMetadata::new("input");

    let mut sink = JsonLinesSink::new(Vec::new());
    for record in &records {
        let event = ScanEvent::from_record(record, AceRendering::Multi, 3, &metadata);
        sink.emit(&event).unwrap();
    }
    assert_eq!(sink.written(), 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let paths: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["path"].clone())
        .collect();
    assert_eq!(paths, vec![json!("/a"), json!("/a/b")]);
}
