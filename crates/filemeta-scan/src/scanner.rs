//! JWalk-based metadata scanner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use filemeta_core::{DirCounts, FileRecord, NameFilter, ScanError, ScanRequest, ScanWarning};

use crate::acl::{AclPlatform, AclProvider, detect_provider};
use crate::builder::{RecordBuilder, skipped_entry_warning};
use crate::change::ChangeTracker;
use crate::progress::{ProgressTracker, ScanProgress};

/// How many visited entries pass between progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Output of one scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Absolute scan root.
    pub root: PathBuf,
    /// Records that passed the change filter, in traversal order with the
    /// root last.
    pub records: Vec<FileRecord>,
    /// Latest timestamp seen on any visited entry, never below the
    /// request's previous mark.
    pub new_high_water_mark: i64,
    /// Non-fatal problems encountered.
    pub warnings: Vec<ScanWarning>,
    /// Entries visited, root included.
    pub entries_visited: u64,
    /// Entries skipped because their metadata could not be read.
    pub entries_skipped: u64,
    /// Wall-clock scan time.
    pub duration: Duration,
}

impl ScanResult {
    fn empty(root: PathBuf, high_water_mark: i64) -> Self {
        Self {
            root,
            records: Vec::new(),
            new_high_water_mark: high_water_mark,
            warnings: Vec::new(),
            entries_visited: 0,
            entries_skipped: 0,
            duration: Duration::ZERO,
        }
    }

    /// The root's record, if it was produced and kept.
    pub fn root_record(&self) -> Option<&FileRecord> {
        self.records.last().filter(|r| r.path == self.root)
    }
}

/// File and directory totals across the visited subtree.
///
/// Every yielded entry counts, whether or not its record passes the filters.
#[derive(Debug, Default)]
struct TraversalTotals {
    files: u64,
    directories: u64,
}

impl TraversalTotals {
    fn add(&mut self, is_dir: bool) {
        if is_dir {
            self.directories += 1;
        } else {
            self.files += 1;
        }
    }

    fn counts(&self) -> DirCounts {
        DirCounts::new(self.files, self.directories)
    }
}

/// Per-scan mutable state.
struct ScanState {
    tracker: ChangeTracker,
    records: Vec<FileRecord>,
    warnings: Vec<ScanWarning>,
    totals: TraversalTotals,
    progress: ProgressTracker,
    entries_skipped: u64,
}

/// Sequential metadata scanner using jwalk for traversal.
pub struct MetaScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    acl_provider: Option<Box<dyn AclProvider>>,
}

impl MetaScanner {
    /// Create a scanner with the ACL provider for the running platform.
    pub fn new() -> Self {
        Self::with_acl_provider(detect_provider())
    }

    /// Create a scanner with an explicit ACL provider (or none).
    pub fn with_acl_provider(acl_provider: Option<Box<dyn AclProvider>>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            acl_provider,
        }
    }

    /// ACL capability used for records.
    pub fn acl_platform(&self) -> AclPlatform {
        self.acl_provider
            .as_ref()
            .map_or(AclPlatform::Unsupported, |p| p.platform())
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Record builder configured for `request`.
    pub fn record_builder(&self, request: &ScanRequest) -> RecordBuilder<'_> {
        RecordBuilder::new(request.hash_limit(), self.acl_provider.as_deref())
    }

    /// Scan the request's root.
    ///
    /// Only an invalid request is an error. A root that is missing or
    /// unreadable yields no records and leaves the mark unchanged; every
    /// other per-entry failure becomes a warning.
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let filter = request.name_matcher()?;
        let previous = request.previous_high_water_mark;
        let root = std::path::absolute(&request.root).unwrap_or_else(|_| request.root.clone());

        debug!(
            root = %root.display(),
            recurse = request.recurse,
            depth_limit = request.depth_limit,
            must_be_later_than = ?request.must_be_later_than(),
            "Starting scan"
        );

        let root_metadata = match std::fs::metadata(&root) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Scan root unavailable");
                let mut result = ScanResult::empty(root.clone(), previous);
                result.warnings.push(ScanWarning::root_unavailable(&root, &e));
                return Ok(result);
            }
        };

        let builder = self.record_builder(request);
        let mut state = ScanState {
            tracker: ChangeTracker::new(previous, request.must_be_later_than()),
            records: Vec::new(),
            warnings: Vec::new(),
            totals: TraversalTotals::default(),
            progress: ProgressTracker::new(),
            entries_skipped: 0,
        };

        let walk_tree = request.recurse && root_metadata.is_dir();
        if walk_tree {
            self.walk(&root, request, filter.as_ref(), &builder, &mut state);
        }

        // Root record last. In recursive mode it is always kept.
        state.progress.record_visit(&root, root_metadata.is_dir());
        match builder.build(&root, &mut state.warnings) {
            Ok(mut record) => {
                let passes = state.tracker.evaluate(&record.times);
                if walk_tree {
                    record.recursive_counts = Some(state.totals.counts());
                }
                if passes || request.recurse {
                    state.progress.record_emitted();
                    state.records.push(record);
                }
            }
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Skipping scan root");
                state.entries_skipped += 1;
                state.warnings.push(skipped_entry_warning(&root, &e));
            }
        }

        let _ = self.progress_tx.send(state.progress.snapshot(state.warnings.len()));

        let result = ScanResult {
            root,
            entries_visited: state.progress.total_visited(),
            entries_skipped: state.entries_skipped,
            duration: state.progress.elapsed(),
            new_high_water_mark: state.tracker.high_water_mark(),
            records: state.records,
            warnings: state.warnings,
        };

        info!(
            root = %result.root.display(),
            records = result.records.len(),
            visited = result.entries_visited,
            warnings = result.warnings.len(),
            high_water_mark = result.new_high_water_mark,
            "Scan complete"
        );

        Ok(result)
    }

    /// Walk everything below `root`, appending records in sorted order.
    fn walk(
        &self,
        root: &Path,
        request: &ScanRequest,
        filter: Option<&NameFilter>,
        builder: &RecordBuilder<'_>,
        state: &mut ScanState,
    ) {
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .max_depth(request.max_depth().unwrap_or(usize::MAX));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "Walk error");
                    state.warnings.push(ScanWarning::walk_failed(path, &err));
                    continue;
                }
            };

            let path: PathBuf = entry.path();
            // Links to directories count as directories but are not entered.
            let is_dir = path.is_dir();
            state.totals.add(is_dir);
            state.progress.record_visit(&path, is_dir);

            if state.progress.total_visited() % PROGRESS_INTERVAL == 0 {
                let _ = self.progress_tx.send(state.progress.snapshot(state.warnings.len()));
            }

            if !is_dir && filter.is_some_and(|f| !f.is_match(&path)) {
                continue;
            }

            match builder.build(&path, &mut state.warnings) {
                Ok(record) => {
                    if state.tracker.evaluate(&record.times) {
                        state.progress.record_emitted();
                        state.records.push(record);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping entry");
                    state.entries_skipped += 1;
                    state.warnings.push(skipped_entry_warning(&path, &e));
                }
            }
        }
    }
}

impl Default for MetaScanner {
    fn default() -> Self {
        Self::new()
    }
}
