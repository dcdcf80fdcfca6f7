//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files visited so far.
    pub files_visited: u64,
    /// Number of directories visited so far.
    pub dirs_visited: u64,
    /// Number of records that passed the change filter.
    pub records_emitted: u64,
    /// Path most recently visited.
    pub current_path: PathBuf,
    /// Number of warnings encountered.
    pub warnings_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_visited: 0,
            dirs_visited: 0,
            records_emitted: 0,
            current_path: PathBuf::new(),
            warnings_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate visit rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_visited() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total entries visited (files + dirs).
    pub fn total_visited(&self) -> u64 {
        self.files_visited + self.dirs_visited
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_visited: u64,
    dirs_visited: u64,
    records_emitted: u64,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_visited: 0,
            dirs_visited: 0,
            records_emitted: 0,
            current_path: PathBuf::new(),
        }
    }

    pub fn record_visit(&mut self, path: &std::path::Path, is_dir: bool) {
        if is_dir {
            self.dirs_visited += 1;
        } else {
            self.files_visited += 1;
        }
        self.current_path = path.to_path_buf();
    }

    pub fn record_emitted(&mut self) {
        self.records_emitted += 1;
    }

    pub fn total_visited(&self) -> u64 {
        self.files_visited + self.dirs_visited
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self, warnings_count: usize) -> ScanProgress {
        ScanProgress {
            files_visited: self.files_visited,
            dirs_visited: self.dirs_visited,
            records_emitted: self.records_emitted,
            current_path: self.current_path.clone(),
            warnings_count: warnings_count as u64,
            elapsed: self.start_time.elapsed(),
        }
    }
}
