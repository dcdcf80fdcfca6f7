//! Checkpoint state carried between scans.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScanError;

/// State persisted after each scan of one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch seconds when the previous scan completed.
    #[serde(default)]
    pub last_run: i64,
    /// High-water mark: latest timestamp observed on the filesystem.
    #[serde(default)]
    pub latest_file_system_date: i64,
}

impl Checkpoint {
    /// Create a checkpoint.
    pub fn new(last_run: i64, latest_file_system_date: i64) -> Self {
        Self {
            last_run,
            latest_file_system_date,
        }
    }

    /// High-water mark to start the next scan from.
    ///
    /// A missing checkpoint counts as zero.
    pub fn high_water_mark(checkpoint: Option<&Checkpoint>) -> i64 {
        checkpoint.map_or(0, |c| c.latest_file_system_date.max(0))
    }

    /// Whether at least `interval` has passed since `last_run`.
    pub fn is_due(&self, interval: Duration, now: i64) -> bool {
        if self.last_run <= 0 {
            return true;
        }
        let interval = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(self.last_run) >= interval
    }

    /// Checkpoint to store after a scan, never moving the mark backwards.
    pub fn advance(previous: Option<&Checkpoint>, completed_at: i64, new_mark: i64) -> Self {
        Self {
            last_run: completed_at,
            latest_file_system_date: new_mark.max(Self::high_water_mark(previous)),
        }
    }
}

/// Persistence boundary for checkpoints, keyed by stanza.
pub trait CheckpointStore {
    /// Load the checkpoint for `stanza`.
    ///
    /// Missing and unreadable checkpoints both yield `None`.
    fn load(&self, stanza: &str) -> Option<Checkpoint>;

    /// Persist the checkpoint for `stanza`.
    fn save(&self, stanza: &str, checkpoint: &Checkpoint) -> Result<(), ScanError>;
}

/// Stores one JSON document per stanza in a directory.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the checkpoint files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File used for `stanza`.
    pub fn path_for(&self, stanza: &str) -> PathBuf {
        let name: String = stanza
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self, stanza: &str) -> Option<Checkpoint> {
        let path = self.path_for(stanza);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No checkpoint found");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to read checkpoint");
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparseable checkpoint");
                None
            }
        }
    }

    fn save(&self, stanza: &str, checkpoint: &Checkpoint) -> Result<(), ScanError> {
        let path = self.path_for(stanza);
        let checkpoint_err = |source| ScanError::Checkpoint {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(checkpoint_err)?;

        let json = serde_json::to_vec(checkpoint)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(checkpoint_err)?;
            file.write_all(&json).map_err(checkpoint_err)?;
            file.sync_all().map_err(checkpoint_err)?;
        }
        fs::rename(&tmp_path, &path).map_err(checkpoint_err)?;

        debug!(path = %path.display(), "Saved checkpoint");
        Ok(())
    }
}
