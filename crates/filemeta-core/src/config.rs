//! Scan request types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::acl::AceRendering;
use crate::error::ScanError;
use crate::units::MB;

/// Default ceiling for content hashing.
pub const DEFAULT_HASH_SIZE_LIMIT: u64 = 500 * MB;

/// Parameters for one metadata scan.
///
/// A request is validated once when it is built and is immutable for the
/// duration of the scan. Deserialization goes through the builder, so
/// serde input gets the same defaults and validation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(
    setter(into),
    build_fn(validate = "Self::validate"),
    derive(Deserialize)
)]
#[serde(try_from = "ScanRequestBuilder")]
pub struct ScanRequest {
    /// Root path to scan.
    pub root: PathBuf,

    /// Descend into sub-directories. When false only the root is recorded.
    #[builder(default = "true")]
    pub recurse: bool,

    /// Only emit entries changed since `previous_high_water_mark`.
    #[builder(default = "false")]
    pub only_if_changed: bool,

    /// Maximum descent below the root (0 = unlimited).
    #[builder(default = "0")]
    pub depth_limit: u32,

    /// Wildcard pattern matched against the full path of files.
    #[builder(setter(into, strip_option), default)]
    pub name_filter: Option<String>,

    /// Compute a content hash for files.
    #[builder(default = "false")]
    pub hash_enabled: bool,

    /// Largest file (in bytes) that will be hashed. 0 disables hashing.
    #[builder(default = "DEFAULT_HASH_SIZE_LIMIT")]
    pub hash_size_limit: u64,

    /// High-water mark recorded by the previous scan (epoch seconds).
    #[builder(default = "0")]
    pub previous_high_water_mark: i64,

    /// How ACE types and permissions are rendered in events.
    #[builder(default)]
    pub ace_rendering: AceRendering,
}

impl ScanRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            Some(_) => {}
            None => return Err("Root path is required".to_string()),
        }

        if let Some(Some(ref pattern)) = self.name_filter {
            NameFilter::new(pattern).map_err(|e| e.to_string())?;
        }

        match self.previous_high_water_mark {
            Some(mark) if mark < 0 => {
                return Err(format!("High-water mark cannot be negative: {mark}"));
            }
            _ => {}
        }

        Ok(())
    }
}

impl From<ScanRequestBuilderError> for ScanError {
    fn from(err: ScanRequestBuilderError) -> Self {
        ScanError::invalid_config(err.to_string())
    }
}

impl TryFrom<ScanRequestBuilder> for ScanRequest {
    type Error = ScanRequestBuilderError;

    fn try_from(builder: ScanRequestBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl ScanRequest {
    /// Create a new scan request builder.
    pub fn builder() -> ScanRequestBuilder {
        ScanRequestBuilder::default()
    }

    /// Create a simple full-scan request for a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recurse: true,
            only_if_changed: false,
            depth_limit: 0,
            name_filter: None,
            hash_enabled: false,
            hash_size_limit: DEFAULT_HASH_SIZE_LIMIT,
            previous_high_water_mark: 0,
            ace_rendering: AceRendering::default(),
        }
    }

    /// Walker depth bound, `None` when unlimited.
    pub fn max_depth(&self) -> Option<usize> {
        (self.depth_limit > 0).then_some(self.depth_limit as usize)
    }

    /// Effective hashing ceiling, `None` when hashing is off.
    pub fn hash_limit(&self) -> Option<u64> {
        (self.hash_enabled && self.hash_size_limit > 0).then_some(self.hash_size_limit)
    }

    /// Timestamp an entry must exceed to be emitted, `None` for full scans.
    pub fn must_be_later_than(&self) -> Option<i64> {
        self.only_if_changed.then_some(self.previous_high_water_mark)
    }

    /// Compile the name filter, if any.
    pub fn name_matcher(&self) -> Result<Option<NameFilter>, ScanError> {
        self.name_filter.as_deref().map(NameFilter::new).transpose()
    }
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Compiled wildcard filter applied to file paths.
///
/// `*` and `?` match across path separators so `*.log` selects log files
/// at any depth.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: String,
    matcher: GlobMatcher,
}

impl NameFilter {
    /// Compile a wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self, ScanError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| ScanError::InvalidFilter {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// The pattern this filter was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether a full path matches.
    pub fn is_match(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }
}
