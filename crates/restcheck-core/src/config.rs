//! Configuration for verification runs.
//!
//! These values are normally supplied by an external configuration loader;
//! this struct is the boundary between that collaborator and the engines.

use std::path::PathBuf;

/// Chunk size for streaming reads (checksums and member extraction).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Ceiling on the declared size of a single archive member.
pub const DEFAULT_MAX_MEMBER_SIZE: u64 = 10 * 1024 * 1024 * 1024; // 10 GiB

/// Tolerance for `full`-mode timestamp comparison, in seconds.
///
/// Filesystems and clocks disagree at sub-second granularity; two mtimes
/// within this window are considered equal.
pub const TIMESTAMP_TOLERANCE_SECS: f64 = 1.0;

/// Configuration shared by the extraction and comparison engines.
///
/// # Examples
///
/// ```
/// use restcheck_core::VerifyConfig;
///
/// let config = VerifyConfig {
///     exclude_patterns: vec!["*.tmp".to_string(), ".git".to_string()],
///     ..Default::default()
/// };
/// assert!(config.max_workers >= 1);
/// ```
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Maximum number of worker threads for parallel comparison.
    pub max_workers: usize,

    /// Chunk size in bytes for streaming file reads.
    pub chunk_size: usize,

    /// Glob patterns excluded from comparison.
    pub exclude_patterns: Vec<String>,

    /// Follow symbolic links during tree enumeration.
    pub follow_symlinks: bool,

    /// Whether relative-path keys are compared case-sensitively.
    pub case_sensitive: bool,

    /// Maximum declared size of a single archive member in bytes.
    pub max_member_size: u64,

    /// Base directory for extraction temp directories (system temp if
    /// `None`).
    pub temp_base_dir: Option<PathBuf>,

    /// Timestamp comparison tolerance in seconds (`full` mode only).
    pub timestamp_tolerance: f64,
}

impl Default for VerifyConfig {
    /// Creates a `VerifyConfig` with the standard defaults.
    ///
    /// Default values:
    /// - `max_workers`: `min(32, available_parallelism + 4)`
    /// - `chunk_size`: 8 KiB
    /// - `exclude_patterns`: empty
    /// - `follow_symlinks`: false
    /// - `case_sensitive`: true
    /// - `max_member_size`: 10 GiB
    /// - `temp_base_dir`: `None` (system temp)
    /// - `timestamp_tolerance`: 1.0 s
    fn default() -> Self {
        Self {
            max_workers: default_worker_count(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            exclude_patterns: Vec::new(),
            follow_symlinks: false,
            case_sensitive: true,
            max_member_size: DEFAULT_MAX_MEMBER_SIZE,
            temp_base_dir: None,
            timestamp_tolerance: TIMESTAMP_TOLERANCE_SECS,
        }
    }
}

/// Default comparison worker count: `min(32, available_parallelism + 4)`.
#[must_use]
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (cpus + 4).min(32)
}
