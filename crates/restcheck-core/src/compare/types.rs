//! Comparison modes, difference classification, and result types.

use std::path::PathBuf;
use std::str::FromStr;

use serde_json::json;

use crate::fmt::group_thousands;
use crate::VerifyError;

/// Verification strategy for a comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonMode {
    /// Size check only; metadata is evaluated just when sizes differ.
    Quick,
    /// Complete content and metadata verification.
    #[default]
    Full,
    /// Metadata comparison without checksums.
    MetadataOnly,
    /// Content checksums without permission or timestamp checks.
    ChecksumOnly,
}

impl ComparisonMode {
    /// Returns the wire tag for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Full => "full",
            Self::MetadataOnly => "metadata_only",
            Self::ChecksumOnly => "checksum_only",
        }
    }

    /// Returns whether this mode hashes file content.
    #[must_use]
    pub const fn needs_checksum(self) -> bool {
        matches!(self, Self::Full | Self::ChecksumOnly)
    }
}

impl FromStr for ComparisonMode {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            "metadata_only" => Ok(Self::MetadataOnly),
            "checksum_only" => Ok(Self::ChecksumOnly),
            other => Err(VerifyError::UnknownMode(other.to_string())),
        }
    }
}

/// Classification of a detected difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    /// Path exists in the target tree only.
    MissingSource,
    /// Path exists in the source tree only.
    MissingTarget,
    /// Regular files with different sizes.
    SizeMismatch,
    /// Regular files with different content checksums.
    ContentMismatch,
    /// Generic metadata difference.
    MetadataMismatch,
    /// Different permission bits.
    PermissionMismatch,
    /// Modification times further apart than the tolerance.
    TimestampMismatch,
    /// One side is a file, the other a directory.
    TypeMismatch,
}

impl DiffKind {
    /// Stable ordering used when grouping differences in reports.
    pub const ALL: [Self; 8] = [
        Self::MissingSource,
        Self::MissingTarget,
        Self::SizeMismatch,
        Self::ContentMismatch,
        Self::MetadataMismatch,
        Self::PermissionMismatch,
        Self::TimestampMismatch,
        Self::TypeMismatch,
    ];

    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::MissingSource => "missing_source",
            Self::MissingTarget => "missing_target",
            Self::SizeMismatch => "size_mismatch",
            Self::ContentMismatch => "content_mismatch",
            Self::MetadataMismatch => "metadata_mismatch",
            Self::PermissionMismatch => "permission_mismatch",
            Self::TimestampMismatch => "timestamp_mismatch",
            Self::TypeMismatch => "type_mismatch",
        }
    }

    /// Returns the uppercase report heading for this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingSource => "MISSING SOURCE",
            Self::MissingTarget => "MISSING TARGET",
            Self::SizeMismatch => "SIZE MISMATCH",
            Self::ContentMismatch => "CONTENT MISMATCH",
            Self::MetadataMismatch => "METADATA MISMATCH",
            Self::PermissionMismatch => "PERMISSION MISMATCH",
            Self::TimestampMismatch => "TIMESTAMP MISMATCH",
            Self::TypeMismatch => "TYPE MISMATCH",
        }
    }
}

/// Snapshot of one filesystem entry.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Absolute path the metadata was read from.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Modification time as seconds since the unix epoch.
    pub mtime: f64,
    /// Raw mode bits. Zero on platforms without unix permissions.
    pub mode: u32,
    /// Whether the entry is a regular file.
    pub is_file: bool,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Whether the entry itself is a symlink.
    pub is_symlink: bool,
    /// SHA-256 of file content, when the mode hashes content.
    pub checksum: Option<String>,
}

/// A single detected difference between the two trees.
#[derive(Debug, Clone)]
pub struct FileDifference {
    /// Tree-relative path of the differing entry.
    pub path: PathBuf,
    /// Classification of the difference.
    pub kind: DiffKind,
    /// Metadata from the source tree, when available.
    pub source: Option<FileMetadata>,
    /// Metadata from the target tree, when available.
    pub target: Option<FileMetadata>,
    /// Human-readable detail line.
    pub details: String,
}

impl FileDifference {
    pub(crate) fn new(path: impl Into<PathBuf>, kind: DiffKind, details: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            source: None,
            target: None,
            details: details.into(),
        }
    }
}

/// Aggregated outcome of a tree comparison.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Source (reference) tree root.
    pub source_path: PathBuf,
    /// Target (extracted) tree root.
    pub target_path: PathBuf,
    /// Mode the comparison ran in.
    pub comparison_mode: ComparisonMode,
    /// Number of unique paths across both trees.
    pub total_files_processed: u64,
    /// Number of directory entries across both trees.
    pub total_directories_processed: u64,
    /// Common pairs with no differences.
    pub files_identical: u64,
    /// Common pairs with at least one difference.
    pub files_different: u64,
    /// Paths present only in the target tree.
    pub files_missing_source: u64,
    /// Paths present only in the source tree.
    pub files_missing_target: u64,
    /// All detected differences.
    pub differences: Vec<FileDifference>,
    /// Wall-clock duration in seconds.
    pub processing_time: f64,
    /// Sum of source sizes of the compared pairs.
    pub total_bytes_processed: u64,
    /// Exclusion patterns that were in effect.
    pub excluded_patterns: Vec<String>,
    /// Failures that did not stop the run.
    pub errors: Vec<String>,
}

impl ComparisonResult {
    pub(crate) fn new(
        source_path: PathBuf,
        target_path: PathBuf,
        comparison_mode: ComparisonMode,
        excluded_patterns: Vec<String>,
    ) -> Self {
        Self {
            source_path,
            target_path,
            comparison_mode,
            total_files_processed: 0,
            total_directories_processed: 0,
            files_identical: 0,
            files_different: 0,
            files_missing_source: 0,
            files_missing_target: 0,
            differences: Vec::new(),
            processing_time: 0.0,
            total_bytes_processed: 0,
            excluded_patterns,
            errors: Vec::new(),
        }
    }

    /// Percentage of processed paths that were identical. 100.0 when no
    /// paths were processed, so empty trees verify clean.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_files_processed == 0 {
            100.0
        } else {
            (self.files_identical as f64 / self.total_files_processed as f64) * 100.0
        }
    }

    /// Returns `true` if any difference was detected.
    #[must_use]
    pub fn has_differences(&self) -> bool {
        !self.differences.is_empty()
    }

    /// Human-readable summary block.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Comparison Summary:\n\
             \x20 Source: {}\n\
             \x20 Target: {}\n\
             \x20 Mode: {}\n\
             \x20 Files Processed: {}\n\
             \x20 Directories Processed: {}\n\
             \x20 Identical Files: {}\n\
             \x20 Different Files: {}\n\
             \x20 Missing in Source: {}\n\
             \x20 Missing in Target: {}\n\
             \x20 Success Rate: {:.2}%\n\
             \x20 Processing Time: {:.2}s\n\
             \x20 Bytes Processed: {}\n\
             \x20 Errors: {}\n",
            self.source_path.display(),
            self.target_path.display(),
            self.comparison_mode.as_str(),
            self.total_files_processed,
            self.total_directories_processed,
            self.files_identical,
            self.files_different,
            self.files_missing_source,
            self.files_missing_target,
            self.success_rate(),
            self.processing_time,
            group_thousands(self.total_bytes_processed),
            self.errors.len(),
        )
    }

    /// Serializes the result for machine consumption.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "source_path": self.source_path.display().to_string(),
            "target_path": self.target_path.display().to_string(),
            "comparison_mode": self.comparison_mode.as_str(),
            "total_files_processed": self.total_files_processed,
            "total_directories_processed": self.total_directories_processed,
            "files_identical": self.files_identical,
            "files_different": self.files_different,
            "files_missing_source": self.files_missing_source,
            "files_missing_target": self.files_missing_target,
            "success_rate": self.success_rate(),
            "processing_time": self.processing_time,
            "total_bytes_processed": self.total_bytes_processed,
            "excluded_patterns": self.excluded_patterns,
            "differences": self.differences.iter().map(|d| json!({
                "path": d.path.display().to_string(),
                "type": d.kind.tag(),
                "details": d.details,
            })).collect::<Vec<_>>(),
            "errors": self.errors,
        })
    }
}
