//! Error types for verification operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `VerifyError`.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Errors that can occur during extraction, comparison, or verification.
///
/// Per-member and per-pair failures are *collected* into result metadata by
/// the engines and never escape their originating loop; only pre-flight
/// validation failures and unrecoverable top-level I/O reach callers, and
/// even those are folded into a `success = false` result at the engine
/// boundary.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive format is unsupported or unrecognized.
    #[error("unsupported or unrecognized archive format: {path}")]
    UnsupportedFormat {
        /// Path to the archive that could not be identified.
        path: PathBuf,
    },

    /// Input path does not exist.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Input path exists but is not a regular file.
    #[error("not a file: {path}")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// Archive member path failed security validation.
    #[error("unsafe archive member path {path}: {reason}")]
    SecurityViolation {
        /// The member path as declared in the archive.
        path: PathBuf,
        /// Why the path was rejected.
        reason: String,
    },

    /// Archive member declares a size above the configured ceiling.
    #[error("oversized archive member {path}: {size} bytes exceeds limit {limit}")]
    OversizedMember {
        /// The member path as declared in the archive.
        path: PathBuf,
        /// Declared member size in bytes.
        size: u64,
        /// Configured size ceiling in bytes.
        limit: u64,
    },

    /// Operation was cancelled through the shared cancellation token.
    #[error("operation interrupted")]
    Interrupted,

    /// Archive is corrupted or cannot be parsed.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A single file-pair comparison task failed.
    #[error("comparison failed for {path}: {reason}")]
    ComparisonTask {
        /// Tree-relative path of the pair.
        path: PathBuf,
        /// Underlying failure description.
        reason: String,
    },

    /// Unknown comparison mode string.
    #[error("unknown comparison mode: {0}")]
    UnknownMode(String),
}

impl VerifyError {
    /// Returns `true` if this error aborts the whole operation.
    ///
    /// Non-fatal errors are recorded in result metadata (as warnings or
    /// errors) and processing continues with the remaining items.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::UnsupportedFormat { .. }
                | Self::PathNotFound { .. }
                | Self::NotAFile { .. }
                | Self::Interrupted
                | Self::InvalidArchive(_)
                | Self::UnknownMode(_)
        )
    }

    /// Returns `true` if this error is recorded as a *warning* rather than
    /// an error: the member is skipped but the run is not degraded.
    #[must_use]
    pub const fn is_member_warning(&self) -> bool {
        matches!(
            self,
            Self::SecurityViolation { .. } | Self::OversizedMember { .. }
        )
    }
}
