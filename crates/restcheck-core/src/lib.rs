//! Backup restoration verification library.
//!
//! `restcheck-core` answers one question: can this backup archive actually be
//! restored? It extracts an archive into a sandboxed location with security
//! validation (path traversal, oversized members), then compares the
//! extracted tree against a reference source tree and reports every
//! discrepancy, with live hierarchical progress reporting throughout.
//!
//! # Examples
//!
//! ```no_run
//! use restcheck_core::verify_restoration;
//! use restcheck_core::VerifyOptions;
//! use std::path::Path;
//!
//! let options = VerifyOptions::default();
//! let report = verify_restoration(
//!     Path::new("backup.tar.gz"),
//!     Path::new("/data/source"),
//!     &options,
//! );
//! println!("{}", report.render());
//! assert!(report.passed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
mod fmt;
pub mod hash;
pub mod progress;
pub mod test_utils;
pub mod verify;

// Re-export main API types
pub use cancel::CancelToken;
pub use compare::ComparisonEngine;
pub use compare::ComparisonMode;
pub use compare::ComparisonResult;
pub use compare::DiffKind;
pub use compare::FileDifference;
pub use compare::FileMetadata;
pub use config::VerifyConfig;
pub use error::Result;
pub use error::VerifyError;
pub use extract::ArchiveFormat;
pub use extract::ExtractionEngine;
pub use extract::ExtractionMetadata;
pub use extract::ExtractionResult;
pub use progress::ProgressMode;
pub use progress::ProgressReport;
pub use progress::ProgressTracker;
pub use verify::VerificationReport;
pub use verify::VerifyOptions;
pub use verify::verify_restoration;
