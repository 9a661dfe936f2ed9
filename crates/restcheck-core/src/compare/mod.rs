//! Tree comparison: collection, parallel pair evaluation, and reporting.

mod engine;
mod report;
mod types;
mod walk;

pub use engine::ComparisonEngine;
pub use report::generate_report;
pub use types::ComparisonMode;
pub use types::ComparisonResult;
pub use types::DiffKind;
pub use types::FileDifference;
pub use types::FileMetadata;
pub use walk::collect_files;
