//! Archive extraction: format detection, member path validation, and the
//! streaming extraction engine.

mod engine;
mod format;
mod paths;
mod result;

pub use engine::ExtractionEngine;
pub use format::detect_format;
pub use format::ArchiveFormat;
pub use paths::validate_member_path;
pub use paths::validate_symlink_target;
pub use result::ExtractionMetadata;
pub use result::ExtractionResult;
