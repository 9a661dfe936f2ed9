//! Extraction outcome types.

use std::path::PathBuf;
use std::time::Instant;

use serde_json::json;

/// Running counters collected while an archive is extracted.
///
/// `total_files` and `total_size` describe what the archive advertises;
/// `extracted_files` and `extracted_size` describe what actually landed on
/// disk. Skipped members widen the gap between the two.
#[derive(Debug, Clone)]
pub struct ExtractionMetadata {
    /// Number of members the archive contains.
    pub total_files: u64,
    /// Declared uncompressed size of all members, in bytes.
    pub total_size: u64,
    /// Number of members extracted so far.
    pub extracted_files: u64,
    /// Bytes of regular-file content extracted so far.
    pub extracted_size: u64,
    /// When the extraction started.
    pub start: Instant,
    /// When the extraction finished, if it has.
    pub end: Option<Instant>,
    /// Non-fatal per-member failures.
    pub errors: Vec<String>,
    /// Skipped members and other advisory notes.
    pub warnings: Vec<String>,
}

impl Default for ExtractionMetadata {
    fn default() -> Self {
        Self {
            total_files: 0,
            total_size: 0,
            extracted_files: 0,
            extracted_size: 0,
            start: Instant::now(),
            end: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ExtractionMetadata {
    /// Elapsed extraction time in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        let end = self.end.unwrap_or_else(Instant::now);
        end.duration_since(self.start).as_secs_f64()
    }

    /// Percentage of members extracted, 0.0 when the archive is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.extracted_files as f64 / self.total_files as f64) * 100.0
        }
    }

    /// Marks the extraction as finished.
    pub fn finish(&mut self) {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
    }
}

/// Final outcome of a single archive extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Whether the archive was extracted without a fatal error.
    pub success: bool,
    /// Directory the archive contents were written to.
    pub extraction_path: Option<PathBuf>,
    /// Wire tag of the detected format, empty when detection failed.
    pub format_detected: String,
    /// Number of members extracted.
    pub file_count: u64,
    /// Bytes of regular-file content extracted.
    pub total_size: u64,
    /// SHA-256 of the archive file itself.
    pub checksum: Option<String>,
    /// Description of the fatal error, when `success` is false.
    pub error_message: Option<String>,
    /// Counters, warnings, and per-member errors.
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Serializes the result for machine consumption.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "success": self.success,
            "extraction_path": self.extraction_path.as_ref().map(|p| p.display().to_string()),
            "format_detected": self.format_detected,
            "file_count": self.file_count,
            "total_size": self.total_size,
            "duration": self.metadata.duration(),
            "progress_percent": self.metadata.progress_percent(),
            "checksum": self.checksum,
            "error_message": self.error_message,
            "errors": self.metadata.errors,
            "warnings": self.metadata.warnings,
        })
    }

    /// Builds a failed result carrying whatever metadata was collected.
    pub(crate) fn failed(message: String, mut metadata: ExtractionMetadata) -> Self {
        metadata.finish();
        let file_count = metadata.extracted_files;
        let total_size = metadata.extracted_size;
        Self {
            success: false,
            extraction_path: None,
            format_detected: String::new(),
            file_count,
            total_size,
            checksum: None,
            error_message: Some(message),
            metadata,
        }
    }
}
