//! End-to-end restoration verification: extract, then compare.

use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;

use serde_json::json;
use tracing::info;

use crate::cancel::CancelToken;
use crate::compare::generate_report;
use crate::compare::ComparisonEngine;
use crate::compare::ComparisonMode;
use crate::compare::ComparisonResult;
use crate::config::VerifyConfig;
use crate::extract::ExtractionEngine;
use crate::extract::ExtractionResult;
use crate::fmt::group_thousands;
use crate::progress::ProgressMode;
use crate::progress::ProgressTracker;

/// Options for a verification run.
#[derive(Debug, Default)]
pub struct VerifyOptions {
    /// Shared engine configuration.
    pub config: VerifyConfig,
    /// Comparison mode to run after extraction.
    pub mode: ComparisonMode,
    /// Extraction destination. A private temporary directory when `None`.
    pub destination: Option<PathBuf>,
    /// Keep the temporary extraction directory after the run.
    pub keep_extraction: bool,
    /// How progress is surfaced.
    pub progress_mode: ProgressMode,
    /// Cancellation token shared by both phases.
    pub cancel: CancelToken,
}

/// Combined outcome of the extraction and comparison phases.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Extraction phase outcome.
    pub extraction: ExtractionResult,
    /// Comparison phase outcome. `None` when extraction failed.
    pub comparison: Option<ComparisonResult>,
}

impl VerificationReport {
    /// Returns `true` when extraction succeeded and the comparison found
    /// no differences.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.extraction.success
            && self
                .comparison
                .as_ref()
                .is_some_and(|c| !c.has_differences())
    }

    /// Returns `true` when the comparison ran and found differences.
    #[must_use]
    pub fn has_differences(&self) -> bool {
        self.comparison
            .as_ref()
            .is_some_and(ComparisonResult::has_differences)
    }

    /// Serializes the report for machine consumption.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "passed": self.passed(),
            "extraction": self.extraction.to_json(),
            "comparison": self.comparison.as_ref().map(ComparisonResult::to_json),
        })
    }

    /// Renders the full plain-text report, for failed runs included.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let extraction = &self.extraction;

        let _ = writeln!(out, "Extraction Summary:");
        let _ = writeln!(
            out,
            "  Status: {}",
            if extraction.success { "success" } else { "failed" }
        );
        let _ = writeln!(out, "  Format: {}", extraction.format_detected);
        if let Some(path) = &extraction.extraction_path {
            let _ = writeln!(out, "  Path: {}", path.display());
        }
        let _ = writeln!(out, "  Files: {}", group_thousands(extraction.file_count));
        let _ = writeln!(
            out,
            "  Bytes: {}",
            group_thousands(extraction.total_size)
        );
        let _ = writeln!(out, "  Duration: {:.2}s", extraction.metadata.duration());
        if let Some(checksum) = &extraction.checksum {
            let _ = writeln!(out, "  Archive SHA-256: {checksum}");
        }
        if let Some(message) = &extraction.error_message {
            let _ = writeln!(out, "  Error: {message}");
        }
        for warning in &extraction.metadata.warnings {
            let _ = writeln!(out, "  Warning: {warning}");
        }
        for error in &extraction.metadata.errors {
            if Some(error) != extraction.error_message.as_ref() {
                let _ = writeln!(out, "  Error: {error}");
            }
        }

        if let Some(comparison) = &self.comparison {
            let _ = writeln!(out);
            let _ = write!(out, "{}", generate_report(comparison));
        }
        out
    }
}

/// Extracts `archive` and compares the result against `source`.
///
/// The two phases report into sub-trackers of a single root tracker, so
/// console mode shows one bar for the whole run. When extraction fails
/// the comparison is skipped and the report carries only the extraction
/// outcome. Temporary extraction directories are removed before this
/// function returns unless `keep_extraction` is set.
#[must_use]
pub fn verify_restoration(
    archive: &Path,
    source: &Path,
    options: &VerifyOptions,
) -> VerificationReport {
    let root = ProgressTracker::new("verification", 2, options.progress_mode);
    root.start();

    let engine = ExtractionEngine::with_cancel(options.config.clone(), options.cancel.clone());
    let extract_progress = root.add_sub_operation("extraction", 100, ProgressMode::Silent);
    let extraction = engine.extract(
        archive,
        options.destination.as_deref(),
        Some(&extract_progress),
    );
    extract_progress.finish(if extraction.success {
        "Extraction completed"
    } else {
        "Extraction failed"
    });
    root.update(1, "Extraction phase complete");

    let comparison = match (&extraction.success, &extraction.extraction_path) {
        (true, Some(target)) => {
            let compare_progress = root.add_sub_operation("comparison", 100, ProgressMode::Silent);
            let compare_engine =
                ComparisonEngine::with_cancel(options.config.clone(), options.cancel.clone());
            let result =
                compare_engine.compare(source, target, options.mode, Some(&compare_progress));
            compare_progress.finish("Comparison completed");
            root.update(1, "Comparison phase complete");
            Some(result)
        }
        _ => {
            info!("skipping comparison after failed extraction");
            None
        }
    };

    if options.keep_extraction {
        engine.keep_temp_dirs();
    }
    drop(engine);

    let report = VerificationReport {
        extraction,
        comparison,
    };
    root.finish(if report.passed() {
        "Verification passed"
    } else {
        "Verification failed"
    });
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_tar;
    use crate::test_utils::write_tree;
    use std::fs;

    #[test]
    fn test_verify_identical_restore_passes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_tree(&source, &[("a.txt", "alpha"), ("sub/b.txt", "beta")]);

        let bytes = create_test_tar(&[("a.txt", b"alpha"), ("sub/b.txt", b"beta")]);
        let archive = dir.path().join("backup.tar");
        fs::write(&archive, bytes).unwrap();

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            mode: ComparisonMode::ChecksumOnly,
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&archive, &source, &options);

        assert!(report.extraction.success);
        assert!(report.passed(), "{}", report.render());
        assert!(!report.has_differences());
    }

    #[test]
    fn test_verify_detects_drift() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_tree(&source, &[("a.txt", "alpha"), ("extra.txt", "only here")]);

        let bytes = create_test_tar(&[("a.txt", b"tampered")]);
        let archive = dir.path().join("backup.tar");
        fs::write(&archive, bytes).unwrap();

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            mode: ComparisonMode::ChecksumOnly,
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&archive, &source, &options);

        assert!(report.extraction.success);
        assert!(!report.passed());
        let comparison = report.comparison.as_ref().unwrap();
        assert_eq!(comparison.files_missing_target, 1);
        assert_eq!(comparison.files_different, 1);
        assert!(report.render().contains("BACKUP VERIFICATION COMPARISON REPORT"));
    }

    #[test]
    fn test_failed_extraction_skips_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_tree(&source, &[("a.txt", "alpha")]);

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&dir.path().join("missing.tar"), &source, &options);

        assert!(!report.extraction.success);
        assert!(report.comparison.is_none());
        assert!(!report.passed());
        assert!(report.render().contains("Status: failed"));
    }

    #[test]
    fn test_temp_extraction_cleaned_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_tree(&source, &[("a.txt", "alpha")]);

        let bytes = create_test_tar(&[("a.txt", b"alpha")]);
        let archive = dir.path().join("backup.tar");
        fs::write(&archive, bytes).unwrap();

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            config: VerifyConfig {
                temp_base_dir: Some(dir.path().join("scratch")),
                ..VerifyConfig::default()
            },
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&archive, &source, &options);
        let path = report.extraction.extraction_path.clone().unwrap();
        assert!(!path.exists());

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            keep_extraction: true,
            config: VerifyConfig {
                temp_base_dir: Some(dir.path().join("scratch")),
                ..VerifyConfig::default()
            },
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&archive, &source, &options);
        let path = report.extraction.extraction_path.clone().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_report_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_tree(&source, &[("a.txt", "alpha")]);

        let bytes = create_test_tar(&[("a.txt", b"alpha")]);
        let archive = dir.path().join("backup.tar");
        fs::write(&archive, bytes).unwrap();

        let options = VerifyOptions {
            progress_mode: ProgressMode::Silent,
            mode: ComparisonMode::ChecksumOnly,
            ..VerifyOptions::default()
        };
        let report = verify_restoration(&archive, &source, &options);
        let value = report.to_json();
        assert_eq!(value["passed"], json!(true));
        assert!(value["extraction"]["success"].as_bool().unwrap());
        assert!(value["comparison"]["success_rate"].as_f64().is_some());
    }
}
