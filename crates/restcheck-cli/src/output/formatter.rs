//! Output formatter trait for CLI results.

use anyhow::Result;
use restcheck_core::ComparisonResult;
use restcheck_core::ExtractionResult;
use restcheck_core::VerificationReport;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format extraction result
    fn format_extraction_result(&self, result: &ExtractionResult) -> Result<()>;

    /// Format comparison result
    fn format_comparison_result(&self, result: &ComparisonResult) -> Result<()>;

    /// Format end-to-end verification report
    fn format_verification_report(&self, report: &VerificationReport) -> Result<()>;
}
