//! JSON output formatter.

use super::formatter::OutputFormatter;
use anyhow::Result;
use restcheck_core::ComparisonResult;
use restcheck_core::ExtractionResult;
use restcheck_core::VerificationReport;
use serde_json::json;

pub struct JsonFormatter;

impl JsonFormatter {
    fn emit(operation: &str, data: serde_json::Value) -> Result<()> {
        let output = json!({
            "operation": operation,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, result: &ExtractionResult) -> Result<()> {
        Self::emit("extract", result.to_json())
    }

    fn format_comparison_result(&self, result: &ComparisonResult) -> Result<()> {
        Self::emit("compare", result.to_json())
    }

    fn format_verification_report(&self, report: &VerificationReport) -> Result<()> {
        Self::emit("verify", report.to_json())
    }
}
