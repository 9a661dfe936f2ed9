//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::style;
use console::Term;
use restcheck_core::compare::generate_report;
use restcheck_core::ComparisonResult;
use restcheck_core::ExtractionResult;
use restcheck_core::VerificationReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn status_line(&self, ok: bool, message: &str) {
        let line = if self.use_colors {
            if ok {
                format!("{} {message}", style("\u{2713}").green().bold())
            } else {
                format!("{} {message}", style("\u{2717}").red().bold())
            }
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&line);
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, result: &ExtractionResult) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if result.success {
            self.status_line(true, "Extraction complete");
        } else {
            self.status_line(false, "Extraction failed");
            if let Some(message) = &result.error_message {
                let _ = self.term.write_line(&format!("  Error: {message}"));
            }
        }

        let _ = self
            .term
            .write_line(&format!("  Format: {}", result.format_detected));
        let _ = self
            .term
            .write_line(&format!("  Files extracted: {}", result.file_count));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(result.total_size)
        ));
        let _ = self.term.write_line(&format!(
            "  Duration: {:.2}s",
            result.metadata.duration()
        ));
        if let Some(path) = &result.extraction_path {
            let _ = self
                .term
                .write_line(&format!("  Location: {}", path.display()));
        }
        if let Some(checksum) = &result.checksum {
            let _ = self
                .term
                .write_line(&format!("  Archive SHA-256: {checksum}"));
        }

        if !result.metadata.warnings.is_empty() {
            let _ = self.term.write_line(&format!(
                "  Warnings: {}",
                result.metadata.warnings.len()
            ));
            if self.verbose {
                for warning in &result.metadata.warnings {
                    let _ = self.term.write_line(&format!("    - {warning}"));
                }
            }
        }
        if !result.metadata.errors.is_empty() && self.verbose {
            for error in &result.metadata.errors {
                let _ = self.term.write_line(&format!("    ! {error}"));
            }
        }
        Ok(())
    }

    fn format_comparison_result(&self, result: &ComparisonResult) -> Result<()> {
        if self.quiet {
            self.status_line(
                !result.has_differences(),
                &format!("{} differences", result.differences.len()),
            );
            return Ok(());
        }

        if self.verbose || result.has_differences() {
            let _ = self.term.write_line(&generate_report(result));
        } else {
            self.status_line(true, "Trees are identical");
            let _ = self.term.write_line(&result.summary());
        }
        Ok(())
    }

    fn format_verification_report(&self, report: &VerificationReport) -> Result<()> {
        if self.quiet {
            self.status_line(
                report.passed(),
                if report.passed() {
                    "Verification passed"
                } else {
                    "Verification failed"
                },
            );
            return Ok(());
        }

        let _ = self.term.write_line(&report.render());
        self.status_line(
            report.passed(),
            if report.passed() {
                "Verification passed"
            } else {
                "Verification failed"
            },
        );
        Ok(())
    }
}
