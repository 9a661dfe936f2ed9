//! Plain-text comparison report rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::Local;

use crate::compare::types::ComparisonResult;
use crate::compare::types::DiffKind;
use crate::compare::types::FileDifference;

const BANNER: &str = "================================================================================";
const RULE: &str = "----------------------------------------";
const MAX_PER_GROUP: usize = 10;

/// Renders a comparison result as a detailed plain-text report.
///
/// Differences are grouped by kind in a stable order and capped at ten
/// entries per group, so the report stays readable for badly broken
/// restores.
#[must_use]
pub fn generate_report(result: &ComparisonResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "BACKUP VERIFICATION COMPARISON REPORT");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", result.summary());

    if result.has_differences() {
        let _ = writeln!(out, "DIFFERENCES FOUND:");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out);

        let mut grouped: BTreeMap<usize, Vec<&FileDifference>> = BTreeMap::new();
        for diff in &result.differences {
            let order = DiffKind::ALL
                .iter()
                .position(|k| *k == diff.kind)
                .unwrap_or(DiffKind::ALL.len());
            grouped.entry(order).or_default().push(diff);
        }

        for diffs in grouped.values() {
            let kind = diffs[0].kind;
            let _ = writeln!(out, "{} ({} files):", kind.label(), diffs.len());
            let _ = writeln!(out);

            for diff in diffs.iter().take(MAX_PER_GROUP) {
                let _ = writeln!(out, "  \u{2022} {}", diff.path.display());
                if !diff.details.is_empty() {
                    let _ = writeln!(out, "    {}", diff.details);
                }
                let _ = writeln!(out);
            }
            if diffs.len() > MAX_PER_GROUP {
                let _ = writeln!(out, "  ... and {} more files", diffs.len() - MAX_PER_GROUP);
                let _ = writeln!(out);
            }
        }
    }

    if !result.errors.is_empty() {
        let _ = writeln!(out, "ERRORS ENCOUNTERED:");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out);
        for error in &result.errors {
            let _ = writeln!(out, "  \u{2022} {error}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(
        out,
        "Report generated at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = write!(out, "{BANNER}");
    out
}
