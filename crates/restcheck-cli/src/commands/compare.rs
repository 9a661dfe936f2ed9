//! Compare command implementation

use anyhow::bail;
use anyhow::Result;
use restcheck_core::progress::ProgressMode;
use restcheck_core::progress::ProgressTracker;
use restcheck_core::ComparisonEngine;
use restcheck_core::ComparisonMode;
use tracing::debug;

use crate::cli::CompareArgs;
use crate::cli::ConfigArgs;
use crate::output::OutputFormatter;

pub fn execute(
    args: &CompareArgs,
    formatter: &dyn OutputFormatter,
    progress: ProgressMode,
) -> Result<()> {
    let mode: ComparisonMode = args.mode.parse()?;
    let config = ConfigArgs {
        workers: args.workers,
        exclude: &args.exclude,
        follow_symlinks: args.follow_symlinks,
        ignore_case: args.ignore_case,
        max_member_size: None,
        chunk_size: None,
        temp_dir: None,
    }
    .build();
    debug!(workers = config.max_workers, mode = mode.as_str(), "comparison config");

    let engine = ComparisonEngine::new(config);
    let tracker = ProgressTracker::new("comparison", 100, progress);
    let result = engine.compare(&args.source, &args.target, mode, Some(&tracker));
    tracker.finish("Comparison completed");

    formatter.format_comparison_result(&result)?;

    if !result.errors.is_empty() && result.total_files_processed == 0 {
        bail!("Comparison failed");
    }
    if result.has_differences() {
        bail!("Differences found");
    }
    Ok(())
}
