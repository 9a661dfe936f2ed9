//! Extract command implementation

use anyhow::bail;
use anyhow::Result;
use restcheck_core::progress::ProgressMode;
use restcheck_core::progress::ProgressTracker;
use restcheck_core::ExtractionEngine;
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::cli::ExtractArgs;
use crate::output::OutputFormatter;

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    progress: ProgressMode,
) -> Result<()> {
    let config = ConfigArgs {
        workers: None,
        exclude: &[],
        follow_symlinks: false,
        ignore_case: false,
        max_member_size: args.max_member_size,
        chunk_size: args.chunk_size,
        temp_dir: args.temp_dir.as_ref(),
    }
    .build();
    debug!(
        max_member_size = config.max_member_size,
        chunk_size = config.chunk_size,
        "extraction config"
    );

    let engine = ExtractionEngine::new(config);
    let tracker = ProgressTracker::new("extraction", 100, progress);
    let result = engine.extract(&args.archive, args.output_dir.as_deref(), Some(&tracker));
    tracker.finish(if result.success {
        "Extraction completed"
    } else {
        "Extraction failed"
    });

    // Temp directories survive the engine only on request.
    if args.keep {
        engine.keep_temp_dirs();
    }

    formatter.format_extraction_result(&result)?;

    if !result.success {
        bail!("Extraction failed");
    }
    Ok(())
}
