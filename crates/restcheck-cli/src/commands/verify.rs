//! Verify command implementation

use anyhow::bail;
use anyhow::Result;
use restcheck_core::progress::ProgressMode;
use restcheck_core::verify_restoration;
use restcheck_core::ComparisonMode;
use restcheck_core::VerifyOptions;
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::cli::VerifyArgs;
use crate::output::OutputFormatter;

pub fn execute(
    args: &VerifyArgs,
    formatter: &dyn OutputFormatter,
    progress: ProgressMode,
) -> Result<()> {
    let mode: ComparisonMode = args.mode.parse()?;
    let config = ConfigArgs {
        workers: args.workers,
        exclude: &args.exclude,
        follow_symlinks: args.follow_symlinks,
        ignore_case: args.ignore_case,
        max_member_size: args.max_member_size,
        chunk_size: None,
        temp_dir: args.temp_dir.as_ref(),
    }
    .build();
    debug!(
        archive = %args.archive.display(),
        source = %args.source.display(),
        mode = mode.as_str(),
        "verification config"
    );

    let options = VerifyOptions {
        config,
        mode,
        destination: args.destination.clone(),
        keep_extraction: args.keep,
        progress_mode: progress,
        cancel: restcheck_core::CancelToken::new(),
    };
    let report = verify_restoration(&args.archive, &args.source, &options);

    formatter.format_verification_report(&report)?;

    if !report.extraction.success {
        bail!("Extraction failed");
    }
    if report.has_differences() {
        bail!("Differences found");
    }
    Ok(())
}
