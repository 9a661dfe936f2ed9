//! Parallel tree comparison.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::cancel::CancelToken;
use crate::compare::types::ComparisonMode;
use crate::compare::types::ComparisonResult;
use crate::compare::types::DiffKind;
use crate::compare::types::FileDifference;
use crate::compare::types::FileMetadata;
use crate::compare::walk::collect_files;
use crate::config::VerifyConfig;
use crate::hash::sha256_file;
use crate::progress::ProgressTracker;
use crate::Result;
use crate::VerifyError;

/// Outcome of comparing one common path pair.
struct PairOutcome {
    differences: Vec<FileDifference>,
    bytes: u64,
    error: Option<String>,
    interrupted: bool,
}

/// Compares a reference tree against an extracted tree.
///
/// Common paths are compared in parallel on a dedicated rayon pool sized
/// by `max_workers`. The engine never fails a run for a single unreadable
/// pair; such pairs are recorded as errors and counted as differing.
#[derive(Debug)]
pub struct ComparisonEngine {
    config: VerifyConfig,
    cancel: CancelToken,
}

impl ComparisonEngine {
    /// Creates an engine with its own cancellation token.
    #[must_use]
    pub fn new(config: VerifyConfig) -> Self {
        Self::with_cancel(config, CancelToken::new())
    }

    /// Creates an engine driven by an external cancellation token.
    #[must_use]
    pub const fn with_cancel(config: VerifyConfig, cancel: CancelToken) -> Self {
        Self { config, cancel }
    }

    /// Returns the engine's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Compares `source` against `target` in the given mode.
    ///
    /// Never returns an error: pre-flight failures are recorded in the
    /// result's error list and leave the counters at zero. `progress` is
    /// scaled to 0..=100.
    pub fn compare(
        &self,
        source: &Path,
        target: &Path,
        mode: ComparisonMode,
        progress: Option<&ProgressTracker>,
    ) -> ComparisonResult {
        let started = Instant::now();
        let mut result = ComparisonResult::new(
            source.to_path_buf(),
            target.to_path_buf(),
            mode,
            self.config.exclude_patterns.clone(),
        );

        info!(
            mode = mode.as_str(),
            source = %source.display(),
            target = %target.display(),
            "starting comparison"
        );

        if let Err(e) = self.run(source, target, mode, progress, &mut result) {
            let message = format!("Comparison failed: {e}");
            error!("{message}");
            result.errors.push(message);
        }

        result.processing_time = started.elapsed().as_secs_f64();
        info!(
            duration = format!("{:.2}s", result.processing_time),
            success_rate = format!("{:.2}%", result.success_rate()),
            "comparison completed"
        );
        result
    }

    fn run(
        &self,
        source: &Path,
        target: &Path,
        mode: ComparisonMode,
        progress: Option<&ProgressTracker>,
        result: &mut ComparisonResult,
    ) -> Result<()> {
        if !source.exists() {
            return Err(VerifyError::PathNotFound {
                path: source.to_path_buf(),
            });
        }
        if !target.exists() {
            return Err(VerifyError::PathNotFound {
                path: target.to_path_buf(),
            });
        }

        if let Some(tracker) = progress {
            tracker.set_current(0, "Collecting source files...");
        }
        let source_files = collect_files(source, &self.config)?;

        if let Some(tracker) = progress {
            tracker.set_current(5, "Collecting target files...");
        }
        let target_files = collect_files(target, &self.config)?;

        debug!(
            source_entries = source_files.len(),
            target_entries = target_files.len(),
            "collected trees"
        );

        let mut common = Vec::new();
        for (rel, source_abs) in &source_files {
            match target_files.get(rel) {
                Some(target_abs) => common.push((rel.clone(), source_abs.clone(), target_abs.clone())),
                None => {
                    result.differences.push(FileDifference::new(
                        rel.clone(),
                        DiffKind::MissingTarget,
                        "File exists in source but not in target",
                    ));
                    result.files_missing_target += 1;
                }
            }
        }
        for rel in target_files.keys() {
            if !source_files.contains_key(rel) {
                result.differences.push(FileDifference::new(
                    rel.clone(),
                    DiffKind::MissingSource,
                    "File exists in target but not in source",
                ));
                result.files_missing_source += 1;
            }
        }

        if !common.is_empty() {
            info!(pairs = common.len(), "comparing common files");
            self.compare_common(&common, mode, progress, result)?;
        }

        result.total_files_processed =
            (common.len() + result.files_missing_source as usize + result.files_missing_target as usize)
                as u64;
        result.total_directories_processed = count_dirs(&source_files) + count_dirs(&target_files);

        if let Some(tracker) = progress {
            tracker.set_current(100, "Comparison completed");
        }
        Ok(())
    }

    fn compare_common(
        &self,
        common: &[(String, PathBuf, PathBuf)],
        mode: ComparisonMode,
        progress: Option<&ProgressTracker>,
        result: &mut ComparisonResult,
    ) -> Result<()> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers)
            .build()
            .map_err(|e| VerifyError::ComparisonTask {
                path: PathBuf::new(),
                reason: format!("failed to build worker pool: {e}"),
            })?;

        let completed = AtomicU64::new(0);
        let total = common.len() as u64;

        let outcomes: Vec<PairOutcome> = pool.install(|| {
            common
                .par_iter()
                .map(|(rel, source_abs, target_abs)| {
                    let outcome = self.compare_pair(rel, source_abs, target_abs, mode);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(tracker) = progress {
                        // Pair work spans 10..=99 of the tracker scale.
                        let percent = 10 + done * 89 / total.max(1);
                        tracker.set_current(percent, &format!("Compared: {rel}"));
                    }
                    outcome
                })
                .collect()
        });

        let mut interrupted = false;
        for outcome in outcomes {
            result.total_bytes_processed += outcome.bytes;
            if let Some(message) = outcome.error {
                result.errors.push(message);
            }
            // Interrupted pairs were never evaluated and count toward
            // neither the identical nor the different tally.
            if outcome.interrupted {
                interrupted = true;
            } else if outcome.differences.is_empty() {
                result.files_identical += 1;
            } else {
                result.files_different += 1;
            }
            result.differences.extend(outcome.differences);
        }

        if interrupted {
            result.errors.push("Comparison interrupted".to_string());
        }
        Ok(())
    }

    fn compare_pair(
        &self,
        rel: &str,
        source_abs: &Path,
        target_abs: &Path,
        mode: ComparisonMode,
    ) -> PairOutcome {
        if self.cancel.is_cancelled() {
            return PairOutcome {
                differences: Vec::new(),
                bytes: 0,
                error: None,
                interrupted: true,
            };
        }

        match self.try_compare_pair(rel, source_abs, target_abs, mode) {
            Ok((differences, bytes)) => PairOutcome {
                differences,
                bytes,
                error: None,
                interrupted: false,
            },
            Err(e) => {
                let message = format!("Error comparing {rel}: {e}");
                error!("{message}");
                // An unreadable pair is reported both as an error and as a
                // content difference so it can never count as identical.
                PairOutcome {
                    differences: vec![FileDifference::new(
                        rel,
                        DiffKind::ContentMismatch,
                        format!("Comparison error: {e}"),
                    )],
                    bytes: 0,
                    error: Some(message),
                    interrupted: false,
                }
            }
        }
    }

    fn try_compare_pair(
        &self,
        rel: &str,
        source_abs: &Path,
        target_abs: &Path,
        mode: ComparisonMode,
    ) -> Result<(Vec<FileDifference>, u64)> {
        let source_meta = self.file_metadata(source_abs, mode)?;
        let target_meta = self.file_metadata(target_abs, mode)?;
        let bytes = source_meta.size;

        // Quick mode only inspects pairs whose sizes already disagree.
        let differences = if mode != ComparisonMode::Quick || source_meta.size != target_meta.size {
            self.evaluate(rel, &source_meta, &target_meta, mode)
        } else {
            Vec::new()
        };

        Ok((differences, bytes))
    }

    /// Reads metadata for one entry, hashing content when the mode needs it.
    fn file_metadata(&self, path: &Path, mode: ComparisonMode) -> Result<FileMetadata> {
        let stat = std::fs::metadata(path)?;
        let is_symlink = std::fs::symlink_metadata(path)?.file_type().is_symlink();
        let mtime = stat
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64());

        #[cfg(unix)]
        let mode_bits = {
            use std::os::unix::fs::PermissionsExt;
            stat.permissions().mode()
        };
        #[cfg(not(unix))]
        let mode_bits = 0;

        let mut metadata = FileMetadata {
            path: path.to_path_buf(),
            size: stat.len(),
            mtime,
            mode: mode_bits,
            is_file: stat.is_file(),
            is_dir: stat.is_dir(),
            is_symlink,
            checksum: None,
        };

        if mode.needs_checksum() && metadata.is_file && !metadata.is_symlink {
            metadata.checksum = Some(sha256_file(path, self.config.chunk_size, &self.cancel)?);
        }
        Ok(metadata)
    }

    /// Evaluates one metadata pair into differences.
    ///
    /// A type mismatch short-circuits the remaining checks. Permission and
    /// timestamp checks run in full mode only; timestamps disagree only
    /// beyond the configured tolerance, absorbing filesystem rounding.
    fn evaluate(
        &self,
        rel: &str,
        source: &FileMetadata,
        target: &FileMetadata,
        mode: ComparisonMode,
    ) -> Vec<FileDifference> {
        let mut differences = Vec::new();
        let with_meta = |mut diff: FileDifference| {
            diff.source = Some(source.clone());
            diff.target = Some(target.clone());
            diff
        };

        if source.is_file != target.is_file || source.is_dir != target.is_dir {
            differences.push(with_meta(FileDifference::new(
                rel,
                DiffKind::TypeMismatch,
                format!(
                    "Type mismatch: source={}, target={}",
                    kind_word(source),
                    kind_word(target)
                ),
            )));
            return differences;
        }

        if source.size != target.size {
            differences.push(with_meta(FileDifference::new(
                rel,
                DiffKind::SizeMismatch,
                format!("Size mismatch: source={}, target={}", source.size, target.size),
            )));
        }

        if mode.needs_checksum()
            && source.is_file
            && target.is_file
            && source.checksum.is_some()
            && target.checksum.is_some()
            && source.checksum != target.checksum
        {
            differences.push(with_meta(FileDifference::new(
                rel,
                DiffKind::ContentMismatch,
                "Content mismatch: checksums differ",
            )));
        }

        if mode == ComparisonMode::Full {
            let source_perms = source.mode & 0o7777;
            let target_perms = target.mode & 0o7777;
            if source_perms != target_perms {
                differences.push(with_meta(FileDifference::new(
                    rel,
                    DiffKind::PermissionMismatch,
                    format!("Permission mismatch: source={source_perms:#o}, target={target_perms:#o}"),
                )));
            }

            if (source.mtime - target.mtime).abs() > self.config.timestamp_tolerance {
                differences.push(with_meta(FileDifference::new(
                    rel,
                    DiffKind::TimestampMismatch,
                    format!(
                        "Timestamp mismatch: source={}, target={}",
                        source.mtime, target.mtime
                    ),
                )));
            }
        }

        differences
    }
}

fn count_dirs(files: &BTreeMap<String, PathBuf>) -> u64 {
    files.values().filter(|p| p.is_dir()).count() as u64
}

const fn kind_word(metadata: &FileMetadata) -> &'static str {
    if metadata.is_file {
        "file"
    } else {
        "dir"
    }
}
