//! Streaming archive extraction with per-member security checks.

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive as TarArchive;
use tar::EntryType;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::cancel::CancelToken;
use crate::config::VerifyConfig;
use crate::extract::format::detect_format;
use crate::extract::format::sniff_magic;
use crate::extract::format::ArchiveFormat;
use crate::extract::paths::validate_member_path;
#[cfg(unix)]
use crate::extract::paths::validate_symlink_target;
use crate::extract::result::ExtractionMetadata;
use crate::extract::result::ExtractionResult;
use crate::hash::sha256_file;
use crate::progress::ProgressTracker;
use crate::Result;
use crate::VerifyError;

/// What landed on disk for one archive member.
enum EntryOutcome {
    /// Regular file content was written; bytes count toward totals.
    File,
    /// Directory, symlink, or hard link was created.
    Other,
    /// Unsupported entry type, recorded as a warning.
    Skipped,
}

/// Extracts backup archives into a destination directory.
///
/// Extraction is best effort: unsafe and oversized members are skipped with
/// a warning, per-member I/O failures are recorded as errors, and only
/// input validation, format detection, or cancellation abort the run.
/// Temporary destination directories are tracked and removed by
/// [`cleanup`](Self::cleanup) or on drop.
#[derive(Debug)]
pub struct ExtractionEngine {
    config: VerifyConfig,
    cancel: CancelToken,
    temp_dirs: Mutex<Vec<PathBuf>>,
}

impl ExtractionEngine {
    /// Creates an engine with its own cancellation token.
    #[must_use]
    pub fn new(config: VerifyConfig) -> Self {
        Self::with_cancel(config, CancelToken::new())
    }

    /// Creates an engine driven by an external cancellation token.
    #[must_use]
    pub fn with_cancel(config: VerifyConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            temp_dirs: Mutex::new(Vec::new()),
        }
    }

    /// Returns the engine's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Extracts `archive` into `dest`, or into a fresh private temporary
    /// directory when `dest` is `None`.
    ///
    /// Never returns an error: fatal failures produce a result with
    /// `success == false` and whatever counters were collected before the
    /// failure. `progress` is scaled to 0..=100.
    pub fn extract(
        &self,
        archive: &Path,
        dest: Option<&Path>,
        progress: Option<&ProgressTracker>,
    ) -> ExtractionResult {
        let mut metadata = ExtractionMetadata::default();
        let mut format_tag = String::new();
        let mut extraction_path = None;

        info!(archive = %archive.display(), "starting extraction");

        match self.try_extract(
            archive,
            dest,
            progress,
            &mut metadata,
            &mut format_tag,
            &mut extraction_path,
        ) {
            Ok(checksum) => {
                metadata.finish();
                if let Some(tracker) = progress {
                    tracker.set_current(100, "Extraction completed");
                }
                info!(
                    files = metadata.extracted_files,
                    bytes = metadata.extracted_size,
                    duration = format!("{:.2}s", metadata.duration()),
                    "extraction completed"
                );
                let file_count = metadata.extracted_files;
                let total_size = metadata.extracted_size;
                ExtractionResult {
                    success: true,
                    extraction_path,
                    format_detected: format_tag,
                    file_count,
                    total_size,
                    checksum: Some(checksum),
                    error_message: None,
                    metadata,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!("extraction failed: {message}");
                metadata.errors.push(message.clone());
                let mut result = ExtractionResult::failed(message, metadata);
                result.format_detected = format_tag;
                result.extraction_path = extraction_path;
                result
            }
        }
    }

    fn try_extract(
        &self,
        archive: &Path,
        dest: Option<&Path>,
        progress: Option<&ProgressTracker>,
        metadata: &mut ExtractionMetadata,
        format_tag: &mut String,
        extraction_path: &mut Option<PathBuf>,
    ) -> Result<String> {
        if !archive.exists() {
            return Err(VerifyError::PathNotFound {
                path: archive.to_path_buf(),
            });
        }
        if !archive.is_file() {
            return Err(VerifyError::NotAFile {
                path: archive.to_path_buf(),
            });
        }

        let format = detect_format(archive)?;
        *format_tag = format.tag().to_string();
        info!(format = format.tag(), "detected format");

        let dest_root = match dest {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.canonicalize()?
            }
            None => self.create_secure_temp_dir()?,
        };
        *extraction_path = Some(dest_root.clone());
        info!(dest = %dest_root.display(), "extracting");

        if let Some(tracker) = progress {
            tracker.set_current(0, "Calculating checksum...");
        }
        let checksum = sha256_file(archive, self.config.chunk_size, &self.cancel)?;

        if let Some(tracker) = progress {
            tracker.set_current(5, "Starting extraction...");
        }

        match format {
            ArchiveFormat::Tar
            | ArchiveFormat::TarGz
            | ArchiveFormat::TarBz2
            | ArchiveFormat::TarXz => {
                self.extract_tar(archive, format, &dest_root, metadata, progress)?;
            }
            ArchiveFormat::Zip => self.extract_zip(archive, &dest_root, metadata, progress)?,
            ArchiveFormat::QdrantSnapshot => {
                self.extract_qdrant(archive, &dest_root, metadata, progress)?;
            }
        }

        Ok(checksum)
    }

    /// Opens a decompressing reader for a tar-family archive. Snapshot
    /// files are sniffed because they carry no telling extension.
    fn open_tar_reader(&self, archive: &Path, format: ArchiveFormat) -> Result<Box<dyn Read>> {
        let file = File::open(archive)?;
        Ok(match format {
            ArchiveFormat::Tar | ArchiveFormat::Zip => Box::new(file),
            ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
            ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
            ArchiveFormat::TarXz => Box::new(XzDecoder::new(file)),
            ArchiveFormat::QdrantSnapshot => match sniff_magic(archive)? {
                Some(ArchiveFormat::TarGz) => Box::new(GzDecoder::new(file)),
                Some(ArchiveFormat::TarBz2) => Box::new(BzDecoder::new(file)),
                Some(ArchiveFormat::TarXz) => Box::new(XzDecoder::new(file)),
                _ => Box::new(file),
            },
        })
    }

    /// Extracts a tar-family archive in two passes: one to collect member
    /// counts for progress totals, one to extract.
    fn extract_tar(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        dest_root: &Path,
        metadata: &mut ExtractionMetadata,
        progress: Option<&ProgressTracker>,
    ) -> Result<()> {
        // Counting pass. Streaming decoders cannot seek, so reopen instead.
        let mut counting = TarArchive::new(self.open_tar_reader(archive, format)?);
        for entry in counting.entries().map_err(invalid)? {
            self.cancel.check()?;
            let entry = entry.map_err(invalid)?;
            metadata.total_files += 1;
            if entry.header().entry_type().is_file() {
                metadata.total_size += entry.size();
            }
        }

        let total = metadata.total_files;
        let mut tar = TarArchive::new(self.open_tar_reader(archive, format)?);
        for (i, entry) in tar.entries().map_err(invalid)?.enumerate() {
            self.cancel.check()?;
            let mut entry = entry.map_err(invalid)?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let size = entry.size();

            let target = match validate_member_path(&name, dest_root) {
                Ok(target) => target,
                Err(e) => {
                    warn!("{e}");
                    metadata.warnings.push(format!("Skipped unsafe path: {name}"));
                    continue;
                }
            };
            if size > self.config.max_member_size {
                metadata
                    .warnings
                    .push(format!("Skipped oversized file: {name}"));
                continue;
            }

            match self.write_tar_entry(&mut entry, &target, dest_root, &name, metadata) {
                Ok(EntryOutcome::File) => {
                    metadata.extracted_files += 1;
                    metadata.extracted_size += size;
                }
                Ok(EntryOutcome::Other) => metadata.extracted_files += 1,
                Ok(EntryOutcome::Skipped) => {}
                Err(VerifyError::Interrupted) => return Err(VerifyError::Interrupted),
                Err(e) => {
                    let message = format!("Failed to extract {name}: {e}");
                    error!("{message}");
                    metadata.errors.push(message);
                }
            }

            if let Some(tracker) = progress {
                let percent = (i as u64 + 1) * 100 / total.max(1);
                tracker.set_current(percent, &format!("Extracted: {name}"));
            }
        }

        Ok(())
    }

    fn write_tar_entry(
        &self,
        entry: &mut tar::Entry<'_, Box<dyn Read>>,
        target: &Path,
        dest_root: &Path,
        name: &str,
        metadata: &mut ExtractionMetadata,
    ) -> Result<EntryOutcome> {
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(target)?;
                Ok(EntryOutcome::Other)
            }
            EntryType::Symlink => self.write_symlink(entry, target, name, metadata),
            EntryType::Link => {
                let link = entry.link_name()?.unwrap_or_default();
                let link_name = link.to_string_lossy();
                let source = validate_member_path(&link_name, dest_root)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::hard_link(source, target)?;
                Ok(EntryOutcome::Other)
            }
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                self.stream_to_file(entry, target)?;
                #[cfg(unix)]
                if let Ok(mode) = entry.header().mode() {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o7777))?;
                }
                Ok(EntryOutcome::File)
            }
            other => {
                metadata
                    .warnings
                    .push(format!("Skipped unsupported entry type {other:?}: {name}"));
                Ok(EntryOutcome::Skipped)
            }
        }
    }

    #[cfg(unix)]
    fn write_symlink(
        &self,
        entry: &mut tar::Entry<'_, Box<dyn Read>>,
        target: &Path,
        name: &str,
        metadata: &mut ExtractionMetadata,
    ) -> Result<EntryOutcome> {
        let Some(link) = entry.link_name()? else {
            metadata
                .warnings
                .push(format!("Skipped symlink without target: {name}"));
            return Ok(EntryOutcome::Skipped);
        };
        // A link pointing outside the destination would let a later member
        // write through it, so targets are validated before creation.
        if let Err(e) = validate_symlink_target(name, &link.to_string_lossy()) {
            warn!("{e}");
            metadata
                .warnings
                .push(format!("Skipped unsafe symlink: {name}"));
            return Ok(EntryOutcome::Skipped);
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        // Validated targets are written verbatim; dangling links are legal
        // in the extracted tree and surface later during comparison.
        std::os::unix::fs::symlink(link.as_ref(), target)?;
        Ok(EntryOutcome::Other)
    }

    #[cfg(not(unix))]
    fn write_symlink(
        &self,
        _entry: &mut tar::Entry<'_, Box<dyn Read>>,
        _target: &Path,
        name: &str,
        metadata: &mut ExtractionMetadata,
    ) -> Result<EntryOutcome> {
        metadata
            .warnings
            .push(format!("Skipped symlink on non-unix platform: {name}"));
        Ok(EntryOutcome::Skipped)
    }

    /// Copies entry content in `chunk_size` pieces, polling for
    /// cancellation between chunks.
    fn stream_to_file(&self, reader: &mut impl Read, target: &Path) -> Result<()> {
        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        let mut writer = BufWriter::new(File::create(target)?);
        loop {
            self.cancel.check()?;
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn extract_zip(
        &self,
        archive: &Path,
        dest_root: &Path,
        metadata: &mut ExtractionMetadata,
        progress: Option<&ProgressTracker>,
    ) -> Result<()> {
        let mut zip = ZipArchive::new(File::open(archive)?).map_err(invalid)?;

        let total = zip.len() as u64;
        metadata.total_files = total;
        for i in 0..zip.len() {
            let member = zip.by_index_raw(i).map_err(invalid)?;
            if !member.is_dir() {
                metadata.total_size += member.size();
            }
        }

        for i in 0..zip.len() {
            self.cancel.check()?;
            let mut member = match zip.by_index(i) {
                Ok(member) => member,
                Err(e) => {
                    let message = format!("Failed to extract member {i}: {e}");
                    error!("{message}");
                    metadata.errors.push(message);
                    continue;
                }
            };
            let name = member.name().to_string();
            let size = member.size();
            let is_dir = member.is_dir();

            let target = match validate_member_path(&name, dest_root) {
                Ok(target) => target,
                Err(e) => {
                    warn!("{e}");
                    metadata.warnings.push(format!("Skipped unsafe path: {name}"));
                    continue;
                }
            };
            if size > self.config.max_member_size {
                metadata
                    .warnings
                    .push(format!("Skipped oversized file: {name}"));
                continue;
            }

            let written: Result<()> = if is_dir {
                fs::create_dir_all(&target).map_err(VerifyError::from)
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                self.stream_to_file(&mut member, &target).map(|()| {
                    #[cfg(unix)]
                    if let Some(mode) = member.unix_mode() {
                        use std::os::unix::fs::PermissionsExt;
                        let _ = fs::set_permissions(
                            &target,
                            fs::Permissions::from_mode(mode & 0o7777),
                        );
                    }
                })
            };

            match written {
                Ok(()) => {
                    metadata.extracted_files += 1;
                    if !is_dir {
                        metadata.extracted_size += size;
                    }
                }
                Err(VerifyError::Interrupted) => return Err(VerifyError::Interrupted),
                Err(e) => {
                    let message = format!("Failed to extract {name}: {e}");
                    error!("{message}");
                    metadata.errors.push(message);
                }
            }

            if let Some(tracker) = progress {
                let percent = (i as u64 + 1) * 100 / total.max(1);
                tracker.set_current(percent, &format!("Extracted: {name}"));
            }
        }

        Ok(())
    }

    /// Extracts a Qdrant snapshot, which is usually a tar archive. Falls
    /// back to copying the file verbatim when tar parsing fails, resetting
    /// the counters to describe the single copied file.
    fn extract_qdrant(
        &self,
        archive: &Path,
        dest_root: &Path,
        metadata: &mut ExtractionMetadata,
        progress: Option<&ProgressTracker>,
    ) -> Result<()> {
        match self.extract_tar(archive, ArchiveFormat::QdrantSnapshot, dest_root, metadata, progress)
        {
            Ok(()) => Ok(()),
            Err(VerifyError::Interrupted) => Err(VerifyError::Interrupted),
            Err(e) => {
                warn!("failed to extract as tar, copying as file: {e}");
                let name = archive
                    .file_name()
                    .map_or_else(|| "snapshot".to_string(), |n| n.to_string_lossy().into_owned());
                let target = dest_root.join(&name);
                fs::copy(archive, &target)?;

                let size = fs::metadata(archive)?.len();
                metadata.total_files = 1;
                metadata.extracted_files = 1;
                metadata.total_size = size;
                metadata.extracted_size = size;

                if let Some(tracker) = progress {
                    tracker.set_current(100, &format!("Copied: {name}"));
                }
                Ok(())
            }
        }
    }

    /// Creates a 0o700 temporary directory and registers it for cleanup.
    fn create_secure_temp_dir(&self) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("extraction_");
        let dir = match &self.config.temp_base_dir {
            Some(base) => {
                fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.keep();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o700))?;
        }

        self.temp_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        debug!(dir = %path.display(), "created secure temp directory");
        Ok(path)
    }

    /// Removes every temporary directory this engine created.
    pub fn cleanup(&self) {
        let mut dirs = self.temp_dirs.lock().unwrap_or_else(PoisonError::into_inner);
        for dir in dirs.drain(..) {
            if dir.exists() {
                match fs::remove_dir_all(&dir) {
                    Ok(()) => debug!(dir = %dir.display(), "cleaned up temp directory"),
                    Err(e) => warn!(dir = %dir.display(), "failed to clean up: {e}"),
                }
            }
        }
    }

    /// Disowns the temporary directories so cleanup leaves them in place.
    pub fn keep_temp_dirs(&self) {
        self.temp_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for ExtractionEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn invalid(e: impl std::fmt::Display) -> VerifyError {
    VerifyError::InvalidArchive(e.to_string())
}
