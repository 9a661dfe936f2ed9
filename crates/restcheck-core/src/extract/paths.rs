//! Member path validation for archive extraction.
//!
//! Every archive member name is validated before anything touches the
//! filesystem. A member that would escape the destination root is rejected
//! with `VerifyError::SecurityViolation` and the caller skips it.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::VerifyError;

/// Validates an archive member name and resolves it under `dest_root`.
///
/// Rejects empty names, absolute paths, and any `..` component. `.`
/// components are dropped. The resolved path is additionally required to
/// remain under `dest_root` after joining.
///
/// # Errors
///
/// Returns `VerifyError::SecurityViolation` for any rejected name.
pub fn validate_member_path(name: &str, dest_root: &Path) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(violation(name, "empty member name"));
    }

    let mut resolved = dest_root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(violation(name, "path traversal with '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(violation(name, "absolute path"));
            }
        }
    }

    if !resolved.starts_with(dest_root) {
        return Err(violation(name, "escapes destination directory"));
    }

    Ok(resolved)
}

/// Validates a symlink member's target.
///
/// Targets are stored verbatim on disk, so a link pointing outside the
/// destination would let a later member write through it and escape the
/// sandbox. Absolute targets are rejected outright; relative targets are
/// resolved lexically against the link's parent directory and must not
/// climb past the destination root.
///
/// # Errors
///
/// Returns `VerifyError::SecurityViolation` for any rejected target.
pub fn validate_symlink_target(name: &str, target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(violation(name, "empty symlink target"));
    }

    // Depth of the link's parent below the destination root. The member
    // name itself has already passed validate_member_path.
    let mut depth = Path::new(name)
        .parent()
        .map_or(0usize, |parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        });

    for component in Path::new(target).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    violation(name, "symlink target escapes destination directory")
                })?;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(violation(name, "absolute symlink target"));
            }
        }
    }

    Ok(())
}

fn violation(name: &str, reason: &str) -> VerifyError {
    VerifyError::SecurityViolation {
        path: PathBuf::from(name),
        reason: reason.to_string(),
    }
}
