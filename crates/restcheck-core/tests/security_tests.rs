//! Hostile-archive tests: members that try to write outside the sandbox.

#![allow(clippy::unwrap_used)]

use restcheck_core::test_utils::create_test_tar_unchecked;
use restcheck_core::ExtractionEngine;
use restcheck_core::VerifyConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn engine() -> ExtractionEngine {
    ExtractionEngine::new(VerifyConfig::default())
}

fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Builds a tar with one regular member plus one hard link whose target is
/// written into the raw header bytes, bypassing the builder's sanitation.
fn tar_with_hard_link(link_name: &str, link_target: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut header = tar::Header::new_gnu();
    header.set_path("a.txt").unwrap();
    header.set_size(4);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, &b"data"[..]).unwrap();

    let mut header = tar::Header::new_gnu();
    header.set_path(link_name).unwrap();
    header.set_entry_type(tar::EntryType::Link);
    header.set_size(0);
    {
        let bytes = link_target.as_bytes();
        assert!(bytes.len() < 100);
        let gnu = header.as_gnu_mut().unwrap();
        gnu.linkname[..bytes.len()].copy_from_slice(bytes);
    }
    header.set_cksum();
    builder.append(&header, std::io::empty()).unwrap();

    builder.into_inner().unwrap()
}

/// Builds a tar whose first member is a symlink with the target written
/// into the raw header bytes, followed by regular members.
fn tar_with_symlink(link_name: &str, raw_target: &str, followers: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut header = tar::Header::new_gnu();
    header.set_path(link_name).unwrap();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    {
        let bytes = raw_target.as_bytes();
        assert!(bytes.len() < 100);
        let gnu = header.as_gnu_mut().unwrap();
        gnu.linkname[..bytes.len()].copy_from_slice(bytes);
    }
    header.set_cksum();
    builder.append(&header, std::io::empty()).unwrap();

    for (name, content) in followers {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }

    builder.into_inner().unwrap()
}

#[test]
fn test_absolute_member_path_is_skipped() {
    let temp = TempDir::new().unwrap();
    let bytes = create_test_tar_unchecked(&[("/abs/evil.txt", b"payload"), ("ok.txt", b"fine")]);
    let archive = write_archive(temp.path(), "hostile.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success);
    assert_eq!(result.file_count, 1);
    assert_eq!(result.metadata.warnings.len(), 1);
    assert!(result.metadata.warnings[0].contains("unsafe path"));
    assert!(!Path::new("/abs/evil.txt").exists());
    assert_eq!(fs::read(dest.join("ok.txt")).unwrap(), b"fine");
}

#[test]
fn test_nested_traversal_member_is_skipped() {
    let temp = TempDir::new().unwrap();
    let bytes = create_test_tar_unchecked(&[("sub/../../escape.txt", b"payload")]);
    let archive = write_archive(temp.path(), "hostile.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success);
    assert_eq!(result.file_count, 0);
    assert_eq!(result.metadata.warnings.len(), 1);
    assert!(!temp.path().join("escape.txt").exists());
}

#[test]
fn test_hard_link_outside_destination_is_rejected() {
    let temp = TempDir::new().unwrap();
    let bytes = tar_with_hard_link("lnk", "../../etc/passwd");
    let archive = write_archive(temp.path(), "hostile.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    // The regular member extracts; the escaping link is a per-member error.
    assert!(result.success);
    assert_eq!(result.file_count, 1);
    assert_eq!(result.metadata.errors.len(), 1);
    assert!(result.metadata.errors[0].contains("lnk"));
    assert!(!dest.join("lnk").exists());
}

#[test]
fn test_contained_hard_link_is_created() {
    let temp = TempDir::new().unwrap();
    let bytes = tar_with_hard_link("lnk", "a.txt");
    let archive = write_archive(temp.path(), "linked.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success, "{:?}", result.metadata.errors);
    assert_eq!(result.file_count, 2);
    assert_eq!(fs::read(dest.join("lnk")).unwrap(), b"data");
}

#[cfg(unix)]
#[test]
fn test_symlink_to_outside_directory_cannot_redirect_writes() {
    let temp = TempDir::new().unwrap();
    let outside = temp.path().join("outside");
    fs::create_dir_all(&outside).unwrap();

    // A link to an absolute path outside the sandbox, followed by a member
    // nested under the link name that would write through it.
    let bytes = tar_with_symlink(
        "evil",
        outside.to_str().unwrap(),
        &[("evil/payload.txt", b"gotcha")],
    );
    let archive = write_archive(temp.path(), "hostile.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success);
    assert_eq!(result.metadata.warnings.len(), 1);
    assert!(result.metadata.warnings[0].contains("unsafe symlink"));
    assert!(!outside.join("payload.txt").exists());
    // The follow-up member lands in a real directory inside the sandbox.
    assert_eq!(fs::read(dest.join("evil/payload.txt")).unwrap(), b"gotcha");
}

#[cfg(unix)]
#[test]
fn test_relative_symlink_escape_is_skipped() {
    let temp = TempDir::new().unwrap();
    let bytes = tar_with_symlink("evil", "../../outside", &[("ok.txt", b"fine")]);
    let archive = write_archive(temp.path(), "hostile.tar", &bytes);
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success);
    assert_eq!(result.file_count, 1);
    assert_eq!(result.metadata.warnings.len(), 1);
    assert!(result.metadata.warnings[0].contains("unsafe symlink"));
    assert!(!dest.join("evil").exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_target_preserved_verbatim() {
    let temp = TempDir::new().unwrap();

    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_path("a.txt").unwrap();
    header.set_size(4);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, &b"data"[..]).unwrap();

    let mut header = tar::Header::new_gnu();
    header.set_path("link").unwrap();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    header.set_link_name("a.txt").unwrap();
    header.set_cksum();
    builder.append(&header, std::io::empty()).unwrap();

    let archive = write_archive(temp.path(), "links.tar", &builder.into_inner().unwrap());
    let dest = temp.path().join("out");

    let result = engine().extract(&archive, Some(&dest), None);

    assert!(result.success, "{:?}", result.metadata.errors);
    let target = fs::read_link(dest.join("link")).unwrap();
    assert_eq!(target, Path::new("a.txt"));
}
