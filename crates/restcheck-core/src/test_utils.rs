//! Helpers for building archives and directory trees in tests.
//!
//! Kept in the library so integration tests and downstream crates can
//! build fixtures without touching real backups.

use std::io::Cursor;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Builds an in-memory tar archive from `(path, content)` pairs.
///
/// # Panics
///
/// Panics on builder errors; fixtures are expected to be well formed.
#[must_use]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub fn create_test_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Builds an in-memory tar archive writing member names straight into the
/// header bytes, bypassing the builder's path sanitation. Used to craft
/// hostile archives with traversal names; names must fit 100 bytes.
///
/// # Panics
///
/// Panics when a name exceeds the classic header name field.
#[must_use]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub fn create_test_tar_unchecked(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        {
            let bytes = name.as_bytes();
            assert!(bytes.len() < 100, "name too long for raw header: {name}");
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..bytes.len()].copy_from_slice(bytes);
        }
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Builds a gzip-compressed in-memory tar archive.
#[must_use]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub fn create_test_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let tar_bytes = create_test_tar(entries);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

/// Builds an in-memory zip archive from `(path, content)` pairs.
#[must_use]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Writes a `(relative path, content)` tree under `root`, creating parent
/// directories as needed.
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub fn write_tree(root: &Path, entries: &[(&str, &str)]) {
    std::fs::create_dir_all(root).unwrap();
    for (rel, content) in entries {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}
