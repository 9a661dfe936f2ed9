//! Property-based tests for member path containment and hashing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::path::PathBuf;

use proptest::prelude::*;
use restcheck_core::extract::validate_member_path;
use restcheck_core::hash::sha256_file;
use restcheck_core::CancelToken;
use tempfile::TempDir;

proptest! {
    /// Any member name containing a `..` segment is rejected.
    #[test]
    fn prop_parent_traversal_rejected(
        prefix in "([a-z]+/){0,4}",
        suffix in "([a-z]+/?){0,4}"
    ) {
        let root = PathBuf::from("/sandbox/extract");
        let name = if prefix.is_empty() {
            format!("../{suffix}")
        } else {
            format!("{prefix}../{suffix}")
        };
        prop_assert!(validate_member_path(&name, &root).is_err());
    }

    /// Plain relative names resolve and stay under the destination root.
    #[test]
    fn prop_relative_names_contained(
        components in prop::collection::vec("[a-zA-Z0-9_.-]{1,16}", 1..6)
    ) {
        // Names produced by the generator never contain separators, so
        // the only interesting rejection is a bare ".." component.
        prop_assume!(components.iter().all(|c| c != ".." && c != "."));
        let root = PathBuf::from("/sandbox/extract");
        let name = components.join("/");
        let resolved = validate_member_path(&name, &root).unwrap();
        prop_assert!(resolved.starts_with(&root));
    }

    /// Absolute names are always rejected regardless of the remainder.
    #[test]
    fn prop_absolute_names_rejected(rest in "[a-z/]{0,20}") {
        let root = PathBuf::from("/sandbox/extract");
        let name = format!("/{rest}");
        prop_assert!(validate_member_path(&name, &root).is_err());
    }

    /// The digest of a file does not depend on the streaming chunk size.
    #[test]
    fn prop_digest_chunk_size_invariant(
        content in prop::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1_usize..512
    ) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        std::fs::write(&path, &content).unwrap();

        let cancel = CancelToken::new();
        let baseline = sha256_file(&path, 8192, &cancel).unwrap();
        let chunked = sha256_file(&path, chunk_size, &cancel).unwrap();
        prop_assert_eq!(baseline, chunked);
    }
}

#[test]
fn test_validate_rejects_windows_style_absolute() {
    let root = Path::new("/sandbox/extract");
    // Backslashes are not separators on unix, so this resolves as one
    // odd file name and must still stay contained.
    let resolved = validate_member_path("dir\\file.txt", root);
    if let Ok(path) = resolved {
        assert!(path.starts_with(root));
    }
}
