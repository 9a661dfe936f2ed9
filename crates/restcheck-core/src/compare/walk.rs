//! Directory tree collection with exclusion patterns.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::config::VerifyConfig;
use crate::Result;

/// Collects every entry under `root`, keyed by its tree-relative path.
///
/// Symlinks are skipped unless `follow_symlinks` is set. Keys are
/// lowercased when the comparison is case-insensitive so both trees key
/// the same way. A `BTreeMap` keeps iteration order deterministic across
/// runs.
pub fn collect_files(root: &Path, config: &VerifyConfig) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(config.follow_symlinks)
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !config.follow_symlinks && entry.path_is_symlink() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy();
        if is_excluded(&relative, config) {
            continue;
        }

        let key = if config.case_sensitive {
            relative.into_owned()
        } else {
            relative.to_lowercase()
        };
        files.insert(key, entry.into_path());
    }

    Ok(files)
}

/// Checks the relative path and its file name against the exclusion
/// patterns.
fn is_excluded(relative: &str, config: &VerifyConfig) -> bool {
    if config.exclude_patterns.is_empty() {
        return false;
    }

    let path = normalize(relative, config.case_sensitive);
    let name = relative
        .rsplit(['/', '\\'])
        .next()
        .map(|n| normalize(n, config.case_sensitive))
        .unwrap_or_default();

    config.exclude_patterns.iter().any(|pattern| {
        let pattern = normalize(pattern, config.case_sensitive);
        wildcard_match(&pattern, &path) || wildcard_match(&pattern, &name)
    })
}

fn normalize(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

/// Glob-style match supporting `*` (any run, including separators) and
/// `?` (any single character). Iterative with backtracking, so patterns
/// like `*.tmp` stay linear.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.tmp", "cache.tmp"));
        assert!(wildcard_match("*.tmp", "deep/dir/cache.tmp"));
        assert!(!wildcard_match("*.tmp", "cache.tmp.bak"));
        assert!(wildcard_match("data?", "data1"));
        assert!(!wildcard_match("data?", "data12"));
        assert!(wildcard_match("*", "anything/at/all"));
        assert!(wildcard_match("logs/*", "logs/app.log"));
        assert!(!wildcard_match("logs/*", "other/app.log"));
    }

    #[test]
    fn test_collect_files_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

        let files = collect_files(dir.path(), &VerifyConfig::default()).unwrap();
        let keys: Vec<_> = files.keys().cloned().collect();
        assert_eq!(keys, vec!["a.txt", "sub", "sub/b.txt"]);
    }

    #[test]
    fn test_exclusion_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "k").unwrap();
        fs::write(dir.path().join("skip.tmp"), "s").unwrap();

        let config = VerifyConfig {
            exclude_patterns: vec!["*.tmp".to_string()],
            ..VerifyConfig::default()
        };
        let files = collect_files(dir.path(), &config).unwrap();
        assert!(files.contains_key("keep.txt"));
        assert!(!files.contains_key("skip.tmp"));
    }

    #[test]
    fn test_case_insensitive_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "r").unwrap();

        let config = VerifyConfig {
            case_sensitive: false,
            ..VerifyConfig::default()
        };
        let files = collect_files(dir.path(), &config).unwrap();
        assert!(files.contains_key("readme.md"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.txt"), "r").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let files = collect_files(dir.path(), &VerifyConfig::default()).unwrap();
        assert!(files.contains_key("real.txt"));
        assert!(!files.contains_key("link.txt"));

        let config = VerifyConfig {
            follow_symlinks: true,
            ..VerifyConfig::default()
        };
        let files = collect_files(dir.path(), &config).unwrap();
        assert!(files.contains_key("link.txt"));
    }
}
