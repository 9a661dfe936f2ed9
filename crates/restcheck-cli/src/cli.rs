//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

use restcheck_core::config;
use restcheck_core::VerifyConfig;

#[derive(Parser)]
#[command(name = "restcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a backup archive into a sandbox directory
    Extract(ExtractArgs),
    /// Compare two directory trees
    Compare(CompareArgs),
    /// Extract a backup and verify it against a source tree
    Verify(VerifyArgs),
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the backup archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: private temporary directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum single member size in bytes (K/M/G/T suffixes accepted)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_member_size: Option<u64>,

    /// Streaming chunk size in bytes
    #[arg(long, value_parser = parse_byte_size)]
    pub chunk_size: Option<u64>,

    /// Base directory for temporary extraction directories
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Keep the temporary extraction directory after the run
    #[arg(long)]
    pub keep: bool,
}

#[derive(clap::Args)]
pub struct CompareArgs {
    /// Reference source directory
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory to compare against the source
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Comparison mode: quick, full, metadata_only, checksum_only
    #[arg(short, long, default_value = "full")]
    pub mode: String,

    /// Number of worker threads for pair comparison
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Exclude pattern (glob, can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking trees
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Compare paths case-insensitively
    #[arg(long)]
    pub ignore_case: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Path to the backup archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Reference source directory the restore must match
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Comparison mode: quick, full, metadata_only, checksum_only
    #[arg(short, long, default_value = "full")]
    pub mode: String,

    /// Extraction destination (default: private temporary directory)
    #[arg(long, value_name = "DIR")]
    pub destination: Option<PathBuf>,

    /// Keep the temporary extraction directory after the run
    #[arg(long)]
    pub keep: bool,

    /// Number of worker threads for pair comparison
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Exclude pattern (glob, can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking trees
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Compare paths case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Maximum single member size in bytes (K/M/G/T suffixes accepted)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_member_size: Option<u64>,

    /// Base directory for temporary extraction directories
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}

/// Shared knobs that flow into a `VerifyConfig`.
pub struct ConfigArgs<'a> {
    pub workers: Option<usize>,
    pub exclude: &'a [String],
    pub follow_symlinks: bool,
    pub ignore_case: bool,
    pub max_member_size: Option<u64>,
    pub chunk_size: Option<u64>,
    pub temp_dir: Option<&'a PathBuf>,
}

impl ConfigArgs<'_> {
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(&self) -> VerifyConfig {
        let defaults = VerifyConfig::default();
        VerifyConfig {
            max_workers: self.workers.unwrap_or_else(config::default_worker_count),
            chunk_size: self
                .chunk_size
                .map_or(defaults.chunk_size, |size| size as usize),
            exclude_patterns: self.exclude.to_vec(),
            follow_symlinks: self.follow_symlinks,
            case_sensitive: !self.ignore_case,
            max_member_size: self.max_member_size.unwrap_or(defaults.max_member_size),
            temp_base_dir: self.temp_dir.cloned(),
            ..defaults
        }
    }
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("100").unwrap(), 100);
        assert_eq!(parse_byte_size("1K").unwrap(), 1024);
        assert_eq!(parse_byte_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_byte_size("3G").unwrap(), 3 * 1024 * 1024 * 1024);
        assert_eq!(parse_byte_size("1T").unwrap(), 1024_u64.pow(4));
        assert!(parse_byte_size("invalid").is_err());
        assert!(parse_byte_size("").is_err());
    }

    #[test]
    fn test_config_args_build() {
        let exclude = vec!["*.tmp".to_string()];
        let args = ConfigArgs {
            workers: Some(2),
            exclude: &exclude,
            follow_symlinks: true,
            ignore_case: true,
            max_member_size: Some(1024),
            chunk_size: None,
            temp_dir: None,
        };
        let config = args.build();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.exclude_patterns, exclude);
        assert!(config.follow_symlinks);
        assert!(!config.case_sensitive);
        assert_eq!(config.max_member_size, 1024);
    }
}
