//! Restcheck CLI - backup restoration verification from the command line.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose);
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let progress = commands::progress_mode(cli.json, cli.quiet);

    match &cli.command {
        cli::Commands::Extract(args) => commands::extract::execute(args, &*formatter, progress),
        cli::Commands::Compare(args) => commands::compare::execute(args, &*formatter, progress),
        cli::Commands::Verify(args) => commands::verify::execute(args, &*formatter, progress),
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
