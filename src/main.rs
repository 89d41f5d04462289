//! Datasheet-Mirror main entry point
//!
//! This is the command-line interface for the resumable datasheet fetcher.

use anyhow::Context;
use clap::Parser;
use datasheet_mirror::config::{load_config_with_hash, Config};
use datasheet_mirror::journal::RunJournal;
use datasheet_mirror::pipeline::{dry_run, load_input};
use datasheet_mirror::report::{load_statistics, print_dry_run, print_run_report, print_statistics};
use datasheet_mirror::{run_pipeline, UrlResolver};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Datasheet-Mirror: a resumable datasheet fetcher
///
/// Walks a JSON list of parts, downloads each part's datasheet into the
/// output directory and records where it can be found. Interrupted runs
/// resume from the last settled record.
#[derive(Parser, Debug)]
#[command(name = "datasheet-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A resumable datasheet fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Input records (overrides input.path from the configuration)
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Resume from the checkpoint (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Delete the checkpoint and ledgers, then start from the first record
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Show how each record would be handled without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the output directory and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(input) = &cli.input {
        config.input.path = Some(input.to_string_lossy().into_owned());
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("datasheet_mirror=info,warn"),
            1 => EnvFilter::new("datasheet_mirror=debug,info"),
            2 => EnvFilter::new("datasheet_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: classifies records without network access
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let records = load_input(config)?;
    let resolver = UrlResolver::new(&config.resolver, &config.output.extension);

    let summary = dry_run(&records, &resolver, &config.fetch);
    print_dry_run(&summary);

    println!("\nOutput directory: {}", config.output.directory);
    println!("Mirror base: {}", config.output.mirror_base);
    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: summarizes the journal in the output directory
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let dir = Path::new(&config.output.directory);
    println!("Output directory: {}\n", dir.display());

    let stats = load_statistics(dir, &config.output.mirror_base)
        .with_context(|| format!("reading run state in {}", dir.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main fetch run
async fn handle_run(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh run (discarding checkpoint and ledgers)");
        RunJournal::reset(Path::new(&config.output.directory))?;
    } else {
        tracing::info!("Starting run (will resume from checkpoint if present)");
    }

    tracing::info!(
        "Trusted hosts: {}, viewer hosts: {}, identities: {}",
        config.fetch.trusted_hosts.len(),
        config.fetch.viewer_hosts.len(),
        config.fetch.user_agents.len()
    );

    match run_pipeline(config).await {
        Ok(report) => {
            print_run_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
