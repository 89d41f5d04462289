//! Run pipeline: wires configuration, records, fetching and the journal

mod dry_run;
mod orchestrator;

pub use dry_run::{dry_run, DryRunSummary, PlannedRecord, Route};
pub use orchestrator::{Orchestrator, RunReport};

use crate::config::Config;
use crate::fetch::{build_http_client, FetchChain};
use crate::records::{load_records, Record};
use crate::render::build_renderer;
use crate::url::UrlResolver;
use crate::{ConfigError, MirrorError};
use std::path::Path;
use std::sync::Arc;

/// Loads the configured input, logging malformed entries
pub fn load_input(config: &Config) -> Result<Vec<Record>, MirrorError> {
    let path = config.input.path.as_deref().ok_or_else(|| {
        ConfigError::Validation(
            "no input path configured (set input.path or pass --input)".to_string(),
        )
    })?;

    let (records, issues) = load_records(Path::new(path), &config.input)?;

    for issue in &issues {
        tracing::warn!(index = issue.index + 1, "Malformed record: {}", issue.problem);
    }
    tracing::info!(
        "Loaded {} records from {} ({} flagged)",
        records.len(),
        path,
        issues.len()
    );

    Ok(records)
}

/// Runs a complete mirror pass
///
/// This is the main entry point. It will:
/// 1. Load the input records
/// 2. Build the resolver, HTTP client, renderer and strategy chain
/// 3. Open the journal in the output directory
/// 4. Process every record past the checkpoint
/// 5. Shut the renderer down
///
/// # Example
///
/// ```no_run
/// use datasheet_mirror::config::load_config;
/// use datasheet_mirror::run_pipeline;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let report = run_pipeline(config).await?;
/// println!("{} mirrored", report.mirrored);
/// # Ok(())
/// # }
/// ```
pub async fn run_pipeline(config: Config) -> Result<RunReport, MirrorError> {
    let records = load_input(&config)?;

    let resolver = UrlResolver::new(&config.resolver, &config.output.extension);
    let client = build_http_client(&config.fetch)?;
    let renderer = build_renderer(&config.render);
    let chain = FetchChain::from_config(&config, client, Arc::clone(&renderer));

    let mut orchestrator = Orchestrator::new(&config.output, resolver, chain)?;
    let result = orchestrator.run(&records).await;

    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("Failed to shut down renderer: {}", e);
    }

    result
}
