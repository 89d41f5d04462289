//! Statistics from a run directory
//!
//! This module reads the checkpoint and both ledgers of an output directory
//! and prints a summary, plus the console summaries for runs and dry runs.

use crate::journal::{
    Checkpoint, FailureEntry, Ledger, OutcomeEntry, PersistError, CHECKPOINT_FILE, FAILURES_FILE,
    OUTCOMES_FILE,
};
use crate::pipeline::{DryRunSummary, RunReport};
use std::collections::BTreeMap;
use std::path::Path;

/// Run directory statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Checkpoint value (records settled so far)
    pub last_index: usize,

    /// Outcome entries in total
    pub outcomes: usize,

    /// Outcomes pointing under the mirror base
    pub mirrored: usize,

    /// Outcomes pointing at the original source
    pub passthrough: usize,

    /// Outcomes without a location
    pub null_locations: usize,

    /// Failure entries in total
    pub failures: usize,

    /// Failure count per reason text
    pub failures_by_reason: BTreeMap<String, usize>,
}

/// Loads statistics from the journal files in `dir`
///
/// Missing files count as empty; nothing is created.
pub fn load_statistics(dir: &Path, mirror_base: &str) -> Result<RunStatistics, PersistError> {
    let checkpoint = Checkpoint::load(&dir.join(CHECKPOINT_FILE))?;
    let outcomes = Ledger::<OutcomeEntry>::open(&dir.join(OUTCOMES_FILE), "outcome ledger")?;
    let failures = Ledger::<FailureEntry>::open(&dir.join(FAILURES_FILE), "failure ledger")?;

    let mut stats = RunStatistics {
        last_index: checkpoint.last_index(),
        outcomes: outcomes.len(),
        failures: failures.len(),
        ..RunStatistics::default()
    };

    for entry in outcomes.entries() {
        match entry.datasheet_url.as_deref() {
            None => stats.null_locations += 1,
            Some(location) if location.starts_with(mirror_base) => stats.mirrored += 1,
            Some(_) => stats.passthrough += 1,
        }
    }

    for entry in failures.entries() {
        *stats
            .failures_by_reason
            .entry(entry.reason.clone())
            .or_insert(0) += 1;
    }

    Ok(stats)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Overview:");
    println!("  Records settled (checkpoint): {}", stats.last_index);
    println!("  Outcome entries: {}", stats.outcomes);
    println!("  Failure entries: {}", stats.failures);
    println!();

    println!("Outcomes by Location:");
    for (label, count) in [
        ("Mirrored", stats.mirrored),
        ("Original source", stats.passthrough),
        ("No location", stats.null_locations),
    ] {
        println!(
            "  {}: {} ({:.1}%)",
            label,
            count,
            percentage(count, stats.outcomes)
        );
    }
    println!();

    if !stats.failures_by_reason.is_empty() {
        println!("Failures by Reason:");
        let mut reasons: Vec<_> = stats.failures_by_reason.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));

        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    let usable = stats.mirrored + stats.passthrough;
    println!(
        "Usable locations: {:.1}% of settled records",
        percentage(usable, stats.last_index)
    );
}

/// Prints the completion summary of a run
pub fn print_run_report(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;

    println!("=== Run Complete ===\n");
    println!("  Started:    {}", report.started_at.to_rfc3339());
    println!("  Duration:   {}s", elapsed.num_seconds());
    println!("  Resumed at: record {}", report.resumed_from + 1);
    println!("  Processed:  {}", report.processed);
    println!("  Mirrored:   {}", report.mirrored);
    println!("  Trusted:    {}", report.trusted);
    println!("  Unresolvable: {}", report.unresolvable);
    println!("  Exhausted:  {}", report.exhausted);
    if report.skipped_duplicates > 0 {
        println!("  Already recorded: {}", report.skipped_duplicates);
    }
    if report.name_collisions > 0 {
        println!("  Shared artifact names: {}", report.name_collisions);
    }
}

/// Prints a dry-run plan
pub fn print_dry_run(summary: &DryRunSummary) {
    println!("=== Dry Run ===\n");

    for planned in &summary.planned {
        println!(
            "  #{:<5} {:<24} {:<12} {}",
            planned.position, planned.part_number, planned.route, planned.detail
        );
    }
    println!();

    println!("Routes:");
    println!("  Direct:       {}", summary.direct);
    println!("  Viewer:       {}", summary.viewer);
    println!("  Trusted:      {}", summary.trusted);
    println!("  Unresolvable: {}", summary.unresolvable);
}
