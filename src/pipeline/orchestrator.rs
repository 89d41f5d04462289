//! Sequential record processing with durable progress

use crate::config::OutputConfig;
use crate::fetch::{ChainOutcome, FetchChain};
use crate::journal::{FailureEntry, FailureReason, OutcomeEntry, PersistError, RunJournal};
use crate::records::Record;
use crate::url::{artifact_file_name, mirror_location, sanitize_identifier, ResolvedTarget, UrlResolver};
use crate::MirrorError;
use crate::state::FetchState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Completion summary of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Checkpoint value the run started from
    pub resumed_from: usize,
    pub processed: usize,
    pub mirrored: usize,
    pub trusted: usize,
    pub unresolvable: usize,
    pub exhausted: usize,
    /// Records whose ledger entries already existed from an earlier run
    pub skipped_duplicates: usize,
    /// Records whose artifact name was already used by another record in this run
    pub name_collisions: usize,
}

impl RunReport {
    fn new(started_at: DateTime<Utc>, resumed_from: usize) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            resumed_from,
            processed: 0,
            mirrored: 0,
            trusted: 0,
            unresolvable: 0,
            exhausted: 0,
            skipped_duplicates: 0,
            name_collisions: 0,
        }
    }

    /// Records that ended with a usable location
    pub fn succeeded(&self) -> usize {
        self.mirrored + self.trusted
    }

    /// Records that ended in the failure ledger
    pub fn failed(&self) -> usize {
        self.unresolvable + self.exhausted
    }

    fn count(&mut self, state: FetchState) {
        match state {
            FetchState::TrustedSuccess => self.trusted += 1,
            FetchState::DirectSuccess | FetchState::RenderedSuccess => self.mirrored += 1,
            FetchState::Exhausted => self.exhausted += 1,
        }
    }
}

/// Drives records through resolver, strategy chain and journal
///
/// Exactly one record is in flight at a time. For every record the ledger
/// entries are committed before the checkpoint advances past it.
pub struct Orchestrator {
    resolver: UrlResolver,
    chain: FetchChain,
    journal: RunJournal,
    output_dir: PathBuf,
    mirror_base: String,
    extension: String,
    /// Artifact destinations claimed in this run, by ledger index
    claimed: HashMap<PathBuf, usize>,
}

impl Orchestrator {
    /// Creates an orchestrator writing into `output.directory`
    ///
    /// Opens (or starts) the journal there, creating the directory.
    pub fn new(
        output: &OutputConfig,
        resolver: UrlResolver,
        chain: FetchChain,
    ) -> Result<Self, MirrorError> {
        let output_dir = PathBuf::from(&output.directory);
        let journal = RunJournal::open(&output_dir)?;

        Ok(Self {
            resolver,
            chain,
            journal,
            output_dir,
            mirror_base: output.mirror_base.clone(),
            extension: output.extension.clone(),
            claimed: HashMap::new(),
        })
    }

    pub fn journal(&self) -> &RunJournal {
        &self.journal
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Processes `records` from the checkpoint onwards
    ///
    /// Per-record fetch failures become ledger entries. Only a persistence
    /// failure stops the run, leaving the checkpoint on the record that
    /// could not be committed.
    pub async fn run(&mut self, records: &[Record]) -> Result<RunReport, MirrorError> {
        let resumed_from = self.journal.last_index();
        let mut report = RunReport::new(Utc::now(), resumed_from);
        self.claimed.clear();

        if resumed_from > 0 {
            tracing::info!(
                "Resuming at record {} of {}",
                resumed_from + 1,
                records.len()
            );
        }
        if resumed_from > records.len() {
            tracing::warn!(
                "Checkpoint ({}) is past the end of the input ({} records); nothing to do",
                resumed_from,
                records.len()
            );
        }

        let start_time = Instant::now();

        for record in records.iter().skip(resumed_from) {
            self.process(record, &mut report).await.map_err(|e| {
                tracing::error!(
                    index = record.position(),
                    "Aborting run, could not persist progress: {}",
                    e
                );
                e
            })?;

            report.processed += 1;
            if report.processed % 10 == 0 {
                let rate = report.processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} records processed ({} of {}), {:.2} records/sec",
                    report.processed,
                    record.position(),
                    records.len(),
                    rate
                );
            }
        }

        report.finished_at = Utc::now();
        tracing::info!(
            "All datasheets processed: {} mirrored, {} trusted, {} unresolvable, {} exhausted",
            report.mirrored,
            report.trusted,
            report.unresolvable,
            report.exhausted
        );

        Ok(report)
    }

    /// Settles one record, commits it and counts it into `report`
    async fn process(&mut self, record: &Record, report: &mut RunReport) -> Result<(), PersistError> {
        let position = record.position();
        let part_number = sanitize_identifier(record.identifier.as_deref(), record.index);

        let url = match self.resolver.resolve(record.raw_url.as_deref()) {
            ResolvedTarget::Fetchable(url) => url,
            ResolvedTarget::Unresolvable(reason) => {
                tracing::info!(index = position, part = %part_number, "Unresolvable URL: {}", reason);

                let outcome = OutcomeEntry {
                    index: position,
                    part_number: part_number.clone(),
                    datasheet_url: None,
                };
                let failure = FailureEntry::new(
                    position,
                    part_number,
                    record.raw_url.clone(),
                    FailureReason::MissingOrInvalidUrl,
                );
                let commit = self.journal.commit(position, Some(outcome), Some(failure))?;
                if !commit.outcome_written || !commit.failure_written {
                    report.skipped_duplicates += 1;
                }
                report.unresolvable += 1;
                return Ok(());
            }
        };

        // Settled before the checkpoint moved; only the checkpoint is missing
        if self.journal.outcomes().contains(position) || self.journal.failures().contains(position) {
            tracing::info!(index = position, part = %part_number, "Already recorded, skipping");
            self.journal.advance(position)?;
            report.skipped_duplicates += 1;
            return Ok(());
        }

        let file_name = artifact_file_name(&part_number, &self.extension);
        let destination = self.output_dir.join(&file_name);

        if !self.chain.is_trusted(&url) {
            if let Some(earlier) = self.claimed.insert(destination.clone(), position) {
                tracing::warn!(
                    index = position,
                    earlier,
                    "Artifact name {} is shared with an earlier record and will be overwritten",
                    file_name
                );
                report.name_collisions += 1;
            }
        }

        tracing::info!(index = position, part = %part_number, url = %url, "Processing record");

        let outcome = self.chain.run(&url, &destination).await?;
        let state = outcome.state();

        let (outcome, failure) = if state.is_success() {
            let datasheet_url = if state.wrote_artifact() {
                if let ChainOutcome::Fetched { bytes, .. } = &outcome {
                    tracing::info!(index = position, bytes, state = %state, "Saved {}", destination.display());
                }
                mirror_location(&self.mirror_base, &file_name)
            } else {
                tracing::info!(index = position, "Trusted source, recording original URL");
                url.to_string()
            };
            let entry = OutcomeEntry {
                index: position,
                part_number,
                datasheet_url: Some(datasheet_url),
            };
            (Some(entry), None)
        } else {
            if let ChainOutcome::Exhausted { failures } = &outcome {
                let tried: Vec<&str> = failures.iter().map(|f| f.strategy).collect();
                tracing::warn!(index = position, url = %url, "All strategies exhausted (tried: {})", tried.join(", "));
            }
            let failure = FailureEntry::new(
                position,
                part_number,
                Some(url.to_string()),
                FailureReason::AllStrategiesExhausted,
            );
            (None, Some(failure))
        };

        self.journal.commit(position, outcome, failure)?;
        report.count(state);

        Ok(())
    }
}
